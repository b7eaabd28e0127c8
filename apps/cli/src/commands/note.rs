//! `vaultdrop note`: note store writes.
//!
//! Each command prints one JSON object on stdout. Server errors are
//! reported as `{"success": false, "error": "HTTP <status>: <body>"}`.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;

use vaultdrop_note_store::{NoteStoreClient, NoteStoreError};

use super::{EXIT_OK, EXIT_PARTIAL};
use crate::Connection;

/// Where `note save` takes its content from.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteSource {
    Stdin,
    Inline(String),
    File(PathBuf),
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: String,
}

fn client(conn: &Connection) -> anyhow::Result<NoteStoreClient> {
    let (url, token) = conn.credentials()?;
    Ok(NoteStoreClient::new(url, token, conn.vault())?)
}

/// Prints a success body, or the failure object for server-side errors.
/// Other errors are returned to the caller.
fn report<T: Serialize>(result: Result<T, NoteStoreError>) -> anyhow::Result<u8> {
    match result {
        Ok(body) => {
            println!("{}", serde_json::to_string(&body)?);
            Ok(EXIT_OK)
        }
        Err(e @ NoteStoreError::Http { .. }) => {
            let failure = Failure {
                success: false,
                error: e.to_string(),
            };
            println!("{}", serde_json::to_string(&failure)?);
            Ok(EXIT_PARTIAL)
        }
        Err(e) => Err(e.into()),
    }
}

/// Vault path for a note: the explicit path, or the file's name. Stdin
/// and inline content have no name to fall back on.
pub fn note_path(source: &NoteSource, path: Option<&str>) -> anyhow::Result<String> {
    if let Some(path) = path {
        return Ok(path.to_string());
    }
    match source {
        NoteSource::File(file) => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a note name from {}", file.display())),
        NoteSource::Stdin => anyhow::bail!("--path is required with --stdin"),
        NoteSource::Inline(_) => anyhow::bail!("--path is required with --content"),
    }
}

async fn read_source(source: NoteSource) -> anyhow::Result<String> {
    match source {
        NoteSource::Stdin => {
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .context("failed to read stdin")?;
            Ok(content)
        }
        NoteSource::Inline(content) => Ok(content),
        NoteSource::File(file) => tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("failed to read {}", file.display())),
    }
}

pub async fn run_save(
    conn: &Connection,
    source: NoteSource,
    path: Option<&str>,
) -> anyhow::Result<u8> {
    let note_path = note_path(&source, path)?;
    let client = client(conn)?;
    let content = read_source(source).await?;
    report(client.create_or_update_note(&note_path, &content).await)
}

/// Parses `--updates`, which must be a JSON object.
pub fn parse_updates(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--updates must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--updates must be a JSON object, got {other}"),
    }
}

pub async fn run_frontmatter(conn: &Connection, path: &str, updates: &str) -> anyhow::Result<u8> {
    let updates = parse_updates(updates)?;
    let client = client(conn)?;
    report(client.patch_frontmatter(path, updates).await)
}

pub async fn run_index(conn: &Connection, folder: &str, title: Option<&str>) -> anyhow::Result<u8> {
    let client = client(conn)?;
    report(client.ensure_index_page(folder, title).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_the_default_note_path() {
        let source = NoteSource::File(PathBuf::from("/tmp/reports/report.md"));
        assert_eq!(note_path(&source, None).unwrap(), "report.md");
        assert_eq!(
            note_path(&source, Some("folder/r.md")).unwrap(),
            "folder/r.md"
        );
    }

    #[test]
    fn stdin_and_inline_need_a_path() {
        assert!(note_path(&NoteSource::Stdin, None).is_err());
        assert!(note_path(&NoteSource::Inline("# x".into()), None).is_err());
        assert_eq!(
            note_path(&NoteSource::Stdin, Some("a/b.md")).unwrap(),
            "a/b.md"
        );
    }

    #[test]
    fn updates_must_be_an_object() {
        let map = parse_updates(r#"{"category":"Tutorial","tags":"python"}"#).unwrap();
        assert_eq!(map["category"], "Tutorial");
        assert!(parse_updates("[1,2]").is_err());
        assert!(parse_updates("{not json").is_err());
    }

    #[tokio::test]
    async fn inline_and_file_sources_are_read() {
        assert_eq!(
            read_source(NoteSource::Inline("# Hello".into())).await.unwrap(),
            "# Hello"
        );

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("n.md");
        std::fs::write(&file, "body\n").unwrap();
        assert_eq!(read_source(NoteSource::File(file)).await.unwrap(), "body\n");
    }
}

use std::path::Path;
use std::time::UNIX_EPOCH;

use vaultdrop_protocol::ChunkData;

use crate::TransferError;
use crate::validation::validate_vault_path;

/// A bounded slice of a file being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Session-scoped transfer the chunk belongs to.
    pub transfer_id: String,
    /// 0-based position within the transfer.
    pub sequence_number: u32,
    /// Raw chunk data.
    pub payload: Vec<u8>,
    /// `true` only for the last chunk of the transfer.
    pub is_final: bool,
}

impl Chunk {
    /// Converts the chunk into its wire representation.
    pub fn into_wire(self) -> ChunkData {
        ChunkData {
            transfer_id: self.transfer_id,
            seq: self.sequence_number,
            is_final: self.is_final,
            payload: self.payload,
        }
    }
}

/// One attachment to deliver into the vault.
///
/// Immutable once built; `size_bytes` always equals the length of
/// `source_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentJob {
    label: String,
    source_bytes: Vec<u8>,
    destination_path: String,
    ctime_ms: i64,
    mtime_ms: i64,
}

impl AttachmentJob {
    /// Builds a job from in-memory bytes.
    ///
    /// The destination must be a vault-relative, forward-slash path.
    pub fn new(
        label: impl Into<String>,
        source_bytes: Vec<u8>,
        destination_path: impl Into<String>,
    ) -> Result<Self, TransferError> {
        let destination_path = destination_path.into();
        validate_vault_path(&destination_path)?;
        Ok(Self {
            label: label.into(),
            source_bytes,
            destination_path,
            ctime_ms: 0,
            mtime_ms: 0,
        })
    }

    /// Sets creation and modification times (milliseconds since the epoch).
    pub fn with_times(mut self, ctime_ms: i64, mtime_ms: i64) -> Self {
        self.ctime_ms = ctime_ms;
        self.mtime_ms = mtime_ms;
        self
    }

    /// Reads a local file into a job.
    ///
    /// The label is the file's base name; timestamps come from the file's
    /// metadata when the platform reports them.
    pub async fn load(path: &Path, destination_path: &str) -> Result<Self, TransferError> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;

        let mtime_ms = metadata.modified().map(millis_since_epoch).unwrap_or(0);
        let ctime_ms = metadata
            .created()
            .map(millis_since_epoch)
            .unwrap_or(mtime_ms);

        Ok(Self::new(file_label(path), bytes, destination_path)?.with_times(ctime_ms, mtime_ms))
    }

    /// Label reported back to the caller (usually the local file name).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// File contents.
    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    /// Vault-relative destination path.
    pub fn destination_path(&self) -> &str {
        &self.destination_path
    }

    /// Declared size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.source_bytes.len() as u64
    }

    /// Creation time in milliseconds since the epoch (0 if unknown).
    pub fn ctime_ms(&self) -> i64 {
        self.ctime_ms
    }

    /// Modification time in milliseconds since the epoch (0 if unknown).
    pub fn mtime_ms(&self) -> i64 {
        self.mtime_ms
    }
}

/// Base name of a local path, falling back to the full path.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolves the vault destination for a local file.
///
/// `prefix` is stripped of leading/trailing slashes; an empty prefix puts
/// the file at the vault root.
pub fn resolve_destination(local: &Path, prefix: Option<&str>) -> String {
    let name = file_label(local);
    match prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => format!("{p}/{name}"),
        _ => name,
    }
}

fn millis_since_epoch(t: std::time::SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn new_rejects_bad_destination() {
        assert!(AttachmentJob::new("a", vec![], "../a.png").is_err());
        assert!(AttachmentJob::new("a", vec![], "/a.png").is_err());
        assert!(AttachmentJob::new("a", vec![1, 2], "img/a.png").is_ok());
    }

    #[test]
    fn size_tracks_bytes() {
        let job = AttachmentJob::new("a", vec![0; 1500], "a.bin").unwrap();
        assert_eq!(job.size_bytes(), 1500);
        assert_eq!(job.label(), "a");
        assert_eq!(job.destination_path(), "a.bin");
    }

    #[test]
    fn chunk_into_wire_keeps_fields() {
        let chunk = Chunk {
            transfer_id: "t".into(),
            sequence_number: 4,
            payload: vec![9],
            is_final: true,
        };
        let wire = chunk.into_wire();
        assert_eq!(wire.seq, 4);
        assert!(wire.is_final);
        assert_eq!(wire.payload, vec![9]);
    }

    #[test]
    fn destination_with_prefix() {
        let local = PathBuf::from("/tmp/pics/img1.webp");
        assert_eq!(resolve_destination(&local, None), "img1.webp");
        assert_eq!(resolve_destination(&local, Some("")), "img1.webp");
        assert_eq!(
            resolve_destination(&local, Some("/assets/xhs/")),
            "assets/xhs/img1.webp"
        );
    }

    #[tokio::test]
    async fn load_reads_file_and_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpegdata").unwrap();

        let job = AttachmentJob::load(&path, "assets/photo.jpg").await.unwrap();
        assert_eq!(job.label(), "photo.jpg");
        assert_eq!(job.source_bytes(), b"jpegdata");
        assert_eq!(job.size_bytes(), 8);
        assert!(job.mtime_ms() > 0);
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AttachmentJob::load(&dir.path().join("nope.png"), "nope.png")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
    }

    #[tokio::test]
    async fn load_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AttachmentJob::load(dir.path(), "x").await.unwrap_err();
        assert!(matches!(err, TransferError::NotAFile(_)));
    }
}

//! Request and response bodies for the note store API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/note`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NoteWrite<'a> {
    pub vault: &'a str,
    pub path: &'a str,
    pub content: &'a str,
}

/// Body of `PATCH /api/note/frontmatter`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FrontmatterWrite<'a> {
    pub vault: &'a str,
    pub path: &'a str,
    pub updates: &'a Map<String, Value>,
}

/// Envelope the server wraps its replies in.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub data: Option<NoteData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NoteData {
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

fn unknown() -> Value {
    Value::String("?".into())
}

/// Result of writing a note.
///
/// `version` and `id` are passed through as the server sent them; `"?"`
/// when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSaved {
    pub success: bool,
    pub note_path: String,
    pub version: Value,
    pub id: Value,
}

impl NoteSaved {
    pub(crate) fn from_response(note_path: &str, resp: ApiResponse) -> Self {
        let data = resp.data.unwrap_or_default();
        Self {
            success: true,
            note_path: note_path.to_string(),
            version: data.version.unwrap_or_else(unknown),
            id: data.id.unwrap_or_else(unknown),
        }
    }
}

/// Result of a frontmatter patch; echoes the applied fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontmatterPatched {
    pub success: bool,
    pub path: String,
    pub updates: Map<String, Value>,
}

/// Result of writing an index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEnsured {
    pub success: bool,
    pub path: String,
}

//! Client for the note store's REST API.
//!
//! Writes whole notes, patches frontmatter fields in place, and maintains
//! Dataview index pages. Authenticates with the same bearer token as the
//! sync channel.

pub mod client;
pub mod index;
pub mod types;

pub use client::{NoteStoreClient, NoteStoreError};
pub use index::{default_index_title, render_index_page};
pub use types::{FrontmatterPatched, IndexEnsured, NoteSaved};

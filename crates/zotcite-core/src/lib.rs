//! Citation engine over a Zotero library.
//!
//! [`Library`] owns the loaded entries and reloads them whenever the source
//! database changes. Each [`Entry`] carries a citation key computed by
//! [`CiteKeyEngine`] and can be rendered as a CSL-YAML reference
//! ([`csl::render`]) or a BibTeX record ([`bibtex::render`]).

use thiserror::Error;

pub mod annotations;
pub mod bibtex;
pub mod citekey;
pub mod config;
pub mod config_file;
pub mod csl;
pub mod document;
pub mod entry;
pub mod library;
pub mod lookup;
pub mod markup;
pub mod notes;
pub mod record;

// Re-export for convenience
pub use citekey::{CiteKeyEngine, KeyInputs, Placeholder};
pub use config::Settings;
pub use entry::Entry;
pub use library::{Attachment, Info, Library, RefData};
pub use zotcite_zotero::{AttachmentRef, Creator, CreatorGroup, ZoteroError};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Zotero(#[from] ZoteroError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Caller-visible lookup failures; the message is what callers show.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Collection \"{0}\" not found in Zotero database.")]
    CollectionNotFound(String),
}

//! Read-only access to a Zotero `zotero.sqlite` database.
//!
//! Zotero keeps its database locked while it runs, so the file is first
//! mirrored into a private directory ([`mirror_database`]) and every query
//! runs against the copy. [`ZoteroDatabase::load`] issues one scan per concern
//! (field values, creators, item types, attachments, notes, collection
//! membership, trash) and joins the partial results by item id into a
//! [`LoadedLibrary`].

mod mirror;
mod scan;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use thiserror::Error;

// Re-export for convenience
pub use mirror::{MIRROR_FILE_NAME, ensure_writable_dir, mirror_database, modified_time};
pub use scan::{CREATOR_PRIORITY, MAX_LISTED_AUTHORS};

#[derive(Error, Debug)]
pub enum ZoteroError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

/// One creator as stored by Zotero: surname plus given name.
///
/// Single-field creators (institutions) have an empty `first_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Creator {
    pub last_name: String,
    pub first_name: String,
}

impl Creator {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
        }
    }
}

/// All creators of one role (`author`, `editor`, ...) in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorGroup {
    pub role: String,
    pub names: Vec<Creator>,
}

/// A file attached to a parent item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRef {
    /// Zotero key of the attachment item itself.
    pub key: String,
    /// Path as stored by Zotero, e.g. `storage:paper.pdf`.
    pub path: String,
}

/// A bibliographic item after all scans have been joined.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawItem {
    /// Internal numeric id; only meaningful within one load.
    pub item_id: i64,
    /// Stable external key.
    pub key: String,
    pub item_type: String,
    /// Raw field name to value (`title`, `date`, `publicationTitle`, ...).
    pub fields: BTreeMap<String, String>,
    /// Creator groups in the order their role first appears.
    pub creators: Vec<CreatorGroup>,
    /// Comma-joined surnames of the highest-priority creator role present.
    pub primary_authors: String,
    pub attachments: Vec<AttachmentRef>,
    /// Raw HTML of every child note.
    pub notes: Vec<String>,
    pub collections: BTreeSet<String>,
}

impl RawItem {
    /// Creators of the given role, if any.
    pub fn creators_for(&self, role: &str) -> Option<&[Creator]> {
        self.creators
            .iter()
            .find(|g| g.role == role)
            .map(|g| g.names.as_slice())
    }
}

/// Everything produced by one load of the database.
#[derive(Debug, Clone, Default)]
pub struct LoadedLibrary {
    /// Items in ascending item-id order.
    pub items: Vec<RawItem>,
    /// Collection name to member item ids. Only ids present in `items` appear.
    pub collections: BTreeMap<String, Vec<i64>>,
}

/// Handle to an opened (mirrored) Zotero database.
pub struct ZoteroDatabase {
    conn: Connection,
    path: PathBuf,
}

impl ZoteroDatabase {
    /// Open a Zotero database read-only.
    ///
    /// Verifies that the `items` table exists.
    pub fn open(path: &Path) -> Result<Self, ZoteroError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='items'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Err(ZoteroError::Config(format!(
                "{} is not a Zotero database",
                path.display()
            )));
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Wrap an existing connection (used by tests with in-memory databases).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            path: PathBuf::from(":memory:"),
        }
    }

    /// Run every scan and join the results.
    ///
    /// Any database error aborts the whole load; nothing partial is returned.
    pub fn load(&self) -> Result<LoadedLibrary, ZoteroError> {
        scan::load(&self.conn)
    }

    /// Get the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

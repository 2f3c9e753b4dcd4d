//! Builder for small Zotero-shaped SQLite databases used by integration tests.
#![allow(dead_code)]

use std::path::Path;

use rusqlite::{Connection, params};

const SCHEMA: &str = include_str!("../fixtures/schema.sql");

pub struct Fixture {
    pub conn: Connection,
}

impl Fixture {
    /// Create the Zotero tables in a new database file.
    pub fn create(path: &Path) -> Self {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        Self { conn }
    }

    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        Self { conn }
    }

    fn lookup_id(&self, table: &str, id_col: &str, name_col: &str, name: &str) -> i64 {
        self.conn
            .execute(
                &format!("INSERT OR IGNORE INTO {table} ({name_col}) VALUES (?1)"),
                params![name],
            )
            .unwrap();
        self.conn
            .query_row(
                &format!("SELECT {id_col} FROM {table} WHERE {name_col} = ?1"),
                params![name],
                |row| row.get(0),
            )
            .unwrap()
    }

    pub fn item(&self, item_id: i64, key: &str, item_type: &str) -> &Self {
        let type_id = self.lookup_id("itemTypes", "itemTypeID", "typeName", item_type);
        self.conn
            .execute(
                "INSERT INTO items (itemID, itemTypeID, key) VALUES (?1, ?2, ?3)",
                params![item_id, type_id, key],
            )
            .unwrap();
        self
    }

    pub fn field(&self, item_id: i64, name: &str, value: &str) -> &Self {
        let field_id = self.lookup_id("fields", "fieldID", "fieldName", name);
        let value_id = self.lookup_id("itemDataValues", "valueID", "value", value);
        self.conn
            .execute(
                "INSERT INTO itemData (itemID, fieldID, valueID) VALUES (?1, ?2, ?3)",
                params![item_id, field_id, value_id],
            )
            .unwrap();
        self
    }

    pub fn creator(&self, item_id: i64, role: &str, last: &str, first: &str, order: i64) -> &Self {
        let type_id = self.lookup_id("creatorTypes", "creatorTypeID", "creatorType", role);
        self.conn
            .execute(
                "INSERT INTO creators (firstName, lastName, fieldMode) VALUES (?1, ?2, 0)",
                params![first, last],
            )
            .unwrap();
        let creator_id = self.conn.last_insert_rowid();
        self.conn
            .execute(
                "INSERT INTO itemCreators (itemID, creatorID, creatorTypeID, orderIndex) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![item_id, creator_id, type_id, order],
            )
            .unwrap();
        self
    }

    /// Add an attachment item (`attachment_id`) under `parent_id`.
    pub fn attachment(&self, attachment_id: i64, key: &str, parent_id: i64, path: &str) -> &Self {
        self.item(attachment_id, key, "attachment");
        self.field(attachment_id, "title", "Full Text PDF");
        self.conn
            .execute(
                "INSERT INTO itemAttachments (itemID, parentItemID, linkMode, contentType, path) \
                 VALUES (?1, ?2, 0, 'application/pdf', ?3)",
                params![attachment_id, parent_id, path],
            )
            .unwrap();
        self
    }

    pub fn note(&self, note_id: i64, key: &str, parent_id: i64, html: &str) -> &Self {
        self.item(note_id, key, "note");
        self.conn
            .execute(
                "INSERT INTO itemNotes (itemID, parentItemID, note, title) VALUES (?1, ?2, ?3, '')",
                params![note_id, parent_id, html],
            )
            .unwrap();
        self
    }

    pub fn collection(&self, collection_id: i64, name: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO collections (collectionID, collectionName, key) VALUES (?1, ?2, ?3)",
                params![collection_id, name, format!("C{collection_id}")],
            )
            .unwrap();
        self
    }

    pub fn add_to_collection(&self, collection_id: i64, item_id: i64, order: i64) -> &Self {
        self.conn
            .execute(
                "INSERT INTO collectionItems (collectionID, itemID, orderIndex) VALUES (?1, ?2, ?3)",
                params![collection_id, item_id, order],
            )
            .unwrap();
        self
    }

    pub fn trash(&self, item_id: i64) -> &Self {
        self.conn
            .execute("INSERT INTO deletedItems (itemID) VALUES (?1)", params![item_id])
            .unwrap();
        self
    }

    /// Insert a complete journal article in one call.
    pub fn article(&self, item_id: i64, key: &str, title: &str, date: &str, authors: &[(&str, &str)]) -> &Self {
        self.item(item_id, key, "journalArticle");
        self.field(item_id, "title", title);
        self.field(item_id, "date", date);
        for (i, (last, first)) in authors.iter().enumerate() {
            self.creator(item_id, "author", last, first, i as i64);
        }
        self
    }
}

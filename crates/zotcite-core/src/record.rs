//! Field mapping shared by both renderers.
//!
//! An [`Entry`] is first turned into a [`Record`]: field name to a tagged
//! value. Each renderer then applies its own rename tables as pure
//! transforms before printing.

use std::collections::BTreeMap;

use zotcite_zotero::Creator;

use crate::entry::Entry;

/// Static `(from, to)` association list.
pub type RenameTable = &'static [(&'static str, &'static str)];

/// Key under which the primary date is stored, whatever its source field.
pub const DATE_KEY: &str = "date";
/// Key under which attachments are stored as `KEY:path` strings.
pub const ATTACHMENT_KEY: &str = "attachment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Names(Vec<Creator>),
    Date(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: String,
    pub fields: BTreeMap<String, FieldValue>,
}

pub fn lookup(table: RenameTable, name: &str) -> Option<&'static str> {
    table.iter().find(|(from, _)| *from == name).map(|(_, to)| *to)
}

impl Record {
    pub fn from_entry(entry: &Entry) -> Self {
        let mut fields = BTreeMap::new();
        let date = entry.date_field();

        for (name, value) in &entry.fields {
            if date.is_some_and(|(date_name, _)| date_name == name) {
                continue;
            }
            fields.insert(name.clone(), FieldValue::Text(value.clone()));
        }
        if let Some((_, value)) = date {
            fields.insert(DATE_KEY.to_string(), FieldValue::Date(value.to_string()));
        }
        for group in &entry.creators {
            fields.insert(group.role.clone(), FieldValue::Names(group.names.clone()));
        }
        if !entry.attachments.is_empty() {
            fields.insert(
                ATTACHMENT_KEY.to_string(),
                FieldValue::List(
                    entry
                        .attachments
                        .iter()
                        .map(|a| format!("{}:{}", a.key, a.path))
                        .collect(),
                ),
            );
        }

        Self {
            kind: entry.item_type.clone(),
            fields,
        }
    }

    /// Rename the item type; unknown types become `fallback` when given.
    pub fn rename_kind(mut self, table: RenameTable, fallback: Option<&str>) -> Self {
        if let Some(to) = lookup(table, &self.kind) {
            self.kind = to.to_string();
        } else if let Some(f) = fallback {
            self.kind = f.to_string();
        }
        self
    }

    /// Rename field keys. When two source fields land on the same target,
    /// the first in key order wins and the other is dropped.
    pub fn rename_fields(self, table: RenameTable) -> Self {
        let mut fields = BTreeMap::new();
        for (name, value) in self.fields {
            let target = lookup(table, &name).map(str::to_string).unwrap_or(name);
            fields.entry(target).or_insert(value);
        }
        Self {
            kind: self.kind,
            fields,
        }
    }

    /// Rename one field if present and the target is free.
    pub fn rename(&mut self, from: &str, to: &str) {
        if self.fields.contains_key(to) {
            return;
        }
        if let Some(value) = self.fields.remove(from) {
            self.fields.insert(to.to_string(), value);
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn has_names(&self, role: &str) -> bool {
        matches!(self.fields.get(role), Some(FieldValue::Names(_)))
    }

    /// Creator roles in output order: `author`, then `editor`, then the rest
    /// alphabetically.
    pub fn name_fields(&self) -> Vec<(&str, &[Creator])> {
        let mut roles: Vec<(&str, &[Creator])> = self
            .fields
            .iter()
            .filter_map(|(k, v)| match v {
                FieldValue::Names(n) => Some((k.as_str(), n.as_slice())),
                _ => None,
            })
            .collect();
        roles.sort_by_key(|(role, _)| match *role {
            "author" => 0,
            "editor" => 1,
            _ => 2,
        });
        roles
    }
}

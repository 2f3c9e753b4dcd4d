//! Independent scans over the Zotero schema, joined by item id.

use std::collections::{BTreeMap, HashMap, HashSet};

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::{AttachmentRef, Creator, CreatorGroup, LoadedLibrary, RawItem, ZoteroError};

/// Creator roles that may stand in for the author, highest priority first.
pub const CREATOR_PRIORITY: [&str; 18] = [
    "author",
    "editor",
    "seriesEditor",
    "translator",
    "reviewedAuthor",
    "artist",
    "performer",
    "composer",
    "director",
    "podcaster",
    "cartographer",
    "programmer",
    "presenter",
    "interviewee",
    "sponsor",
    "inventor",
    "bookAuthor",
    "contributor",
];

/// Surnames listed in [`RawItem::primary_authors`] before "et al.".
pub const MAX_LISTED_AUTHORS: usize = 3;

/// Item types that are children of a reference rather than references.
const NON_BIBLIOGRAPHIC: [&str; 3] = ["attachment", "note", "annotation"];

/// Run all scans and join them.
pub(crate) fn load(conn: &Connection) -> Result<LoadedLibrary, ZoteroError> {
    let mut items = scan_fields(conn)?;
    let mut creators = scan_creators(conn)?;
    let types = scan_types(conn)?;
    let mut attachments = scan_attachments(conn)?;
    let mut notes = scan_notes(conn)?;
    let memberships = scan_collections(conn)?;
    let trash = scan_trash(conn)?;

    tracing::debug!(
        items = items.len(),
        with_creators = creators.len(),
        trashed = trash.len(),
        "zotero scans complete"
    );

    items.retain(|id, item| {
        if trash.contains(id) {
            return false;
        }
        match types.get(id) {
            Some(t) if !NON_BIBLIOGRAPHIC.contains(&t.as_str()) => {
                item.item_type = t.clone();
                true
            }
            _ => false,
        }
    });

    for (id, item) in items.iter_mut() {
        if let Some(groups) = creators.remove(id) {
            item.primary_authors = primary_authors(&groups);
            item.creators = groups;
        }
        if let Some(list) = attachments.remove(id) {
            item.attachments = list;
        }
        if let Some(list) = notes.remove(id) {
            item.notes = list;
        }
    }

    let mut collections = BTreeMap::new();
    for (name, ids) in memberships {
        let mut seen = HashSet::new();
        let members: Vec<i64> = ids
            .into_iter()
            .filter(|id| items.contains_key(id) && seen.insert(*id))
            .collect();
        for id in &members {
            if let Some(item) = items.get_mut(id) {
                item.collections.insert(name.clone());
            }
        }
        collections.insert(name, members);
    }

    Ok(LoadedLibrary {
        items: items.into_values().collect(),
        collections,
    })
}

/// Field values, one partial item per item id.
fn scan_fields(conn: &Connection) -> Result<BTreeMap<i64, RawItem>, ZoteroError> {
    let mut stmt = conn.prepare(
        "SELECT items.itemID, items.key, fields.fieldName, itemDataValues.value \
         FROM items \
         JOIN itemData ON items.itemID = itemData.itemID \
         JOIN fields ON itemData.fieldID = fields.fieldID \
         JOIN itemDataValues ON itemData.valueID = itemDataValues.valueID \
         ORDER BY items.itemID",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                value_to_string(row.get_ref(3)?),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut items: BTreeMap<i64, RawItem> = BTreeMap::new();
    for (item_id, key, field, value) in rows {
        let item = items.entry(item_id).or_insert_with(|| RawItem {
            item_id,
            key,
            ..Default::default()
        });
        item.fields.insert(field, value);
    }
    Ok(items)
}

/// Creators grouped by role, preserving `orderIndex` order.
fn scan_creators(conn: &Connection) -> Result<HashMap<i64, Vec<CreatorGroup>>, ZoteroError> {
    let mut stmt = conn.prepare(
        "SELECT itemCreators.itemID, creatorTypes.creatorType, creators.lastName, creators.firstName \
         FROM itemCreators \
         JOIN creators ON itemCreators.creatorID = creators.creatorID \
         JOIN creatorTypes ON itemCreators.creatorTypeID = creatorTypes.creatorTypeID \
         ORDER BY itemCreators.itemID, itemCreators.orderIndex",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut creators: HashMap<i64, Vec<CreatorGroup>> = HashMap::new();
    for (item_id, role, last, first) in rows {
        let groups = creators.entry(item_id).or_default();
        let creator = Creator::new(last, first);
        match groups.iter_mut().find(|g| g.role == role) {
            Some(group) => group.names.push(creator),
            None => groups.push(CreatorGroup {
                role,
                names: vec![creator],
            }),
        }
    }
    Ok(creators)
}

fn scan_types(conn: &Connection) -> Result<HashMap<i64, String>, ZoteroError> {
    let mut stmt = conn.prepare(
        "SELECT items.itemID, itemTypes.typeName \
         FROM items JOIN itemTypes ON items.itemTypeID = itemTypes.itemTypeID",
    )?;
    let types = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(types)
}

/// Attachment key and path, keyed by the parent item id.
fn scan_attachments(
    conn: &Connection,
) -> Result<HashMap<i64, Vec<AttachmentRef>>, ZoteroError> {
    let mut stmt = conn.prepare(
        "SELECT items.key, itemAttachments.parentItemID, itemAttachments.path \
         FROM itemAttachments JOIN items ON items.itemID = itemAttachments.itemID \
         WHERE itemAttachments.parentItemID IS NOT NULL AND itemAttachments.path IS NOT NULL \
         ORDER BY itemAttachments.parentItemID, items.itemID",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut attachments: HashMap<i64, Vec<AttachmentRef>> = HashMap::new();
    for (key, parent, path) in rows {
        attachments
            .entry(parent)
            .or_default()
            .push(AttachmentRef { key, path });
    }
    Ok(attachments)
}

/// Child notes (raw HTML), keyed by the parent item id.
fn scan_notes(conn: &Connection) -> Result<HashMap<i64, Vec<String>>, ZoteroError> {
    let mut stmt = conn.prepare(
        "SELECT parentItemID, note FROM itemNotes \
         WHERE parentItemID IS NOT NULL AND note IS NOT NULL \
         ORDER BY parentItemID, itemID",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut notes: HashMap<i64, Vec<String>> = HashMap::new();
    for (parent, note) in rows {
        notes.entry(parent).or_default().push(note);
    }
    Ok(notes)
}

/// Every collection name, including empty ones, with its raw member ids.
fn scan_collections(conn: &Connection) -> Result<BTreeMap<String, Vec<i64>>, ZoteroError> {
    let mut collections: BTreeMap<String, Vec<i64>> = BTreeMap::new();

    let mut stmt = conn.prepare("SELECT collectionName FROM collections")?;
    for name in stmt.query_map([], |row| row.get::<_, String>(0))? {
        collections.entry(name?).or_default();
    }

    let mut stmt = conn.prepare(
        "SELECT collections.collectionName, collectionItems.itemID \
         FROM collectionItems \
         JOIN collections ON collections.collectionID = collectionItems.collectionID \
         ORDER BY collections.collectionName, collectionItems.orderIndex, collectionItems.itemID",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (name, item_id) in rows {
        collections.entry(name).or_default().push(item_id);
    }
    Ok(collections)
}

fn scan_trash(conn: &Connection) -> Result<HashSet<i64>, ZoteroError> {
    let mut stmt = conn.prepare("SELECT itemID FROM deletedItems")?;
    let trash = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(trash)
}

/// Surnames of the highest-priority creator role present, comma-joined and
/// capped at [`MAX_LISTED_AUTHORS`].
pub(crate) fn primary_authors(groups: &[CreatorGroup]) -> String {
    let Some(group) = CREATOR_PRIORITY
        .iter()
        .find_map(|role| groups.iter().find(|g| g.role == *role))
    else {
        return String::new();
    };

    let surnames: Vec<&str> = group
        .names
        .iter()
        .map(|c| c.last_name.as_str())
        .collect();
    if surnames.len() > MAX_LISTED_AUTHORS {
        format!("{} et al.", surnames[..MAX_LISTED_AUTHORS].join(", "))
    } else {
        surnames.join(", ")
    }
}

/// `itemDataValues.value` is untyped; numbers show up for fields like `volume`.
fn value_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(role: &str, surnames: &[&str]) -> CreatorGroup {
        CreatorGroup {
            role: role.to_string(),
            names: surnames.iter().map(|s| Creator::new(*s, "X")).collect(),
        }
    }

    #[test]
    fn test_primary_authors_prefers_author_role() {
        let groups = vec![group("editor", &["Ed"]), group("author", &["Smith", "Jones"])];
        assert_eq!(primary_authors(&groups), "Smith, Jones");
    }

    #[test]
    fn test_primary_authors_falls_back_by_priority() {
        let groups = vec![
            group("contributor", &["Late"]),
            group("translator", &["Trans"]),
            group("editor", &["Ed"]),
        ];
        assert_eq!(primary_authors(&groups), "Ed");
    }

    #[test]
    fn test_primary_authors_unknown_roles_only() {
        let groups = vec![group("castMember", &["Actor"])];
        assert_eq!(primary_authors(&groups), "");
    }

    #[test]
    fn test_primary_authors_truncated() {
        let groups = vec![group("author", &["A", "B", "C", "D"])];
        assert_eq!(primary_authors(&groups), "A, B, C et al.");
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(ValueRef::Integer(12)), "12");
        assert_eq!(value_to_string(ValueRef::Text(b"Title")), "Title");
        assert_eq!(value_to_string(ValueRef::Null), "");
    }
}

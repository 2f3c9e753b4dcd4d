//! Materialized entries: a loaded item plus its year and citation key.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use zotcite_zotero::{AttachmentRef, CREATOR_PRIORITY, Creator, CreatorGroup, RawItem};

use crate::citekey::{CiteKeyEngine, KeyInputs};

/// Date fields consulted for the year, in order. Only the first present one
/// is used.
pub const DATE_FIELDS: [&str; 4] = ["date", "dateDecided", "dateEnacted", "issueDate"];

/// One bibliographic item.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    /// External key (`items.key`).
    pub key: String,
    /// Internal id, valid for one load only.
    pub item_id: i64,
    pub item_type: String,
    pub fields: BTreeMap<String, String>,
    pub creators: Vec<CreatorGroup>,
    pub primary_authors: String,
    pub attachments: Vec<AttachmentRef>,
    #[serde(skip)]
    pub notes: Vec<String>,
    pub collections: BTreeSet<String>,
    pub year: String,
    pub citekey: String,
}

impl Entry {
    pub fn from_raw(raw: RawItem, engine: &CiteKeyEngine) -> Self {
        let mut entry = Self {
            key: raw.key,
            item_id: raw.item_id,
            item_type: raw.item_type,
            fields: raw.fields,
            creators: raw.creators,
            primary_authors: raw.primary_authors,
            attachments: raw.attachments,
            notes: raw.notes,
            collections: raw.collections,
            year: String::new(),
            citekey: String::new(),
        };
        entry.year = entry
            .date_field()
            .map(|(_, d)| extract_year(d).to_string())
            .unwrap_or_default();
        entry.citekey = engine.citekey(&KeyInputs {
            creators: entry.key_creators().map(|g| g.names.as_slice()),
            year: &entry.year,
            title: entry.title(),
        });
        entry
    }

    /// Title, or `""` when the item has none.
    pub fn title(&self) -> &str {
        self.fields.get("title").map(String::as_str).unwrap_or("")
    }

    /// The first date field present, as `(name, value)`.
    pub fn date_field(&self) -> Option<(&'static str, &str)> {
        DATE_FIELDS
            .iter()
            .find_map(|name| self.fields.get(*name).map(|v| (*name, v.as_str())))
    }

    pub fn creators_for(&self, role: &str) -> Option<&[Creator]> {
        self.creators
            .iter()
            .find(|g| g.role == role)
            .map(|g| g.names.as_slice())
    }

    /// The highest-priority creator group present; its surnames feed the
    /// citation key.
    pub fn key_creators(&self) -> Option<&CreatorGroup> {
        CREATOR_PRIORITY
            .iter()
            .find_map(|role| self.creators.iter().find(|g| g.role == *role))
    }

    /// `KEY#citekey<TAB>authors<TAB>(year) title`, the line shown while
    /// completing citations.
    pub fn completion_line(&self) -> String {
        let authors = if self.primary_authors.is_empty() {
            " "
        } else {
            self.primary_authors.as_str()
        };
        format!(
            "{}#{}\t{}\t({}) {}",
            self.key,
            self.citekey,
            authors,
            self.year,
            self.title()
        )
    }
}

/// Year of a Zotero date: text before the first space, then before the
/// first `-` (`"2020-05-00 2020-05"` gives `"2020"`).
pub fn extract_year(date: &str) -> &str {
    let first = date.split(' ').next().unwrap_or("");
    first.split('-').next().unwrap_or("")
}

/// Year, month and day of a Zotero date (`YYYY-MM-DD ...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts<'a> {
    pub year: &'a str,
    /// `None` when absent or `"00"`.
    pub month: Option<&'a str>,
    /// `None` when absent or `"00"`.
    pub day: Option<&'a str>,
}

impl<'a> DateParts<'a> {
    pub fn parse(date: &'a str) -> Self {
        let first = date.split(' ').next().unwrap_or("");
        let mut parts = first.split('-');
        let year = parts.next().unwrap_or("");
        let known = |p: Option<&'a str>| p.filter(|s| !s.is_empty() && *s != "00");
        let month = known(parts.next());
        let day = known(parts.next());
        Self { year, month, day }
    }

    /// A date block is emitted only for a non-zero year.
    pub fn has_year(&self) -> bool {
        !self.year.is_empty() && self.year.chars().any(|c| c != '0')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fields: &[(&str, &str)], creators: Vec<CreatorGroup>) -> RawItem {
        RawItem {
            item_id: 7,
            key: "ABCD1234".to_string(),
            item_type: "journalArticle".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            creators,
            ..Default::default()
        }
    }

    fn authors(role: &str, surnames: &[&str]) -> CreatorGroup {
        CreatorGroup {
            role: role.to_string(),
            names: surnames.iter().map(|s| Creator::new(*s, "X")).collect(),
        }
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2020-05-00"), "2020");
        assert_eq!(extract_year("2015-05-28 2015-05-28"), "2015");
        assert_eq!(extract_year("1999"), "1999");
        assert_eq!(extract_year(""), "");
    }

    #[test]
    fn test_date_parts() {
        let d = DateParts::parse("2020-05-00 2020-05");
        assert_eq!(d.year, "2020");
        assert_eq!(d.month, Some("05"));
        assert_eq!(d.day, None);
        assert!(d.has_year());

        let zero = DateParts::parse("0000-00-00");
        assert!(!zero.has_year());
        assert_eq!(zero.month, None);
    }

    #[test]
    fn test_from_raw_computes_year_and_citekey() {
        let e = Entry::from_raw(
            raw(
                &[("title", "A Title"), ("date", "2019-01-01 2019")],
                vec![authors("author", &["Doe"])],
            ),
            &CiteKeyEngine::default(),
        );
        assert_eq!(e.year, "2019");
        assert_eq!(e.citekey, "Doe_2019");
    }

    #[test]
    fn test_year_falls_back_to_secondary_date() {
        let e = Entry::from_raw(
            raw(&[("dateDecided", "1954-05-17")], vec![]),
            &CiteKeyEngine::default(),
        );
        assert_eq!(e.year, "1954");
        assert_eq!(e.date_field(), Some(("dateDecided", "1954-05-17")));
        assert_eq!(e.title(), "");
    }

    #[test]
    fn test_key_creators_follow_priority() {
        let e = Entry::from_raw(
            raw(
                &[("date", "2001")],
                vec![authors("translator", &["Trans"]), authors("editor", &["Ed"])],
            ),
            &CiteKeyEngine::default(),
        );
        assert_eq!(e.key_creators().unwrap().role, "editor");
        assert_eq!(e.citekey, "Ed_2001");
    }

    #[test]
    fn test_completion_line() {
        let mut e = Entry::from_raw(
            raw(&[("title", "Paper"), ("date", "2020")], vec![]),
            &CiteKeyEngine::default(),
        );
        assert_eq!(e.completion_line(), "ABCD1234#No_Author_2020\t \t(2020) Paper");
        e.primary_authors = "Smith, Jones".to_string();
        assert_eq!(
            e.completion_line(),
            "ABCD1234#No_Author_2020\tSmith, Jones\t(2020) Paper"
        );
    }
}

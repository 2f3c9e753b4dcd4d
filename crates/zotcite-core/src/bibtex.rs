//! BibTeX records.

use std::fmt::Write;

use crate::entry::{DateParts, Entry};
use crate::markup::{latex_escape, page_range_dashes};
use crate::record::{FieldValue, Record, RenameTable};

/// Zotero item type to BibTeX entry type; anything unlisted is `Misc`.
pub const TYPES: RenameTable = &[
    ("artwork", "Misc"),
    ("audioRecording", "Misc"),
    ("blogPost", "Misc"),
    ("book", "Book"),
    ("bookSection", "InCollection"),
    ("case", "Misc"),
    ("computerProgram", "Book"),
    ("conferencePaper", "InProceedings"),
    ("dictionaryEntry", "InCollection"),
    ("document", "TechReport"),
    ("email", "Misc"),
    ("encyclopediaArticle", "InCollection"),
    ("film", "Misc"),
    ("forumPost", "Misc"),
    ("hearing", "Misc"),
    ("instantMessage", "Misc"),
    ("interview", "Misc"),
    ("journalArticle", "Article"),
    ("letter", "Misc"),
    ("magazineArticle", "Article"),
    ("newspaperArticle", "Article"),
    ("note", "Misc"),
    ("podcast", "Misc"),
    ("presentation", "Misc"),
    ("radioBroadcast", "Misc"),
    ("report", "TechReport"),
    ("statute", "Misc"),
    ("thesis", "Thesis"),
    ("tvBroadcast", "Misc"),
    ("videoRecording", "Misc"),
];

/// Zotero field name to BibTeX field. Unlisted fields keep their name.
pub const FIELDS: RenameTable = &[
    ("abstractNote", "abstract"),
    ("accessDate", "urldate"),
    ("applicationNumber", "call-number"),
    ("archiveLocation", "archive_location"),
    ("artworkMedium", "medium"),
    ("artworkSize", "dimensions"),
    ("attachment", "file"),
    ("audioFileType", "medium"),
    ("blogTitle", "booktitle"),
    ("bookTitle", "booktitle"),
    ("callNumber", "call-number"),
    ("code", "booktitle"),
    ("codeNumber", "volume"),
    ("codePages", "pages"),
    ("codeVolume", "volume"),
    ("conferenceName", "event"),
    ("court", "authority"),
    ("date", "issued"),
    ("dictionaryTitle", "booktitle"),
    ("distributor", "publisher"),
    ("encyclopediaTitle", "booktitle"),
    ("extra", "note"),
    ("filingDate", "submitted"),
    ("forumTitle", "booktitle"),
    ("genre", "type"),
    ("history", "references"),
    ("institution", "publisher"),
    ("interviewMedium", "medium"),
    ("issue", "number"),
    ("issuingAuthority", "authority"),
    ("journalAbbreviation", "shortjournal"),
    ("legalStatus", "status"),
    ("legislativeBody", "authority"),
    ("libraryCatalog", "source"),
    ("meetingName", "event"),
    ("numPages", "pages"),
    ("numberOfVolumes", "volume"),
    ("place", "address"),
    ("priorityNumbers", "issue"),
    ("proceedingsTitle", "booktitle"),
    ("programTitle", "booktitle"),
    ("programmingLanguage", "type"),
    ("publicationTitle", "booktitle"),
    ("reporter", "booktitle"),
    ("runningTime", "dimensions"),
    ("seriesNumber", "number"),
    ("session", "chapter-number"),
    ("shortTitle", "shorttitle"),
    ("system", "medium"),
    ("thesisType", "type"),
    ("university", "publisher"),
    ("url", "URL"),
    ("versionNumber", "version"),
    ("websiteTitle", "booktitle"),
    ("websiteType", "type"),
];

/// Zotero creator roles with a different BibTeX field name.
pub const ROLES: RenameTable = &[
    ("bookAuthor", "bookauthor"),
    ("seriesEditor", "serieseditor"),
    ("reviewedAuthor", "reviewedauthor"),
];

/// Free-text fields that get LaTeX escaping.
const LATEX_FIELDS: [&str; 6] = [
    "title",
    "journal",
    "booktitle",
    "shortjournal",
    "address",
    "publisher",
];

const DENYLIST: [&str; 7] = [
    "abstract",
    "citekey",
    "zotkey",
    "etype",
    "year",
    "alastnm",
    "collection",
];

/// Render one BibTeX record. The header key is `citekey` up to any `#`.
pub fn render(entry: &Entry, citekey: &str) -> String {
    let mut record = Record::from_entry(entry)
        .rename_kind(TYPES, Some("Misc"))
        .rename_fields(ROLES)
        .rename_fields(FIELDS);

    if record.kind == "Article" {
        record.rename("booktitle", "journal");
    }
    if record.kind == "InCollection" && !record.has_names("editor") {
        record.kind = "InBook".to_string();
    }

    let key = citekey.split('#').next().unwrap_or(citekey);
    let mut out = String::new();
    let _ = writeln!(out, "@{}{{{},", record.kind, key);

    for (role, names) in record.name_fields() {
        let joined: Vec<String> = names
            .iter()
            .map(|n| {
                if n.first_name.is_empty() {
                    n.last_name.clone()
                } else {
                    format!("{}, {}", n.last_name, n.first_name)
                }
            })
            .collect();
        let _ = writeln!(out, "  {} = {{{}}},", role, joined.join(" and "));
    }

    for (name, value) in &record.fields {
        if DENYLIST.contains(&name.as_str()) {
            continue;
        }
        match value {
            FieldValue::Date(date) => {
                let parts = DateParts::parse(date);
                if !parts.has_year() {
                    continue;
                }
                let _ = writeln!(out, "  year = {{{}}},", entry.year);
                if let Some(month) = parts.month {
                    let _ = writeln!(out, "  month = {{{}}},", month);
                }
                if let Some(day) = parts.day {
                    let _ = writeln!(out, "  day = {{{}}},", day);
                }
            }
            FieldValue::Text(text) => {
                let text = if LATEX_FIELDS.contains(&name.as_str()) {
                    latex_escape(text)
                } else if name == "pages" {
                    page_range_dashes(text)
                } else {
                    text.clone()
                };
                let _ = writeln!(out, "  {} = {{{}}},", name, text);
            }
            FieldValue::List(items) => {
                let _ = writeln!(out, "  {} = {{{}}},", name, items.join(";"));
            }
            FieldValue::Names(_) => {}
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citekey::CiteKeyEngine;
    use zotcite_zotero::{AttachmentRef, Creator, CreatorGroup, RawItem};

    fn entry(item_type: &str, fields: &[(&str, &str)], creators: Vec<CreatorGroup>) -> Entry {
        let raw = RawItem {
            item_id: 1,
            key: "ABCD1234".to_string(),
            item_type: item_type.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            creators,
            ..Default::default()
        };
        Entry::from_raw(raw, &CiteKeyEngine::default())
    }

    fn group(role: &str, names: &[(&str, &str)]) -> CreatorGroup {
        CreatorGroup {
            role: role.to_string(),
            names: names.iter().map(|(l, f)| Creator::new(*l, *f)).collect(),
        }
    }

    #[test]
    fn test_render_article() {
        let e = entry(
            "journalArticle",
            &[
                ("title", "Fish & <i>Chips</i>"),
                ("date", "2020-05-00"),
                ("publicationTitle", "J_Food"),
                ("pages", "10-20"),
                ("abstractNote", "Skipped"),
                ("volume", "3"),
            ],
            vec![group("author", &[("Smith", "Jane"), ("Doe", "John")])],
        );
        let out = render(&e, "ABCD1234#Smith_Doe_2020");
        assert_eq!(
            out,
            "@Article{ABCD1234,\n\
             \x20 author = {Smith, Jane and Doe, John},\n\
             \x20 year = {2020},\n\
             \x20 month = {05},\n\
             \x20 journal = {J\\_Food},\n\
             \x20 pages = {10--20},\n\
             \x20 title = {Fish \\& \\textit{Chips}},\n\
             \x20 volume = {3},\n\
             }\n"
        );
    }

    #[test]
    fn test_header_key_without_suffix() {
        let e = entry("book", &[], vec![]);
        assert!(render(&e, "Smith_2020").starts_with("@Book{Smith_2020,\n"));
        assert!(render(&e, "X#Y#Z").starts_with("@Book{X,\n"));
    }

    #[test]
    fn test_unknown_type_is_misc() {
        let e = entry("webpage", &[], vec![]);
        assert!(render(&e, "K").starts_with("@Misc{K,"));
    }

    #[test]
    fn test_incollection_without_editor_is_inbook() {
        let e = entry("bookSection", &[("bookTitle", "Big Book")], vec![]);
        let out = render(&e, "K");
        assert!(out.starts_with("@InBook{K,"));
        assert!(out.contains("  booktitle = {Big Book},\n"));

        let e = entry(
            "bookSection",
            &[("bookTitle", "Big Book")],
            vec![group("editor", &[("Ed", "E")])],
        );
        assert!(render(&e, "K").starts_with("@InCollection{K,"));
    }

    #[test]
    fn test_attachments_and_institutional_author() {
        let mut e = entry("report", &[("institution", "R&D Lab")], vec![group("author", &[("WHO", "")])]);
        e.attachments.push(AttachmentRef {
            key: "ATT1".to_string(),
            path: "storage:report.pdf".to_string(),
        });
        let out = render(&e, "K");
        assert!(out.starts_with("@TechReport{K,\n  author = {WHO},\n"));
        assert!(out.contains("  file = {ATT1:storage:report.pdf},\n"));
        assert!(out.contains("  publisher = {R\\&D Lab},\n"));
    }

    #[test]
    fn test_idempotent() {
        let e = entry(
            "conferencePaper",
            &[("title", "50% [draft]"), ("date", "1999-12-31")],
            vec![group("author", &[("Lee", "A")])],
        );
        assert_eq!(render(&e, "K"), render(&e, "K"));
        assert!(render(&e, "K").contains("  title = {50\\% {[}draft{]}},\n"));
    }
}

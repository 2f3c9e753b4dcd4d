//! CSL-YAML references, as read by Pandoc's citeproc from a YAML header.
//!
//! ```text
//!   - type: "article-journal"
//!     id: "ABCD1234#Smith_2020"
//!     author:
//!       - family: "Smith"
//!         given: "Jane"
//!     issued:
//!       - year: "2020"
//!         month: "05"
//!     title: "..."
//! ```

use std::fmt::Write;

use crate::entry::{DateParts, Entry};
use crate::markup::yaml_escape;
use crate::record::{ATTACHMENT_KEY, DATE_KEY, FieldValue, Record, RenameTable};

/// Zotero item type to CSL type. Types not listed pass through unchanged.
pub const TYPES: RenameTable = &[
    ("artwork", "graphic"),
    ("audioRecording", "song"),
    ("blogPost", "post-weblog"),
    ("bookSection", "chapter"),
    ("case", "legal_case"),
    ("computerProgram", "book"),
    ("conferencePaper", "paper-conference"),
    ("dictionaryEntry", "entry-dictionary"),
    ("document", "report"),
    ("email", "personal_communication"),
    ("encyclopediaArticle", "entry-encyclopedia"),
    ("film", "motion_picture"),
    ("forumPost", "post"),
    ("hearing", "bill"),
    ("instantMessage", "personal_communication"),
    ("interview", "interview"),
    ("journalArticle", "article-journal"),
    ("letter", "personal_communication"),
    ("magazineArticle", "article-magazine"),
    ("newspaperArticle", "article-newspaper"),
    ("note", "manuscript"),
    ("podcast", "broadcast"),
    ("presentation", "speech"),
    ("radioBroadcast", "broadcast"),
    ("statute", "legislation"),
    ("tvBroadcast", "broadcast"),
    ("videoRecording", "motion_picture"),
];

/// Zotero field name to CSL variable. Incomplete; unlisted fields keep
/// their Zotero name.
pub const FIELDS: RenameTable = &[
    ("abstractNote", "abstract"),
    ("accessDate", "accessed"),
    ("applicationNumber", "call-number"),
    ("archiveLocation", "archive_location"),
    ("artworkMedium", "medium"),
    ("artworkSize", "dimensions"),
    ("audioFileType", "medium"),
    ("billNumber", "number"),
    ("blogTitle", "container-title"),
    ("bookTitle", "container-title"),
    ("callNumber", "call-number"),
    ("caseName", "title"),
    ("code", "container-title"),
    ("codeNumber", "volume"),
    ("codePages", "page"),
    ("codeVolume", "volume"),
    ("conferenceName", "event"),
    ("court", "authority"),
    ("date", "issued"),
    ("dictionaryTitle", "container-title"),
    ("distributor", "publisher"),
    ("docketNumber", "number"),
    ("encyclopediaTitle", "container-title"),
    ("extra", "note"),
    ("filingDate", "submitted"),
    ("forumTitle", "container-title"),
    ("history", "references"),
    ("institution", "publisher"),
    ("interviewMedium", "medium"),
    ("issuingAuthority", "authority"),
    ("journalAbbreviation", "container-title-short"),
    ("legalStatus", "status"),
    ("legislativeBody", "authority"),
    ("libraryCatalog", "source"),
    ("meetingName", "event"),
    ("nameOfAct", "title"),
    ("numPages", "number-of-pages"),
    ("numberOfVolumes", "number-of-volumes"),
    ("pages", "page"),
    ("place", "publisher-place"),
    ("priorityNumbers", "issue"),
    ("proceedingsTitle", "container-title"),
    ("programTitle", "container-title"),
    ("programmingLanguage", "genre"),
    ("publicationTitle", "container-title"),
    ("reportNumber", "number"),
    ("reportType", "genre"),
    ("reporter", "container-title"),
    ("runningTime", "dimensions"),
    ("series", "collection-title"),
    ("seriesNumber", "collection-number"),
    ("seriesTitle", "collection-title"),
    ("session", "chapter-number"),
    ("shortTitle", "title-short"),
    ("system", "medium"),
    ("thesisType", "genre"),
    ("type", "genre"),
    ("university", "publisher"),
    ("url", "URL"),
    ("versionNumber", "version"),
    ("websiteTitle", "container-title"),
    ("websiteType", "genre"),
];

/// Zotero creator roles with a different CSL name.
pub const ROLES: RenameTable = &[
    ("bookAuthor", "container-author"),
    ("seriesEditor", "collection-editor"),
    ("reviewedAuthor", "reviewed-author"),
];

/// Roles promoted to `author` when an item has no author, first match only.
pub const AUTHOR_LIKE: [&str; 10] = [
    "artist",
    "performer",
    "director",
    "podcaster",
    "cartographer",
    "programmer",
    "presenter",
    "interviewee",
    "sponsor",
    "inventor",
];

/// Bookkeeping names (and the abstract) never printed as plain fields.
const DENYLIST: [&str; 8] = [
    "abstract",
    "citekey",
    "zotkey",
    "etype",
    "year",
    "alastnm",
    "collection",
    ATTACHMENT_KEY,
];

/// Render one reference. `id` is the identifier as the document cites it.
///
/// `exclude` names fields (Zotero or CSL name) left out of the output.
pub fn render(entry: &Entry, id: &str, exclude: &[String]) -> String {
    let excluded = |name: &str| exclude.iter().any(|e| e == name);
    let mut record = Record::from_entry(entry).rename_kind(TYPES, None);

    // Zotero names first: fields, creator roles and the source date field.
    record.fields.retain(|name, _| !excluded(name.as_str()));
    if let Some((date_name, _)) = entry.date_field()
        && excluded(date_name)
    {
        record.fields.remove(DATE_KEY);
    }
    if !record.has_names("author")
        && let Some(role) = AUTHOR_LIKE.iter().find(|r| record.has_names(r))
    {
        record.rename(role, "author");
    }
    let mut record = record.rename_fields(ROLES).rename_fields(FIELDS);
    record.fields.retain(|name, _| !excluded(name.as_str()));

    let mut out = String::new();
    let _ = writeln!(out, "  - type: \"{}\"", yaml_escape(&record.kind));
    let _ = writeln!(out, "    id: \"{}\"", yaml_escape(id));

    for (role, names) in record.name_fields() {
        let _ = writeln!(out, "    {}:", role);
        for name in names {
            let _ = writeln!(out, "      - family: \"{}\"", yaml_escape(&name.last_name));
            let _ = writeln!(out, "        given: \"{}\"", yaml_escape(&name.first_name));
        }
    }

    for (name, value) in &record.fields {
        match value {
            FieldValue::Date(date) => {
                let parts = DateParts::parse(date);
                if !parts.has_year() {
                    continue;
                }
                let _ = writeln!(out, "    {}:", name);
                let _ = writeln!(out, "      - year: \"{}\"", yaml_escape(&entry.year));
                if let Some(month) = parts.month {
                    let _ = writeln!(out, "        month: \"{}\"", yaml_escape(month));
                }
                if let Some(day) = parts.day {
                    let _ = writeln!(out, "        day: \"{}\"", yaml_escape(day));
                }
            }
            FieldValue::Text(text) => {
                if DENYLIST.contains(&name.as_str()) {
                    continue;
                }
                let _ = writeln!(out, "    {}: \"{}\"", name, yaml_escape(text));
            }
            FieldValue::Names(_) | FieldValue::List(_) => {}
        }
    }
    out
}

/// The `references:` block for a list of rendered references, or `""`.
pub fn references_block(refs: &[String]) -> String {
    if refs.is_empty() {
        return String::new();
    }
    let mut out = String::from("references:\n");
    for r in refs {
        out.push_str(r);
    }
    out
}

/// Wrap a `references:` block in a minimal Markdown document so Pandoc can
/// read it back. Empty input stays empty.
pub fn yaml_document(references: &str) -> String {
    if references.is_empty() {
        return String::new();
    }
    format!("---\n{}...\n\ndummy text\n", references)
}

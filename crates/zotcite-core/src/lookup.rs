//! Six-tier ranked search over citation key, authors and title.

use crate::entry::Entry;

/// Match tier, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    KeyPrefix,
    AuthorPrefix,
    TitlePrefix,
    KeyContains,
    AuthorContains,
    TitleContains,
}

/// The tier an entry falls in for `pattern` (already lower case), if any.
/// Conditions are checked in tier order; the first that holds wins.
pub fn classify(entry: &Entry, pattern: &str) -> Option<Tier> {
    let key = entry.citekey.to_lowercase();
    let authors = entry.primary_authors.to_lowercase();
    let title = entry.title().to_lowercase();

    let key_pos = key.find(pattern);
    let author_pos = authors.find(pattern);
    let title_pos = title.find(pattern);

    match (key_pos, author_pos, title_pos) {
        (Some(0), _, _) => Some(Tier::KeyPrefix),
        (_, Some(0), _) => Some(Tier::AuthorPrefix),
        (_, _, Some(0)) => Some(Tier::TitlePrefix),
        (Some(_), _, _) => Some(Tier::KeyContains),
        (_, Some(_), _) => Some(Tier::AuthorContains),
        (_, _, Some(_)) => Some(Tier::TitleContains),
        _ => None,
    }
}

/// Matching entries, grouped by tier; within a tier, input order is kept.
pub fn rank<'a>(entries: impl IntoIterator<Item = &'a Entry>, pattern: &str) -> Vec<&'a Entry> {
    let pattern = pattern.to_lowercase();
    let mut hits: Vec<(Tier, &Entry)> = entries
        .into_iter()
        .filter_map(|e| classify(e, &pattern).map(|t| (t, e)))
        .collect();
    // Stable: ties keep input order.
    hits.sort_by_key(|(tier, _)| *tier);
    hits.into_iter().map(|(_, e)| e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citekey::CiteKeyEngine;
    use zotcite_zotero::RawItem;

    fn entry(id: i64, citekey: &str, authors: &str, title: &str) -> Entry {
        let raw = RawItem {
            item_id: id,
            key: format!("KEY{id}"),
            item_type: "book".to_string(),
            fields: [("title".to_string(), title.to_string())].into(),
            primary_authors: authors.to_string(),
            ..Default::default()
        };
        let mut e = Entry::from_raw(raw, &CiteKeyEngine::default());
        e.citekey = citekey.to_string();
        e
    }

    fn keys(found: &[&Entry]) -> Vec<String> {
        found.iter().map(|e| e.citekey.clone()).collect()
    }

    #[test]
    fn test_key_prefix_beats_title_prefix() {
        let entries = vec![
            entry(1, "jones2020", "Jones", "Smithsonian tales"),
            entry(2, "smith2020", "Smith", "Zoology"),
        ];
        let found = rank(&entries, "smith");
        assert_eq!(keys(&found), ["smith2020", "jones2020"]);
        assert_eq!(classify(&entries[0], "smith"), Some(Tier::TitlePrefix));
    }

    #[test]
    fn test_all_six_tiers() {
        let entries = vec![
            entry(1, "zz", "Zz", "the abc title"),   // title contains
            entry(2, "zz", "Zz, Abc", "zz"),         // author contains
            entry(3, "zzabc", "Zz", "zz"),           // key contains
            entry(4, "zz", "Zz", "abc zz"),          // title prefix
            entry(5, "zz", "Abcott", "zz"),          // author prefix
            entry(6, "abc2001", "Zz", "zz"),         // key prefix
            entry(7, "zz", "Zz", "zz"),              // no match
        ];
        let found = rank(&entries, "ABC");
        let ids: Vec<i64> = found.iter().map(|e| e.item_id).collect();
        assert_eq!(ids, [6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let entries = vec![
            entry(3, "smith_c", "", ""),
            entry(1, "smith_a", "", ""),
            entry(2, "smith_b", "", ""),
        ];
        assert_eq!(keys(&rank(&entries, "smith")), ["smith_c", "smith_a", "smith_b"]);
    }

    #[test]
    fn test_first_matching_tier_wins() {
        // Matches key-prefix and title-prefix; counted once, as key-prefix.
        let entries = vec![entry(1, "data2020", "", "Data science")];
        assert_eq!(classify(&entries[0], "data"), Some(Tier::KeyPrefix));
        assert_eq!(rank(&entries, "data").len(), 1);
    }

    #[test]
    fn test_no_match() {
        let entries = vec![entry(1, "a", "b", "c")];
        assert!(rank(&entries, "xyz").is_empty());
    }
}

//! The loaded library and the operations callers use.
//!
//! A [`Library`] owns one snapshot of the database (entries, key index,
//! collections) plus the source modification time it was built from. Every
//! public operation first calls [`Library::ensure_fresh`], which rebuilds the
//! snapshot when the source file has changed. A rebuild replaces the snapshot
//! only once it has fully succeeded; on error the previous one stays.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use zotcite_zotero::{
    AttachmentRef, ZoteroDatabase, ensure_writable_dir, mirror_database, modified_time,
};

use crate::citekey::CiteKeyEngine;
use crate::config::Settings;
use crate::entry::Entry;
use crate::{CoreError, LookupError, bibtex, csl, lookup, notes};

/// Result of [`Library::get_attachment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Found(Vec<AttachmentRef>),
    /// The entry exists but has no attachment.
    NoAttachment,
    /// No entry has this key.
    NoEntry,
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Found(list) => {
                let lines: Vec<String> =
                    list.iter().map(|a| format!("{}:{}", a.key, a.path)).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Attachment::NoAttachment => write!(f, "nOaTtAChMeNt"),
            Attachment::NoEntry => write!(f, "nOcItEkEy"),
        }
    }
}

/// Result of [`Library::get_ref_data`].
#[derive(Debug, Clone)]
pub enum RefData {
    Found(Box<Entry>),
    NotFound,
}

impl fmt::Display for RefData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefData::Found(entry) => match serde_json::to_string(entry) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => Err(fmt::Error),
            },
            RefData::NotFound => write!(f, "NoCiteKey"),
        }
    }
}

/// Summary returned by [`Library::info`].
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub database: PathBuf,
    pub tmpdir: PathBuf,
    pub references: usize,
    pub documents: BTreeMap<String, Vec<String>>,
    pub template: String,
    pub banned_words: Vec<String>,
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Ascending item id.
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    /// Collection name to indices into `entries`.
    collections: BTreeMap<String, Vec<usize>>,
}

impl Snapshot {
    fn entry(&self, key: &str) -> Option<&Entry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }
}

pub struct Library {
    settings: Settings,
    engine: CiteKeyEngine,
    source: PathBuf,
    tmpdir: PathBuf,
    snapshot: Snapshot,
    loaded_mtime: SystemTime,
    /// Document name to the collections that restrict its lookups.
    documents: HashMap<String, Vec<String>>,
}

impl Library {
    /// Locate the database, prepare the private directory and load.
    pub fn open(settings: Settings) -> Result<Self, CoreError> {
        let source = settings.database_path()?;
        let tmpdir = settings.tmpdir_path();
        ensure_writable_dir(&tmpdir)?;
        let engine = CiteKeyEngine::new(&settings.template, &settings.banned_words);

        let mut library = Self {
            settings,
            engine,
            source,
            tmpdir,
            snapshot: Snapshot::default(),
            loaded_mtime: SystemTime::UNIX_EPOCH,
            documents: HashMap::new(),
        };
        library.reload()?;
        Ok(library)
    }

    /// Reload if the source changed since the last load. Returns whether a
    /// reload happened.
    pub fn ensure_fresh(&mut self) -> Result<bool, CoreError> {
        if modified_time(&self.source)? > self.loaded_mtime {
            self.reload()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn reload(&mut self) -> Result<(), CoreError> {
        let mtime = modified_time(&self.source)?;
        let mirror = mirror_database(&self.source, &self.tmpdir)?;
        let loaded = ZoteroDatabase::open(&mirror)?.load()?;

        let entries: Vec<Entry> = loaded
            .items
            .into_iter()
            .map(|raw| Entry::from_raw(raw, &self.engine))
            .collect();
        let by_key: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key.clone(), i))
            .collect();
        let by_id: HashMap<i64, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.item_id, i))
            .collect();
        let collections: BTreeMap<String, Vec<usize>> = loaded
            .collections
            .into_iter()
            .map(|(name, ids)| {
                let indices: Vec<usize> =
                    ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
                (name, indices)
            })
            .collect();

        tracing::info!(
            database = %self.source.display(),
            entries = entries.len(),
            "loaded Zotero library"
        );
        self.snapshot = Snapshot {
            entries,
            by_key,
            collections,
        };
        self.loaded_mtime = mtime;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database_path(&self) -> &Path {
        &self.source
    }

    /// Entries in load order.
    pub fn entries(&mut self) -> Result<&[Entry], CoreError> {
        self.ensure_fresh()?;
        Ok(&self.snapshot.entries)
    }

    /// Collection names, sorted.
    pub fn collections(&mut self) -> Result<Vec<&str>, CoreError> {
        self.ensure_fresh()?;
        Ok(self.snapshot.collections.keys().map(String::as_str).collect())
    }

    /// Restrict lookups for `document` to `collections`; an empty list (or
    /// only empty names) lifts the restriction. Nothing is registered when a
    /// name is unknown.
    pub fn set_collections(
        &mut self,
        document: &str,
        collections: &[String],
    ) -> Result<(), CoreError> {
        self.ensure_fresh()?;
        let names: Vec<String> = collections
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect();
        if let Some(missing) = names
            .iter()
            .find(|c| !self.snapshot.collections.contains_key(*c))
        {
            return Err(LookupError::CollectionNotFound(missing.clone()).into());
        }
        self.documents.insert(document.to_string(), names);
        Ok(())
    }

    /// Entries matching `pattern`, best first, within the collections
    /// registered for `document` (all entries when none are).
    pub fn find(&mut self, pattern: &str, document: &str) -> Result<Vec<&Entry>, CoreError> {
        self.ensure_fresh()?;
        let names = self.documents.get(document).cloned().unwrap_or_default();

        if names.is_empty() {
            return Ok(lookup::rank(&self.snapshot.entries, pattern));
        }
        let mut allowed = HashSet::new();
        for name in &names {
            let members = self
                .snapshot
                .collections
                .get(name)
                .ok_or_else(|| LookupError::CollectionNotFound(name.clone()))?;
            allowed.extend(members.iter().copied());
        }
        let candidates = self
            .snapshot
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| allowed.contains(i))
            .map(|(_, e)| e);
        Ok(lookup::rank(candidates, pattern))
    }

    /// Completion lines (`KEY#citekey<TAB>authors<TAB>(year) title`).
    pub fn get_match(&mut self, pattern: &str, document: &str) -> Result<Vec<String>, CoreError> {
        Ok(self
            .find(pattern, document)?
            .into_iter()
            .map(Entry::completion_line)
            .collect())
    }

    /// `references:` block for the cited ids (`KEY` or `KEY#citekey`), in
    /// load order. Empty when nothing matches.
    pub fn get_yaml_refs(&mut self, ids: &[String]) -> Result<String, CoreError> {
        self.ensure_fresh()?;
        let refs: Vec<String> = self
            .cited(ids)
            .map(|(entry, id)| csl::render(entry, id, &self.settings.exclude))
            .collect();
        Ok(csl::references_block(&refs))
    }

    /// External key to BibTeX record for the cited ids.
    pub fn get_bib(&mut self, ids: &[String]) -> Result<BTreeMap<String, String>, CoreError> {
        self.ensure_fresh()?;
        Ok(self
            .cited(ids)
            .map(|(entry, id)| (entry.key.clone(), bibtex::render(entry, id)))
            .collect())
    }

    pub fn get_attachment(&mut self, key: &str) -> Result<Attachment, CoreError> {
        self.ensure_fresh()?;
        Ok(match self.snapshot.entry(key) {
            None => Attachment::NoEntry,
            Some(e) if e.attachments.is_empty() => Attachment::NoAttachment,
            Some(e) => Attachment::Found(e.attachments.clone()),
        })
    }

    pub fn get_ref_data(&mut self, key: &str) -> Result<RefData, CoreError> {
        self.ensure_fresh()?;
        Ok(match self.snapshot.entry(key) {
            Some(e) => RefData::Found(Box::new(e.clone())),
            None => RefData::NotFound,
        })
    }

    /// Every child note of `key` as Markdown; `None` for an unknown key.
    pub fn get_notes(&mut self, key: &str) -> Result<Option<Vec<String>>, CoreError> {
        self.ensure_fresh()?;
        let Some(entry) = self.snapshot.entry(key) else {
            return Ok(None);
        };
        let snapshot = &self.snapshot;
        let citekey = |k: &str| snapshot.entry(k).map(|e| e.citekey.clone());
        Ok(Some(
            entry
                .notes
                .iter()
                .map(|html| notes::note_to_markdown(html, citekey, &self.settings.year_page_sep))
                .collect(),
        ))
    }

    pub fn info(&mut self) -> Result<Info, CoreError> {
        self.ensure_fresh()?;
        Ok(Info {
            database: self.source.clone(),
            tmpdir: self.tmpdir.clone(),
            references: self.snapshot.entries.len(),
            documents: self
                .documents
                .iter()
                .map(|(d, c)| (d.clone(), c.clone()))
                .collect(),
            template: self.settings.template.clone(),
            banned_words: self.settings.banned_words.clone(),
        })
    }

    /// Entries cited by `ids`, paired with the id as cited, in load order.
    fn cited<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = (&'a Entry, &'a str)> + 'a {
        self.snapshot.entries.iter().flat_map(move |entry| {
            ids.iter()
                .filter(move |id| id.split('#').next() == Some(entry.key.as_str()))
                .map(move |id| (entry, id.as_str()))
        })
    }
}

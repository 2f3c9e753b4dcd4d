//! Resolved settings: defaults, then the TOML cascade, then the environment.

use std::path::{Path, PathBuf};

use crate::CoreError;
use crate::citekey::{DEFAULT_BANNED_WORDS, DEFAULT_TEMPLATE};
use crate::config_file::ConfigFile;

pub const ENV_SQLITE_PATH: &str = "ZoteroSQLpath";
pub const ENV_TEMPLATE: &str = "ZCitationTemplate";
pub const ENV_BANNED_WORDS: &str = "ZBannedWords";
pub const ENV_YEAR_PAGE_SEP: &str = "ZYearPageSep";
pub const ENV_TMPDIR: &str = "Zotcite_tmpdir";
pub const ENV_EXCLUDE: &str = "ZExclude";

pub const DEFAULT_YEAR_PAGE_SEP: &str = ", p. ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Explicit database path; discovered when `None`.
    pub sqlite_path: Option<PathBuf>,
    /// Explicit private directory; discovered when `None`.
    pub tmpdir: Option<PathBuf>,
    pub template: String,
    pub banned_words: Vec<String>,
    pub year_page_sep: String,
    /// Extra fields left out of the structured rendering.
    pub exclude: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            tmpdir: None,
            template: DEFAULT_TEMPLATE.to_string(),
            banned_words: split_words(DEFAULT_BANNED_WORDS),
            year_page_sep: DEFAULT_YEAR_PAGE_SEP.to_string(),
            exclude: Vec::new(),
        }
    }
}

impl Settings {
    /// Settings from the config files and the process environment.
    pub fn from_env() -> Self {
        Self::resolve(&crate::config_file::load_config(), |name| {
            std::env::var(name).ok()
        })
    }

    /// Layer `file` and then `env` over the defaults.
    pub fn resolve(file: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(zotero) = &file.zotero {
            if let Some(p) = &zotero.sqlite_path {
                settings.sqlite_path = Some(expand_home(p));
            }
            if let Some(t) = &zotero.tmpdir {
                settings.tmpdir = Some(expand_home(t));
            }
        }
        if let Some(citekeys) = &file.citekeys {
            if let Some(t) = &citekeys.template {
                settings.template = t.clone();
            }
            if let Some(b) = &citekeys.banned_words {
                settings.banned_words = split_words(b);
            }
        }
        if let Some(output) = &file.output {
            if let Some(s) = &output.year_page_sep {
                settings.year_page_sep = s.clone();
            }
            if let Some(e) = &output.exclude {
                settings.exclude = e.clone();
            }
        }

        if let Some(p) = env(ENV_SQLITE_PATH) {
            settings.sqlite_path = Some(expand_home(&p));
        }
        if let Some(t) = env(ENV_TMPDIR) {
            settings.tmpdir = Some(expand_home(&t));
        }
        if let Some(t) = env(ENV_TEMPLATE) {
            settings.template = t;
        }
        if let Some(b) = env(ENV_BANNED_WORDS) {
            settings.banned_words = split_words(&b);
        }
        if let Some(s) = env(ENV_YEAR_PAGE_SEP) {
            settings.year_page_sep = s;
        }
        if let Some(e) = env(ENV_EXCLUDE) {
            settings.exclude = split_words(&e.replace(',', " "));
        }

        settings
    }

    /// Path of `zotero.sqlite`: the configured one, or the first that exists
    /// among `~/Zotero/zotero.sqlite` and `%USERPROFILE%/Zotero/zotero.sqlite`.
    pub fn database_path(&self) -> Result<PathBuf, CoreError> {
        if let Some(path) = &self.sqlite_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(CoreError::Config(format!(
                "Please, check if ${} is correct: \"{}\" not found.",
                ENV_SQLITE_PATH,
                path.display()
            )));
        }

        let candidates = [
            dirs::home_dir(),
            std::env::var_os("USERPROFILE").map(PathBuf::from),
        ];
        candidates
            .into_iter()
            .flatten()
            .map(|home| home.join("Zotero").join("zotero.sqlite"))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "The file zotero.sqlite was not found. Please, define the environment variable {}.",
                    ENV_SQLITE_PATH
                ))
            })
    }

    /// Private directory for the mirror: the configured one, or the first
    /// existing parent among `$XDG_CACHE_HOME`, `%APPDATA%`, `~/.cache`,
    /// then `~/Library/Caches`, with `/tmp/.zotcite` as the last resort.
    pub fn tmpdir_path(&self) -> PathBuf {
        match &self.tmpdir {
            Some(dir) => dir.clone(),
            None => default_tmpdir(|name| std::env::var(name).ok(), dirs::home_dir()),
        }
    }
}

/// The unconfigured private directory, with the environment and home
/// directory passed in.
pub(crate) fn default_tmpdir(
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> PathBuf {
    let from_env = ["XDG_CACHE_HOME", "APPDATA"]
        .into_iter()
        .filter_map(|name| env(name).map(PathBuf::from))
        .find(|dir| dir.is_dir());
    if let Some(dir) = from_env {
        return dir.join("zotcite");
    }
    if let Some(home) = home {
        let cache = home.join(".cache");
        if cache.is_dir() {
            return cache.join("zotcite");
        }
        let library = home.join("Library");
        if library.is_dir() {
            return library.join("Caches").join("zotcite");
        }
    }
    PathBuf::from("/tmp/.zotcite")
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Expand a leading `~/`.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    Path::new(path).to_path_buf()
}

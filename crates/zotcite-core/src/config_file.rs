use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub zotero: Option<ZoteroConfig>,
    pub citekeys: Option<CiteKeysConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoteroConfig {
    pub sqlite_path: Option<String>,
    pub tmpdir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CiteKeysConfig {
    pub template: Option<String>,
    /// Space-separated, like `ZBannedWords`.
    pub banned_words: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub year_page_sep: Option<String>,
    pub exclude: Option<Vec<String>>,
}

/// Platform config directory path: `<config_dir>/zotcite/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("zotcite").join("config.toml"))
}

/// Load config by cascading CWD `.zotcite.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".zotcite.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed; parse errors are logged with their position.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed config file: {}", e);
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        zotero: Some(ZoteroConfig {
            sqlite_path: overlay
                .zotero
                .as_ref()
                .and_then(|z| z.sqlite_path.clone())
                .or_else(|| base.zotero.as_ref().and_then(|z| z.sqlite_path.clone())),
            tmpdir: overlay
                .zotero
                .as_ref()
                .and_then(|z| z.tmpdir.clone())
                .or_else(|| base.zotero.as_ref().and_then(|z| z.tmpdir.clone())),
        }),
        citekeys: Some(CiteKeysConfig {
            template: overlay
                .citekeys
                .as_ref()
                .and_then(|c| c.template.clone())
                .or_else(|| base.citekeys.as_ref().and_then(|c| c.template.clone())),
            banned_words: overlay
                .citekeys
                .as_ref()
                .and_then(|c| c.banned_words.clone())
                .or_else(|| base.citekeys.as_ref().and_then(|c| c.banned_words.clone())),
        }),
        output: Some(OutputConfig {
            year_page_sep: overlay
                .output
                .as_ref()
                .and_then(|o| o.year_page_sep.clone())
                .or_else(|| base.output.as_ref().and_then(|o| o.year_page_sep.clone())),
            exclude: overlay
                .output
                .as_ref()
                .and_then(|o| o.exclude.clone())
                .or_else(|| base.output.as_ref().and_then(|o| o.exclude.clone())),
        }),
    }
}

//! Private copy of `zotero.sqlite`, refreshed by modification time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::ZoteroError;

/// File name of the mirror inside the private directory.
pub const MIRROR_FILE_NAME: &str = "copy_of_zotero.sqlite";

/// Modification time of `path`.
pub fn modified_time(path: &Path) -> Result<SystemTime, ZoteroError> {
    Ok(std::fs::metadata(path)?.modified()?)
}

/// Create `dir` if needed and check that files can be created in it.
pub fn ensure_writable_dir(dir: &Path) -> Result<(), ZoteroError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ZoteroError::Config(format!("cannot create \"{}\": {}", dir.display(), e))
    })?;
    tempfile::NamedTempFile::new_in(dir).map_err(|_| {
        ZoteroError::Config(format!(
            "Please, either set or fix the value of $Zotcite_tmpdir: \"{}\" is not writable.",
            dir.display()
        ))
    })?;
    Ok(())
}

/// Copy `source` to `<dest_dir>/copy_of_zotero.sqlite` unless the mirror is
/// already at least as new as the source. Returns the mirror path.
///
/// The copy reads the whole source into memory and writes it in one call.
pub fn mirror_database(source: &Path, dest_dir: &Path) -> Result<PathBuf, ZoteroError> {
    ensure_writable_dir(dest_dir)?;

    let source_mtime = modified_time(source).map_err(|e| match e {
        ZoteroError::Io(io) if io.kind() == ErrorKind::NotFound => ZoteroError::Config(format!(
            "The file {} was not found. Please, define the environment variable ZoteroSQLpath.",
            source.display()
        )),
        other => other,
    })?;

    let mirror = dest_dir.join(MIRROR_FILE_NAME);
    let mirror_mtime = if mirror.exists() {
        Some(modified_time(&mirror)?)
    } else {
        None
    };

    if mirror_mtime.is_none_or(|m| source_mtime > m) {
        let bytes = std::fs::read(source)?;
        std::fs::write(&mirror, &bytes)?;
        tracing::debug!(
            source = %source.display(),
            mirror = %mirror.display(),
            bytes = bytes.len(),
            "refreshed database mirror"
        );
    }

    Ok(mirror)
}

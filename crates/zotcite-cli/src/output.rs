use std::io::Write;

use owo_colors::OwoColorize;
use zotcite_core::Info;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the `info` summary.
pub fn print_info(w: &mut dyn Write, info: &Info, color: ColorMode) -> std::io::Result<()> {
    let rows = [
        ("zotero.sqlite", info.database.display().to_string()),
        ("tmpdir", info.tmpdir.display().to_string()),
        ("references found", info.references.to_string()),
        ("citation template", info.template.clone()),
        ("banned words", info.banned_words.join(" ")),
    ];
    for (label, value) in rows {
        if color.enabled() {
            writeln!(w, "{} {}", format!("{}:", label).bold(), value.cyan())?;
        } else {
            writeln!(w, "{}: {}", label, value)?;
        }
    }

    if info.documents.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Documents:".bold())?;
    } else {
        writeln!(w, "Documents:")?;
    }
    for (doc, collections) in &info.documents {
        let list = if collections.is_empty() {
            "(all collections)".to_string()
        } else {
            collections.join(", ")
        };
        if color.enabled() {
            writeln!(w, "  {} {}", doc, list.dimmed())?;
        } else {
            writeln!(w, "  {} {}", doc, list)?;
        }
    }
    Ok(())
}

/// Print the collection names, one per line.
pub fn print_collections(
    w: &mut dyn Write,
    collections: &[&str],
    color: ColorMode,
) -> std::io::Result<()> {
    if collections.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Collections:".bold())?;
    } else {
        writeln!(w, "Collections:")?;
    }
    for name in collections {
        writeln!(w, "  {}", name)?;
    }
    Ok(())
}

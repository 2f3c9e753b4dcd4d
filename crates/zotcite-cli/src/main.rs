use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use zotcite_core::annotations::{JsonAnnotations, PageNumbering, format_annotations};
use zotcite_core::document::{citation_ids_from_json, header_collections, scan_markdown};
use zotcite_core::{Library, RefData, Settings, csl};

mod output;

use output::ColorMode;

/// Environment variable holding the log filter (e.g. `debug`, `zotcite_core=trace`).
const LOG_ENV: &str = "ZOTCITE_LOG";

/// Zotero citations for Markdown documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to zotero.sqlite (overrides $ZoteroSQLpath)
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,

    /// Directory for the private copy of the database (overrides $Zotcite_tmpdir)
    #[arg(long, global = true)]
    tmpdir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List references matching PATTERN, best matches first
    Match {
        pattern: String,

        /// Only search this collection (repeatable)
        #[arg(long = "collection")]
        collections: Vec<String>,

        /// Markdown document whose YAML header names its collections
        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// Print CSL-YAML references for the cited keys
    YamlRefs {
        /// Keys as cited: KEY or KEY#citekey
        #[arg(required = true)]
        keys: Vec<String>,

        /// Wrap the references in a minimal Markdown document
        #[arg(long)]
        document: bool,
    },

    /// Print BibTeX records for the cited keys
    Bib {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print the attachments of an entry as KEY:path lines
    Attachment { key: String },

    /// Print everything known about an entry as JSON
    Refdata { key: String },

    /// Print the child notes of an entry as Markdown
    Notes { key: String },

    /// Render PDF annotations (exported as JSON) as Markdown with citations
    Annotations {
        /// Zotero key of the entry the PDF belongs to
        key: String,

        /// JSON file listing the annotations
        file: PathBuf,

        /// Printed number of the first page, or the article's page range (101-120)
        #[arg(long, default_value = "1")]
        page: String,
    },

    /// List the keys cited in a Pandoc JSON or Markdown document
    CiteIds {
        /// Document to read (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Show configuration and library statistics
    Info,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.no_color);

    let color = ColorMode(!cli.no_color && std::env::var_os("NO_COLOR").is_none());
    let mut out = std::io::stdout().lock();

    // Works on documents only; no database needed.
    if let Command::CiteIds { file } = &cli.command {
        return cite_ids(&mut out, file.as_deref());
    }

    let mut settings = Settings::from_env();
    if let Some(path) = cli.sqlite {
        settings.sqlite_path = Some(path);
    }
    if let Some(dir) = cli.tmpdir {
        settings.tmpdir = Some(dir);
    }
    let mut library = Library::open(settings)?;

    match cli.command {
        Command::Match {
            pattern,
            collections,
            document,
        } => {
            let doc_name = match &document {
                Some(path) => path.display().to_string(),
                None => String::new(),
            };
            let mut names = collections;
            if let Some(path) = &document {
                let text = std::fs::read_to_string(path)?;
                names.extend(header_collections(&text));
            }
            library.set_collections(&doc_name, &names)?;
            for line in library.get_match(&pattern, &doc_name)? {
                writeln!(out, "{}", line)?;
            }
        }
        Command::YamlRefs { keys, document } => {
            let refs = library.get_yaml_refs(&keys)?;
            if document {
                write!(out, "{}", csl::yaml_document(&refs))?;
            } else {
                write!(out, "{}", refs)?;
            }
        }
        Command::Bib { keys } => {
            let records = library.get_bib(&keys)?;
            let joined: Vec<String> = records.into_values().collect();
            write!(out, "{}", joined.join("\n"))?;
        }
        Command::Attachment { key } => {
            writeln!(out, "{}", library.get_attachment(&key)?)?;
        }
        Command::Refdata { key } => match library.get_ref_data(&key)? {
            RefData::Found(entry) => {
                writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?;
            }
            not_found => writeln!(out, "{}", not_found)?,
        },
        Command::Notes { key } => {
            let Some(notes) = library.get_notes(&key)? else {
                anyhow::bail!("No Zotero entry with key {}", key);
            };
            if notes.is_empty() {
                tracing::warn!(key = %key, "entry has no notes");
            }
            writeln!(out, "{}", notes.join("\n\n"))?;
        }
        Command::Annotations { key, file, page } => {
            let RefData::Found(entry) = library.get_ref_data(&key)? else {
                anyhow::bail!("No Zotero entry with key {}", key);
            };
            let source = JsonAnnotations::from_json(&std::fs::read_to_string(&file)?)?;
            let text = format_annotations(
                &source,
                &entry.citekey,
                &library.settings().year_page_sep,
                PageNumbering::parse(&page),
            )?;
            if text.is_empty() {
                tracing::warn!(file = %file.display(), "no annotations found");
            }
            write!(out, "{}", text)?;
        }
        Command::Info => {
            let info = library.info()?;
            output::print_info(&mut out, &info, color)?;
            let collections = library.collections()?;
            output::print_collections(&mut out, &collections, color)?;
        }
        Command::CiteIds { .. } => unreachable!("handled before the library is opened"),
    }
    Ok(())
}

fn init_tracing(no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

/// Print the keys cited in `file` (or stdin): Pandoc JSON when it parses as
/// JSON, Markdown otherwise.
fn cite_ids(out: &mut dyn Write, file: Option<&Path>) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let ids = if text.trim_start().starts_with('{') {
        citation_ids_from_json(&text)?
    } else {
        scan_markdown(&text)
    };
    for id in ids {
        writeln!(out, "{}", id)?;
    }
    Ok(())
}

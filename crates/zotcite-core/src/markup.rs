//! Escaping and rich-text conversion for field values.
//!
//! Zotero stores a handful of HTML-like tags inside titles (`<i>`, `<b>`,
//! `<sub>`, `<sup>`, small-caps and no-case spans). The YAML output turns
//! them into Pandoc Markdown, the BibTeX output into LaTeX commands.

use once_cell::sync::Lazy;
use regex::Regex;

static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<i>(.*?)</i>").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<b>(.*?)</b>").unwrap());
static SUB: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<sub>(.*?)</sub>").unwrap());
static SUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<sup>(.*?)</sup>").unwrap());
// Quotes may already be backslash-escaped when these run.
static SMALL_CAPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span style=\\?"font-variant:\s*small-caps;?\\?">(.*?)</span>"#).unwrap()
});
static NO_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<span class=\\?"nocase\\?">(.*?)</span>"#).unwrap());

static PAGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)-(\d)").unwrap());

/// Escape a value for a double-quoted YAML scalar and convert its markup.
///
/// Order matters: backslashes, then quotes, then newlines, then markup.
pub fn yaml_escape(value: &str) -> String {
    let s = value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace("\r\n", "\n")
        .replace('\n', r"\n");
    markup_to_markdown(&s)
}

/// `<i>x</i>` to `*x*`, `<b>` to `**`, `<sub>` to `~`, `<sup>` to `^`,
/// small caps to `[x]{.smallcaps}` and no-case to `[x]{.nocase}`.
pub fn markup_to_markdown(s: &str) -> String {
    let s = ITALIC.replace_all(s, "*$1*");
    let s = BOLD.replace_all(&s, "**$1**");
    let s = SUB.replace_all(&s, "~$1~");
    let s = SUP.replace_all(&s, "^$1^");
    let s = SMALL_CAPS.replace_all(&s, "[$1]{.smallcaps}");
    let s = NO_CASE.replace_all(&s, "[$1]{.nocase}");
    s.into_owned()
}

/// Escape LaTeX special characters, then convert markup to LaTeX commands.
pub fn latex_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '[' => out.push_str("{[}"),
            ']' => out.push_str("{]}"),
            _ => out.push(c),
        }
    }
    markup_to_latex(&out)
}

pub fn markup_to_latex(s: &str) -> String {
    let s = ITALIC.replace_all(s, r"\textit{$1}");
    let s = BOLD.replace_all(&s, r"\textbf{$1}");
    let s = SUB.replace_all(&s, r"\textsubscript{$1}");
    let s = SUP.replace_all(&s, r"\textsuperscript{$1}");
    let s = SMALL_CAPS.replace_all(&s, r"\textsc{$1}");
    let s = NO_CASE.replace_all(&s, "{$1}");
    s.into_owned()
}

/// `12-34` to `12--34`.
pub fn page_range_dashes(pages: &str) -> String {
    PAGE_RANGE.replace_all(pages, "$1--$2").into_owned()
}

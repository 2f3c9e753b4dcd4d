//! Zotero note HTML to Markdown.
//!
//! Notes written in Zotero's editor embed citations as
//! `<span class="citation" data-citation="%7B...%7D">(Doe, 2020)</span>`,
//! where the attribute is URL-encoded JSON listing the cited item URIs and
//! locators. Each such span becomes a Pandoc citation group
//! `[@KEY#citekey, p. 12; @KEY2#citekey2]`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

static CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span class="citation" data-citation="([^"]*)">.*?</span>"#).unwrap()
});
static HIGHLIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span class="highlight"[^>]*>(.*?)</span>"#).unwrap()
});
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h([1-6])[^>]*>(.*?)</h[1-6]>").unwrap());
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<a [^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static BLOCKQUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<blockquote[^>]*>(.*?)</blockquote>").unwrap());
static STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?(?:strong|b)>").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?(?:em|i)>").unwrap());
static SUB: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?sub>").unwrap());
static SUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?sup>").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<li[^>]*>").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").unwrap());
static BLOCK_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"</(?:p|div|ul|ol|li)>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationData {
    #[serde(default)]
    citation_items: Vec<CitationItem>,
}

#[derive(Debug, Deserialize)]
struct CitationItem {
    #[serde(default)]
    uris: Vec<String>,
    #[serde(default)]
    locator: Option<serde_json::Value>,
}

/// Convert one note to Markdown.
///
/// `citekey` maps an external key to its citation key; keys it does not
/// know are written as `@KEY`. `year_page_sep` goes between key and locator.
pub fn note_to_markdown(
    html: &str,
    citekey: impl Fn(&str) -> Option<String>,
    year_page_sep: &str,
) -> String {
    let s = CITATION.replace_all(html, |caps: &Captures| {
        render_citation(&caps[1], &citekey, year_page_sep)
    });
    let s = HIGHLIGHT.replace_all(&s, "$1");
    let s = HEADING.replace_all(&s, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
    });
    let s = LINK.replace_all(&s, "[$2]($1)");
    let s = BLOCKQUOTE.replace_all(&s, |caps: &Captures| {
        let inner = ANY_TAG.replace_all(&caps[1], "");
        let quoted: Vec<String> = inner
            .trim()
            .lines()
            .map(|l| format!("> {}", l.trim()))
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    });
    let s = STRONG.replace_all(&s, "**");
    let s = EMPHASIS.replace_all(&s, "*");
    let s = SUB.replace_all(&s, "~");
    let s = SUP.replace_all(&s, "^");
    let s = LIST_ITEM.replace_all(&s, "- ");
    let s = LINE_BREAK.replace_all(&s, "\n");
    let s = BLOCK_END.replace_all(&s, "\n\n");
    let s = ANY_TAG.replace_all(&s, "");
    let s = decode_entities(&s);
    let s = BLANK_LINES.replace_all(&s, "\n\n");
    s.trim().to_string()
}

fn render_citation(
    encoded: &str,
    citekey: &impl Fn(&str) -> Option<String>,
    year_page_sep: &str,
) -> String {
    let data: CitationData = match urlencoding::decode(encoded)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
    {
        Some(d) => d,
        None => {
            tracing::warn!("undecodable citation in note: {}", encoded);
            return String::new();
        }
    };

    let cites: Vec<String> = data
        .citation_items
        .iter()
        .filter_map(|item| {
            let uri = item.uris.first()?;
            let key = uri.rsplit('/').next()?;
            let mut cite = match citekey(key) {
                Some(ck) => format!("@{key}#{ck}"),
                None => format!("@{key}"),
            };
            match &item.locator {
                Some(serde_json::Value::String(loc)) if !loc.is_empty() => {
                    cite.push_str(year_page_sep);
                    cite.push_str(loc);
                }
                Some(serde_json::Value::Number(n)) => {
                    cite.push_str(year_page_sep);
                    cite.push_str(&n.to_string());
                }
                _ => {}
            }
            Some(cite)
        })
        .collect();

    if cites.is_empty() {
        String::new()
    } else {
        format!("[{}]", cites.join("; "))
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

//! Reading citation identifiers and header fields out of documents.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::CoreError;

static MARKDOWN_CITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Z0-9]{8})#([\w\-]+)").unwrap());

/// Called for every tagged node of a document tree.
pub trait NodeVisitor {
    fn visit(&mut self, tag: &str, node: &Value);
}

/// Depth-first walk over a Pandoc JSON tree. A node is any object with a
/// string `"t"`; its children are everything nested below it.
pub fn walk(value: &Value, visitor: &mut impl NodeVisitor) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(tag)) = map.get("t") {
                visitor.visit(tag, value);
            }
            for child in map.values() {
                walk(child, visitor);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, visitor);
            }
        }
        _ => {}
    }
}

/// Collects the `citationId` of every `Cite` node.
#[derive(Debug, Default)]
pub struct CitationCollector {
    pub ids: Vec<String>,
}

impl NodeVisitor for CitationCollector {
    fn visit(&mut self, tag: &str, node: &Value) {
        if tag != "Cite" {
            return;
        }
        let Some(citations) = node.pointer("/c/0").and_then(Value::as_array) else {
            return;
        };
        for citation in citations {
            if let Some(id) = citation.get("citationId").and_then(Value::as_str) {
                self.ids.push(id.to_string());
            }
        }
    }
}

/// External keys cited in a Pandoc JSON document: `#` suffixes dropped,
/// sorted, without duplicates.
pub fn citation_ids(doc: &Value) -> Vec<String> {
    let mut collector = CitationCollector::default();
    walk(doc, &mut collector);
    normalize(collector.ids.iter().map(String::as_str))
}

pub fn citation_ids_from_json(json: &str) -> Result<Vec<String>, CoreError> {
    let doc: Value = serde_json::from_str(json)?;
    Ok(citation_ids(&doc))
}

/// External keys of every `@KEY#citekey` written in Markdown source.
pub fn scan_markdown(text: &str) -> Vec<String> {
    normalize(MARKDOWN_CITE.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str()))
}

fn normalize<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    ids.map(|id| id.split('#').next().unwrap_or(id).to_string())
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The YAML header of a Markdown document (between the opening `---` and the
/// closing `---` or `...`), if it has one.
pub fn yaml_header(text: &str) -> Option<&str> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

/// One field of the document's YAML header. Missing headers, missing fields
/// and malformed YAML all give `None`; malformed YAML is logged with its
/// position.
pub fn yaml_header_field(text: &str, field: &str) -> Option<serde_yaml::Value> {
    let header = yaml_header(text)?;
    match serde_yaml::from_str::<serde_yaml::Value>(header) {
        Ok(value) => value.get(field).cloned(),
        Err(e) => {
            match e.location() {
                Some(loc) => tracing::warn!(
                    line = loc.line(),
                    column = loc.column(),
                    "malformed YAML header: {}",
                    e
                ),
                None => tracing::warn!("malformed YAML header: {}", e),
            }
            None
        }
    }
}

/// Collections named in the header's `collection` field, given either as a
/// single string or as a list.
pub fn header_collections(text: &str) -> Vec<String> {
    match yaml_header_field(text, "collection") {
        Some(serde_yaml::Value::String(s)) => vec![s],
        Some(serde_yaml::Value::Sequence(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_yaml::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

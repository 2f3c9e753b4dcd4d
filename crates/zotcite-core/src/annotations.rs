//! Formatting PDF annotations as Markdown quotes and comments.
//!
//! Reading annotations out of a PDF is left to an [`AnnotationSource`]
//! implementation; this module orders them the way they are read on the page
//! (page, then column, then top to bottom) and renders each with a citation
//! pointing back at its page.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::CoreError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Text, free-text or sticky note: the annotation's own content.
    Comment,
    /// Highlight or underline: the marked page text.
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Zero-based page index.
    pub page: usize,
    /// Left and top edges of the annotation rectangle.
    pub x: f64,
    pub y: f64,
    pub page_width: f64,
    pub text: String,
    /// Empty when the PDF does not record one.
    #[serde(default)]
    pub author: String,
}

/// Anything that can list the annotations of one PDF.
pub trait AnnotationSource {
    fn page_count(&self) -> usize;

    /// Printed label of a page (`"iv"`, `"12"`), if the PDF defines one.
    fn page_label(&self, _page: usize) -> Option<String> {
        None
    }

    fn annotations(&self) -> Result<Vec<Annotation>, CoreError>;
}

/// Annotations already extracted by an external tool and saved as JSON:
///
/// ```json
/// {"pages": 12, "labels": ["i", "ii"], "annotations": [
///   {"kind": "highlight", "page": 0, "x": 72.0, "y": 90.5,
///    "page_width": 612.0, "text": "marked text"}
/// ]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct JsonAnnotations {
    pages: usize,
    /// Printed labels by page index; `null` or missing entries have none.
    #[serde(default)]
    labels: Vec<Option<String>>,
    annotations: Vec<Annotation>,
}

impl JsonAnnotations {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AnnotationSource for JsonAnnotations {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_label(&self, page: usize) -> Option<String> {
        self.labels.get(page).cloned().flatten()
    }

    fn annotations(&self) -> Result<Vec<Annotation>, CoreError> {
        Ok(self.annotations.clone())
    }
}

/// How physical pages map to printed page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumbering {
    /// The first physical page is printed as this number; PDF page labels
    /// take precedence when present.
    Offset(i64),
    /// The article spans these printed pages.
    Range { first: i64, last: i64 },
}

impl Default for PageNumbering {
    fn default() -> Self {
        PageNumbering::Offset(1)
    }
}

impl PageNumbering {
    /// Parse `"5"` or `"101-120"`. Anything else falls back to page 1 with a
    /// warning.
    pub fn parse(arg: &str) -> Self {
        let arg = arg.trim();
        if let Some((first, last)) = arg.split_once('-') {
            if let (Ok(first), Ok(last)) = (first.trim().parse(), last.trim().parse()) {
                return PageNumbering::Range { first, last };
            }
        } else if let Ok(n) = arg.parse() {
            return PageNumbering::Offset(n);
        }
        tracing::warn!("'{}' is not a valid page number; using page 1", arg);
        PageNumbering::default()
    }

    /// Printed number of the first physical page.
    ///
    /// For a range, the last physical page lines up with `last` when the PDF
    /// has as many pages as the range or one fewer; otherwise numbering
    /// starts at 1.
    pub fn first_page(&self, page_count: usize) -> i64 {
        match *self {
            PageNumbering::Offset(n) => n,
            PageNumbering::Range { first, last } => {
                let printed = last - first + 1;
                let count = page_count as i64;
                if count <= printed && printed - count < 2 {
                    last - count + 1
                } else {
                    1
                }
            }
        }
    }

    fn uses_labels(&self) -> bool {
        matches!(self, PageNumbering::Offset(_))
    }
}

/// Join hyphenated line breaks, flatten newlines and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let joined = text.replace("-\n", "").replace('\n', " ");
    WHITESPACE.replace_all(joined.trim(), " ").into_owned()
}

/// Render every annotation of `source`, in reading order.
///
/// Comments read `text [annotation by AUTHOR on CITEKEY, p. N]`, highlights
/// `> text [CITEKEY, p. N]`. Returns an empty string when there is nothing
/// to render.
pub fn format_annotations(
    source: &dyn AnnotationSource,
    citekey: &str,
    year_page_sep: &str,
    numbering: PageNumbering,
) -> Result<String, CoreError> {
    let page1 = numbering.first_page(source.page_count());
    let page_name = |page: usize| -> String {
        if numbering.uses_labels()
            && let Some(label) = source.page_label(page)
            && !label.trim().is_empty()
        {
            return label;
        }
        (page as i64 + page1).to_string()
    };

    let mut notes: Vec<(usize, u8, f64, u8, String)> = Vec::new();
    for a in source.annotations()? {
        let column = if a.x < a.page_width / 2.0 { 1 } else { 2 };
        let page = page_name(a.page);
        match a.kind {
            AnnotationKind::Comment => {
                if a.text.is_empty() {
                    continue;
                }
                let mut line = format!("{} [annotation", a.text);
                if !a.author.is_empty() {
                    line.push_str(&format!(" by {}", a.author));
                }
                if !citekey.is_empty() {
                    line.push_str(&format!(" on {}", citekey));
                }
                line.push_str(&format!("{}{}]\n", year_page_sep, page));
                // Comments precede highlights at the same position.
                notes.push((a.page, column, a.y, 0, line));
            }
            AnnotationKind::Highlight => {
                let text = clean_text(&a.text);
                if text.is_empty() {
                    continue;
                }
                let line = format!("> {} [{}{}{}]\n", text, citekey, year_page_sep, page);
                notes.push((a.page, column, a.y, 1, line));
            }
        }
    }

    notes.sort_by(|a, b| {
        (a.0, a.1)
            .cmp(&(b.0, b.1))
            .then(a.2.total_cmp(&b.2))
            .then(a.3.cmp(&b.3))
    });
    Ok(notes.into_iter().map(|n| n.4).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePdf {
        pages: usize,
        labels: Vec<Option<&'static str>>,
        annotations: Vec<Annotation>,
    }

    impl AnnotationSource for FakePdf {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page_label(&self, page: usize) -> Option<String> {
            self.labels.get(page).copied().flatten().map(str::to_string)
        }

        fn annotations(&self) -> Result<Vec<Annotation>, CoreError> {
            Ok(self.annotations.clone())
        }
    }

    fn ann(kind: AnnotationKind, page: usize, x: f64, y: f64, text: &str) -> Annotation {
        Annotation {
            kind,
            page,
            x,
            y,
            page_width: 600.0,
            text: text.to_string(),
            author: String::new(),
        }
    }

    #[test]
    fn test_reading_order() {
        let pdf = FakePdf {
            pages: 2,
            labels: vec![],
            annotations: vec![
                ann(AnnotationKind::Highlight, 1, 10.0, 50.0, "page two"),
                ann(AnnotationKind::Highlight, 0, 400.0, 10.0, "right column"),
                ann(AnnotationKind::Highlight, 0, 10.0, 300.0, "left lower"),
                ann(AnnotationKind::Highlight, 0, 10.0, 100.0, "left upper"),
            ],
        };
        let out = format_annotations(&pdf, "Doe_2020", ", p. ", PageNumbering::default()).unwrap();
        assert_eq!(
            out,
            "> left upper [Doe_2020, p. 1]\n\
             > left lower [Doe_2020, p. 1]\n\
             > right column [Doe_2020, p. 1]\n\
             > page two [Doe_2020, p. 2]\n"
        );
    }

    #[test]
    fn test_comment_before_highlight_at_same_spot() {
        let mut comment = ann(AnnotationKind::Comment, 0, 10.0, 100.0, "Key point");
        comment.author = "Ana".to_string();
        let pdf = FakePdf {
            pages: 1,
            labels: vec![],
            annotations: vec![
                ann(AnnotationKind::Highlight, 0, 10.0, 100.0, "the claim"),
                comment,
            ],
        };
        let out = format_annotations(&pdf, "K", ", p. ", PageNumbering::Offset(5)).unwrap();
        assert_eq!(
            out,
            "Key point [annotation by Ana on K, p. 5]\n> the claim [K, p. 5]\n"
        );
    }

    #[test]
    fn test_labels_used_only_without_range() {
        let pdf = FakePdf {
            pages: 1,
            labels: vec![Some("iv")],
            annotations: vec![ann(AnnotationKind::Highlight, 0, 0.0, 0.0, "x")],
        };
        let out = format_annotations(&pdf, "K", ", p. ", PageNumbering::Offset(1)).unwrap();
        assert_eq!(out, "> x [K, p. iv]\n");
        let range = PageNumbering::Range { first: 10, last: 10 };
        let out = format_annotations(&pdf, "K", ", p. ", range).unwrap();
        assert_eq!(out, "> x [K, p. 10]\n");
    }

    #[test]
    fn test_page_numbering() {
        assert_eq!(PageNumbering::parse("12"), PageNumbering::Offset(12));
        assert_eq!(
            PageNumbering::parse("101-120"),
            PageNumbering::Range { first: 101, last: 120 }
        );
        assert_eq!(PageNumbering::parse("ABCD1234"), PageNumbering::Offset(1));

        let range = PageNumbering::Range { first: 101, last: 120 };
        // Exact fit and one missing page both align the last page.
        assert_eq!(range.first_page(20), 101);
        assert_eq!(range.first_page(19), 102);
        // Too far off: start at 1.
        assert_eq!(range.first_page(25), 1);
        assert_eq!(range.first_page(10), 1);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  hyphen-\nated\nline   breaks "), "hyphenated line breaks");
    }

    #[test]
    fn test_json_source() {
        let json = r#"{
            "pages": 2,
            "labels": [null, "12"],
            "annotations": [
                {"kind": "highlight", "page": 1, "x": 10.0, "y": 5.0,
                 "page_width": 600.0, "text": "second"},
                {"kind": "comment", "page": 0, "x": 10.0, "y": 5.0,
                 "page_width": 600.0, "text": "Note", "author": "Bo"}
            ]
        }"#;
        let source = JsonAnnotations::from_json(json).unwrap();
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_label(0), None);
        let out = format_annotations(&source, "K", ", p. ", PageNumbering::Offset(3)).unwrap();
        assert_eq!(out, "Note [annotation by Bo on K, p. 3]\n> second [K, p. 12]\n");

        let err = JsonAnnotations::from_json("{\"pages\": 1}").unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn test_empty_source() {
        let pdf = FakePdf {
            pages: 3,
            labels: vec![],
            annotations: vec![ann(AnnotationKind::Highlight, 0, 0.0, 0.0, " \n ")],
        };
        assert_eq!(format_annotations(&pdf, "K", ", p. ", PageNumbering::default()).unwrap(), "");
    }
}

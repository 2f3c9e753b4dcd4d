//! Citation-key templates: `{Authors}_{Year}`, `{author}{year}{title}`, ...
//!
//! A template is parsed once into literal text and placeholders. Each
//! placeholder is recognized at its first occurrence only (left to right);
//! substituted values are never re-scanned, so an author called `{year}` stays
//! an author.

use once_cell::sync::Lazy;
use regex::Regex;

use zotcite_zotero::Creator;

/// Default template when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{Authors}_{Year}";

/// Default leading title words ignored when picking the title word.
pub const DEFAULT_BANNED_WORDS: &str = "a an the some from on in to of do with";

/// Stand-in surname for entries without any creator.
const NO_AUTHOR: &str = "No_author";

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").unwrap());
static SINGLE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z] ").unwrap());

/// A recognized template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{author}`: first surname, lower case.
    Author,
    /// `{Author}`: first surname, title case.
    AuthorTitle,
    /// `{authors}`: surnames joined by `_`, lower case.
    Authors,
    /// `{Authors}`: surnames joined by `_`, title case.
    AuthorsTitle,
    /// `{year}`: two-digit year.
    Year,
    /// `{Year}`: four-digit year.
    YearFull,
    /// `{title}`: first significant title word, lower case.
    Title,
    /// `{Title}`: first significant title word, title case.
    TitleTitle,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::Author,
        Placeholder::AuthorTitle,
        Placeholder::Authors,
        Placeholder::AuthorsTitle,
        Placeholder::Year,
        Placeholder::YearFull,
        Placeholder::Title,
        Placeholder::TitleTitle,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Author => "{author}",
            Placeholder::AuthorTitle => "{Author}",
            Placeholder::Authors => "{authors}",
            Placeholder::AuthorsTitle => "{Authors}",
            Placeholder::Year => "{year}",
            Placeholder::YearFull => "{Year}",
            Placeholder::Title => "{title}",
            Placeholder::TitleTitle => "{Title}",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// Inputs of one key computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyInputs<'a> {
    /// The first creator group found (see `CREATOR_PRIORITY`), if any.
    pub creators: Option<&'a [Creator]>,
    pub year: &'a str,
    pub title: &'a str,
}

/// Parsed template plus the banned-word matcher.
#[derive(Debug, Clone)]
pub struct CiteKeyEngine {
    template: String,
    segments: Vec<Segment>,
    banned: Option<Regex>,
}

impl Default for CiteKeyEngine {
    fn default() -> Self {
        let banned: Vec<String> = DEFAULT_BANNED_WORDS
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self::new(DEFAULT_TEMPLATE, &banned)
    }
}

impl CiteKeyEngine {
    pub fn new(template: &str, banned_words: &[String]) -> Self {
        let banned = if banned_words.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = banned_words
                .iter()
                .map(|w| format!("{} ", regex::escape(&w.to_lowercase())))
                .collect();
            Regex::new(&format!("^(?:{})", alternatives.join("|"))).ok()
        };
        Self {
            template: template.to_string(),
            segments: parse_template(template),
            banned,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholders recognized in the template, in order.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Value(p) => Some(*p),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Compute a citation key. Pure: same inputs, same key.
    pub fn citekey(&self, inputs: &KeyInputs<'_>) -> String {
        let surnames: Vec<String> = match inputs.creators {
            Some(names) if !names.is_empty() => names
                .iter()
                .map(|c| strip_non_word(&c.last_name))
                .collect(),
            _ => vec![NO_AUTHOR.to_string()],
        };
        let author = surnames[0].clone();
        let authors = if surnames.len() > 2 {
            format!("{}_etal", surnames[0])
        } else {
            surnames.join("_")
        };
        let title = self.title_word(inputs.title);

        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Value(p) => match p {
                    Placeholder::Author => key.push_str(&author.to_lowercase()),
                    Placeholder::AuthorTitle => key.push_str(&title_case(&author)),
                    Placeholder::Authors => key.push_str(&authors.to_lowercase()),
                    Placeholder::AuthorsTitle => key.push_str(&title_case(&authors)),
                    Placeholder::Year => key.push_str(short_year(inputs.year)),
                    Placeholder::YearFull => key.push_str(inputs.year),
                    Placeholder::Title => key.push_str(&title.to_lowercase()),
                    Placeholder::TitleTitle => key.push_str(&title_case(&title)),
                },
            }
        }

        key.retain(|c| !c.is_whitespace() && c != '\'' && c != '\u{2019}');
        key
    }

    /// First significant word of a title, lower case, word characters only.
    ///
    /// One banned leading word and then one leading single letter are
    /// dropped; the word ends at the first space or `, ; : . ! ?`.
    pub fn title_word(&self, title: &str) -> String {
        let lower = title.to_lowercase();
        let rest = match &self.banned {
            Some(re) => re.replace(&lower, "").into_owned(),
            None => lower,
        };
        let rest = SINGLE_LETTER.replace(&rest, "");
        let word = rest
            .split([' ', ',', ';', ':', '.', '!', '?'])
            .next()
            .unwrap_or("");
        strip_non_word(word)
    }
}

fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut used: Vec<Placeholder> = Vec::new();
    let mut rest = template;

    loop {
        let next = Placeholder::ALL
            .iter()
            .filter(|p| !used.contains(p))
            .filter_map(|p| rest.find(p.token()).map(|idx| (idx, *p)))
            .min_by_key(|(idx, _)| *idx);

        let Some((idx, placeholder)) = next else {
            if !rest.is_empty() {
                segments.push(Segment::Literal(rest.to_string()));
            }
            break;
        };

        if idx > 0 {
            segments.push(Segment::Literal(rest[..idx].to_string()));
        }
        segments.push(Segment::Value(placeholder));
        used.push(placeholder);
        rest = &rest[idx + placeholder.token().len()..];
    }
    segments
}

fn strip_non_word(s: &str) -> String {
    NON_WORD.replace_all(s, "").into_owned()
}

/// Drop the century: `2020` becomes `20`.
fn short_year(year: &str) -> &str {
    let bytes = year.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit() {
        &year[2..]
    } else {
        year
    }
}

/// Capitalize the first letter of every run of letters, lower-case the rest
/// (`smith_o'brien` becomes `Smith_O'Brien`).
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(surnames: &[&str]) -> Vec<Creator> {
        surnames.iter().map(|s| Creator::new(*s, "Given")).collect()
    }

    fn engine(template: &str) -> CiteKeyEngine {
        let banned: Vec<String> = DEFAULT_BANNED_WORDS
            .split_whitespace()
            .map(str::to_string)
            .collect();
        CiteKeyEngine::new(template, &banned)
    }

    #[test]
    fn test_default_template() {
        let authors = names(&["Smith", "Jones"]);
        let key = CiteKeyEngine::default().citekey(&KeyInputs {
            creators: Some(&authors),
            year: "2020",
            title: "Anything",
        });
        assert_eq!(key, "Smith_Jones_2020");
    }

    #[test]
    fn test_four_authors_collapse_to_etal() {
        let authors = names(&["A", "B", "C", "D"]);
        let key = engine("{Authors}").citekey(&KeyInputs {
            creators: Some(&authors),
            ..Default::default()
        });
        assert_eq!(key, "A_etal");
    }

    #[test]
    fn test_three_authors_collapse_to_etal() {
        let authors = names(&["Alpha", "Beta", "Gamma"]);
        let key = engine("{authors}").citekey(&KeyInputs {
            creators: Some(&authors),
            ..Default::default()
        });
        assert_eq!(key, "alpha_etal");
    }

    #[test]
    fn test_title_word_strips_banned_word() {
        let e = engine("{Title}");
        assert_eq!(e.title_word("The Quick Brown Fox"), "quick");
        let key = e.citekey(&KeyInputs {
            title: "The Quick Brown Fox",
            ..Default::default()
        });
        assert_eq!(key, "Quick");
    }

    #[test]
    fn test_title_word_only_first_banned_word() {
        let e = engine("{title}");
        // Only the very first word is checked against the list.
        assert_eq!(e.title_word("The the end"), "the");
    }

    #[test]
    fn test_title_word_single_letter_and_punctuation() {
        let e = CiteKeyEngine::new("{title}", &[]);
        assert_eq!(e.title_word("A Study: of things"), "study");
        assert_eq!(e.title_word("x ray vision"), "ray");
        assert_eq!(e.title_word("Hello, world"), "hello");
        assert_eq!(e.title_word("What?! Now"), "what");
        assert_eq!(e.title_word(""), "");
    }

    #[test]
    fn test_year_placeholders() {
        let e = engine("{author}{year}-{Year}");
        let authors = names(&["Knuth"]);
        let key = e.citekey(&KeyInputs {
            creators: Some(&authors),
            year: "1984",
            title: "",
        });
        assert_eq!(key, "knuth84-1984");
    }

    #[test]
    fn test_missing_author_and_year() {
        let key = engine("{Author}_{Year}").citekey(&KeyInputs::default());
        assert_eq!(key, "No_Author_");
    }

    #[test]
    fn test_non_word_characters_stripped() {
        let authors = names(&["O'Brien-Smith", "van der Berg"]);
        let key = engine("{Authors}").citekey(&KeyInputs {
            creators: Some(&authors),
            ..Default::default()
        });
        assert_eq!(key, "Obriensmith_Vanderberg");
    }

    #[test]
    fn test_placeholder_used_once_left_to_right() {
        let e = engine("{year}{author}{year}");
        assert_eq!(
            e.placeholders(),
            vec![Placeholder::Year, Placeholder::Author]
        );
        let authors = names(&["Doe"]);
        let key = e.citekey(&KeyInputs {
            creators: Some(&authors),
            year: "2001",
            title: "",
        });
        assert_eq!(key, "01doe{year}");
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let authors = names(&["Year"]);
        let key = engine("{author}{Year}").citekey(&KeyInputs {
            creators: Some(&authors),
            year: "2000",
            title: "",
        });
        assert_eq!(key, "year2000");
    }

    #[test]
    fn test_whitespace_and_apostrophes_removed_from_key() {
        let key = engine("it's {Year} \u{2019}x").citekey(&KeyInputs {
            year: "2010",
            ..Default::default()
        });
        assert_eq!(key, "its2010x");
    }

    #[test]
    fn test_deterministic_and_colliding() {
        let e = engine("{Author}{Year}{Title}");
        let a = names(&["Smith"]);
        let b = names(&["Smith"]);
        let first = e.citekey(&KeyInputs {
            creators: Some(&a),
            year: "2020",
            title: "Results",
        });
        let second = e.citekey(&KeyInputs {
            creators: Some(&b),
            year: "2020",
            title: "Results",
        });
        // Distinct entries with identical inputs collide; no disambiguation.
        assert_eq!(first, second);
        assert_eq!(first, "Smith2020Results");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("smith_o'brien"), "Smith_O'Brien");
        assert_eq!(title_case("MCDONALD"), "Mcdonald");
    }
}

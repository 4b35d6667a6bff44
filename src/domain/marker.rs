//! Placeholder markers
//!
//! A marker is a directive embedded in documentation text:
//!
//! ```text
//! !DACDOC[Example](http://example.com);id=example!
//! !DACDOC ids=example,other!
//! ```
//!
//! The body between `!DACDOC` and the next `!` is a list of `;`-separated
//! clauses. Clauses of the form `id=`, `test=` or `ids=` are parameters; the
//! first other clause is the argument, so `=` may appear inside a URL.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Framing token around every placeholder
pub const FRAMING: &str = "!";

/// Keyword that follows the opening framing token
pub const KEYWORD: &str = "DACDOC";

/// Test kind used when a primitive marker does not name one: the argument is a
/// markdown link or bare URI that must resolve
pub const DEFAULT_TEST_ID: &str = "dacdoc-url";

const PARAMETER_SEPARATOR: char = ';';
const KEY_VALUE_SEPARATOR: char = '=';
const IDS_SEPARATOR: char = ',';

const PARAM_ID: &str = "id";
const PARAM_TEST: &str = "test";
const PARAM_IDS: &str = "ids";

/// The placeholder grammar, compiled once. The body may span lines and stops
/// at the first framing token.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        "{framing}{keyword}((?s:.)*?){framing}",
        framing = regex::escape(FRAMING),
        keyword = regex::escape(KEYWORD),
    );
    Regex::new(&pattern).expect("placeholder pattern is a valid regex")
});

/// Returns the compiled placeholder pattern
pub(crate) fn placeholder_pattern() -> &'static Regex {
    &PLACEHOLDER
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarkerError {
    #[error("Placeholder has neither an argument nor an ids list: {0}")]
    MissingArgument(String),

    #[error("Placeholder declares an empty ids list: {0}")]
    EmptyIds(String),

    #[error("Placeholder parameter '{key}' is given more than once in: {raw}")]
    DuplicateParameter { key: String, raw: String },

    #[error("Placeholder parameter '{key}' has an empty value in: {raw}")]
    EmptyValue { key: String, raw: String },

    #[error("Not a placeholder (expected '!DACDOC...!'): {0}")]
    NotAPlaceholder(String),
}

/// Whether a marker is checked directly or aggregates other markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Primitive,
    Composite,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Primitive => write!(f, "primitive"),
            MarkerKind::Composite => write!(f, "composite"),
        }
    }
}

/// One parsed placeholder
///
/// Identity is the full raw text: two markers are equal iff their text is
/// byte-identical, so repeated placeholders in one file collapse to one.
#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    raw: String,
    kind: MarkerKind,
    argument: Option<String>,
    id: Option<String>,
    test_id: String,
    ids: Vec<String>,
}

impl Marker {
    /// Parses a full placeholder (`!DACDOC...!`)
    pub fn from_raw(raw: &str) -> Result<Self, MarkerError> {
        let body = raw
            .strip_prefix(FRAMING)
            .and_then(|s| s.strip_prefix(KEYWORD))
            .and_then(|s| s.strip_suffix(FRAMING))
            .ok_or_else(|| MarkerError::NotAPlaceholder(raw.to_string()))?;

        let mut argument = None;
        let mut id = None;
        let mut test_id = None;
        let mut ids = None;

        for clause in body.split(PARAMETER_SEPARATOR) {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }

            // Only the known keys make a key=value clause; anything else (a URL
            // with a query string, say) is a bare argument.
            let parameter = clause
                .split_once(KEY_VALUE_SEPARATOR)
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, _)| matches!(*key, PARAM_ID | PARAM_TEST | PARAM_IDS));

            let Some((key, value)) = parameter else {
                if argument.is_none() {
                    argument = Some(clause.to_string());
                } else {
                    log::debug!("Ignoring extra bare clause '{}' in {}", clause, raw);
                }
                continue;
            };

            let slot_taken = match key {
                PARAM_ID => id.is_some(),
                PARAM_TEST => test_id.is_some(),
                _ => ids.is_some(),
            };
            if slot_taken {
                return Err(MarkerError::DuplicateParameter {
                    key: key.to_string(),
                    raw: raw.to_string(),
                });
            }

            match key {
                PARAM_IDS => {
                    let list: Vec<String> = value
                        .split(IDS_SEPARATOR)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                    if list.is_empty() {
                        return Err(MarkerError::EmptyIds(raw.to_string()));
                    }
                    ids = Some(list);
                }
                _ if value.is_empty() => {
                    return Err(MarkerError::EmptyValue {
                        key: key.to_string(),
                        raw: raw.to_string(),
                    })
                }
                PARAM_ID => id = Some(value.to_string()),
                _ => test_id = Some(value.to_string()),
            }
        }

        let kind = if ids.is_some() {
            MarkerKind::Composite
        } else {
            MarkerKind::Primitive
        };

        if kind == MarkerKind::Primitive && argument.is_none() {
            return Err(MarkerError::MissingArgument(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            kind,
            argument,
            id,
            test_id: test_id.unwrap_or_else(|| DEFAULT_TEST_ID.to_string()),
            ids: ids.unwrap_or_default(),
        })
    }

    /// The full placeholder text, framing included
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    pub fn is_composite(&self) -> bool {
        self.kind == MarkerKind::Composite
    }

    /// The first bare clause, trimmed. Always present on primitive markers.
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Identifier other markers can reference
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Check kind, [`DEFAULT_TEST_ID`] unless overridden
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Referenced identifiers in declaration order (empty for primitives)
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Marker {}

impl Hash for Marker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Marker {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_raw(s)
    }
}

/// Lazily parses every placeholder in `text`, in document order
///
/// Malformed placeholders are yielded as errors, never skipped.
pub fn parse_markers(text: &str) -> impl Iterator<Item = Result<Marker, MarkerError>> + '_ {
    PLACEHOLDER
        .find_iter(text)
        .map(|m| Marker::from_raw(m.as_str()))
}

/// Parses all placeholders in `text` into a set of markers
///
/// The result keeps first-occurrence order; byte-identical placeholders
/// collapse to one entry. The first malformed placeholder fails the whole text.
pub fn parse(text: &str) -> Result<Vec<Marker>, MarkerError> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for marker in parse_markers(text) {
        let marker = marker?;
        if seen.insert(marker.raw.clone()) {
            markers.push(marker);
        }
    }

    Ok(markers)
}

//! Check variants
//!
//! Checks live in an arena owned by a [`Resolution`](super::Resolution) and
//! refer to each other through [`CheckId`] handles, so a check referenced by
//! several composites is one shared instance.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A single `[label](uri)` spanning the whole argument. The label holds no
/// `]` and the destination allows one level of balanced parentheses, so
/// `[a](x.md) and [b](y.md)` does not match.
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\[[^\]]*\]\(([^()]*(?:\([^()]*\)[^()]*)*)\)$")
        .expect("markdown link pattern is a valid regex")
});

/// Handle to a check inside a resolution's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CheckId(pub(crate) usize);

impl CheckId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A result-producing unit attached to a marker occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// The marker's argument must point at something that exists
    Url(UrlCheck),

    /// Passes iff every referenced check passes
    Composite(CompositeCheck),

    /// Cannot be resolved; always indeterminate
    Unknown { reason: UnknownReason },
}

impl Check {
    pub fn unknown(reason: UnknownReason) -> Self {
        Check::Unknown { reason }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Check::Unknown { .. })
    }

    pub fn as_composite(&self) -> Option<&CompositeCheck> {
        match self {
            Check::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            Check::Url(url) => format!("url {}", url.uri()),
            Check::Composite(composite) => {
                let ids: Vec<String> = composite.checks().iter().map(|id| id.to_string()).collect();
                format!("all of [{}]", ids.join(", "))
            }
            Check::Unknown { reason } => format!("unknown ({})", reason),
        }
    }
}

/// Why a check could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UnknownReason {
    /// A primitive marker named a test kind nobody implements
    UnrecognizedTest(String),

    /// A composite referenced an id no parsed marker declares
    MissingReference(String),

    /// The composite is part of a reference cycle
    CyclicReference,
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::UnrecognizedTest(test) => write!(f, "unrecognized test '{}'", test),
            UnknownReason::MissingReference(id) => write!(f, "no marker with id '{}'", id),
            UnknownReason::CyclicReference => write!(f, "cyclic composite reference"),
        }
    }
}

/// Verifies that a link target exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlCheck {
    /// File the marker was found in; relative links resolve against it
    file: PathBuf,
    uri: String,
}

impl UrlCheck {
    /// Builds a check from a marker argument (markdown link or bare URI)
    pub fn new(file: impl Into<PathBuf>, argument: &str) -> Self {
        Self {
            file: file.into(),
            uri: extract_markdown_uri(argument),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Classifies the URI. Root-relative links (`/docs/x.md`) resolve against `root`.
    pub fn target(&self, root: &Path) -> LinkTarget {
        LinkTarget::classify(&self.uri, &self.file, root)
    }
}

/// Extracts the URI from `[label](uri)`, or returns the trimmed argument
///
/// A link title (`[a](uri "title")`) and angle brackets (`[a](<uri>)`) are dropped.
pub fn extract_markdown_uri(argument: &str) -> String {
    let argument = argument.trim();

    let Some(captures) = MARKDOWN_LINK.captures(argument) else {
        return argument.to_string();
    };

    let inner = captures.get(1).map_or("", |m| m.as_str()).trim();

    // `<...>` destinations may contain spaces
    if let Some((destination, _)) = inner.strip_prefix('<').and_then(|s| s.split_once('>')) {
        return destination.to_string();
    }

    inner.split_whitespace().next().unwrap_or("").to_string()
}

/// Ordered set of sub-checks, in the order of the marker's `ids`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositeCheck {
    checks: Vec<CheckId>,
}

impl CompositeCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checks(&self) -> &[CheckId] {
        &self.checks
    }

    pub(crate) fn push(&mut self, check: CheckId) {
        self.checks.push(check);
    }
}

/// Where a URL check points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum LinkTarget {
    /// `http://` or `https://`
    Remote(String),

    /// A filesystem path, already resolved against the originating file
    Local(PathBuf),

    /// `#heading` within the same document
    Fragment(String),

    /// Any other scheme (`mailto:`, `ftp:`, ...)
    Unsupported(String),
}

impl LinkTarget {
    /// Classifies `uri` found in `file`
    pub fn classify(uri: &str, file: &Path, root: &Path) -> Self {
        let uri = uri.trim();

        if let Some(scheme) = scheme_of(uri) {
            return match scheme.to_ascii_lowercase().as_str() {
                "http" | "https" => LinkTarget::Remote(uri.to_string()),
                _ => LinkTarget::Unsupported(uri.to_string()),
            };
        }

        if uri.is_empty() || uri.starts_with('#') {
            return LinkTarget::Fragment(uri.to_string());
        }

        let path = uri
            .split(['#', '?'])
            .next()
            .unwrap_or(uri);

        let resolved = match path.strip_prefix('/') {
            Some(rooted) => root.join(rooted),
            None => file.parent().unwrap_or(Path::new("")).join(path),
        };

        LinkTarget::Local(resolved)
    }
}

/// Returns the URI scheme, ignoring single letters so `C:\docs` stays a path
fn scheme_of(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;

    let valid = scheme.len() > 1
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_uri_from_markdown_link() {
        assert_eq!(extract_markdown_uri("[Example](http://example.com)"), "http://example.com");
    }

    #[test]
    fn bare_uri_is_trimmed() {
        assert_eq!(extract_markdown_uri("  http://example.com \n"), "http://example.com");
    }

    #[test]
    fn link_title_and_angle_brackets_are_dropped() {
        assert_eq!(
            extract_markdown_uri(r#"[Docs](<docs/intro.md> "Intro")"#),
            "docs/intro.md"
        );
        assert_eq!(extract_markdown_uri(r#"[Docs](docs/intro.md "Intro")"#), "docs/intro.md");
    }

    #[test]
    fn angle_bracket_destination_keeps_spaces() {
        assert_eq!(extract_markdown_uri("[Guide](<my guide.md>)"), "my guide.md");
        assert_eq!(
            extract_markdown_uri(r#"[Guide](<my guide.md> "The guide")"#),
            "my guide.md"
        );
    }

    #[test]
    fn several_links_are_not_one_link() {
        let argument = "[a](x.md) and [b](y.md)";
        assert_eq!(extract_markdown_uri(argument), argument);
    }

    #[test]
    fn balanced_parentheses_in_destination() {
        assert_eq!(
            extract_markdown_uri("[Rust](https://en.wikipedia.org/wiki/Rust_(programming_language))"),
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
    }

    #[test]
    fn url_check_keeps_file() {
        let check = UrlCheck::new("docs/guide.md", "[Guide](../README.md)");
        assert_eq!(check.file(), Path::new("docs/guide.md"));
        assert_eq!(check.uri(), "../README.md");
    }

    #[test]
    fn classifies_remote() {
        let target = LinkTarget::classify("HTTPS://example.com/a", Path::new("a.md"), Path::new("."));
        assert_eq!(target, LinkTarget::Remote("HTTPS://example.com/a".to_string()));
    }

    #[test]
    fn classifies_unsupported_scheme() {
        let target = LinkTarget::classify("mailto:me@example.com", Path::new("a.md"), Path::new("."));
        assert!(matches!(target, LinkTarget::Unsupported(_)));
    }

    #[test]
    fn classifies_fragment() {
        let target = LinkTarget::classify("#install", Path::new("a.md"), Path::new("."));
        assert_eq!(target, LinkTarget::Fragment("#install".to_string()));
    }

    #[test]
    fn relative_path_resolves_against_file() {
        let target = LinkTarget::classify(
            "../img/logo.png#top",
            Path::new("/repo/docs/guide.md"),
            Path::new("/repo"),
        );
        assert_eq!(target, LinkTarget::Local(PathBuf::from("/repo/docs/../img/logo.png")));
    }

    #[test]
    fn rooted_path_resolves_against_root() {
        let target = LinkTarget::classify(
            "/CHANGELOG.md?plain=1",
            Path::new("/repo/docs/guide.md"),
            Path::new("/repo"),
        );
        assert_eq!(target, LinkTarget::Local(PathBuf::from("/repo/CHANGELOG.md")));
    }

    #[test]
    fn drive_letter_is_not_a_scheme() {
        assert_eq!(scheme_of("C:/docs"), None);
        assert_eq!(scheme_of("git+ssh://host"), Some("git+ssh"));
    }

    #[test]
    fn unknown_checks_with_same_reason_are_equal() {
        let a = Check::unknown(UnknownReason::MissingReference("x".to_string()));
        let b = Check::unknown(UnknownReason::MissingReference("x".to_string()));
        assert_eq!(a, b);
        assert!(a.is_unknown());
    }

    #[test]
    fn describe_composite() {
        let mut composite = CompositeCheck::new();
        composite.push(CheckId(0));
        composite.push(CheckId(3));
        assert_eq!(Check::Composite(composite).describe(), "all of [#0, #3]");
    }
}

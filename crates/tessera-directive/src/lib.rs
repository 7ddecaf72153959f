//! Parser for template composition directives.
//!
//! Template sources may declare their place in a composition graph with two
//! directives written in double-brace statement syntax:
//!
//! - `{{extend "base"}}` lists ancestors that are composed before the template.
//! - `{{include "nav" "footer"}}` lists sub-templates composed after it.
//!
//! Each quoted literal may carry several whitespace-separated names, so
//! `{{include "a b" "c"}}` declares `a`, `b` and `c`.
//!
//! [`parse`] finds the first directive of each kind, removes it (along with any
//! line breaks that immediately follow it) from the body, and returns the
//! referenced names. A second directive of the same kind is left in the body
//! untouched.
//!
//! # Example
//!
//! ```rust
//! use tessera_directive::parse;
//!
//! let parsed = parse("{{extend \"base\"}}\n{{include \"nav footer\"}}\nHello").unwrap();
//!
//! assert_eq!(parsed.extends, vec!["base"]);
//! assert_eq!(parsed.includes, vec!["nav", "footer"]);
//! assert_eq!(parsed.body, "Hello");
//! ```
//!
//! # Malformed Directives
//!
//! A directive opener without a matching `}}` (or with braces inside its
//! argument list) is reported as [`DirectiveError::Unterminated`] rather than
//! silently ignored.

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EXTEND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*extend(?:\s[^{}]*)?\}\}(?:\r?\n)*").expect("valid regex"));
static EXTEND_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*extend(?:\s|\}|$)").expect("valid regex"));
static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*include(?:\s[^{}]*)?\}\}(?:\r?\n)*").expect("valid regex"));
static INCLUDE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*include(?:\s|\}|$)").expect("valid regex"));
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).expect("valid regex"));

/// The two kinds of composition directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `{{extend ...}}`: ancestors composed before the template.
    Extend,
    /// `{{include ...}}`: sub-templates composed after the template.
    Include,
}

impl DirectiveKind {
    /// The keyword used in template sources.
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Extend => "extend",
            DirectiveKind::Include => "include",
        }
    }

    fn full(self) -> &'static Regex {
        match self {
            DirectiveKind::Extend => &EXTEND,
            DirectiveKind::Include => &INCLUDE,
        }
    }

    fn opener(self) -> &'static Regex {
        match self {
            DirectiveKind::Extend => &EXTEND_OPEN,
            DirectiveKind::Include => &INCLUDE_OPEN,
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Errors produced while scanning for directives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// A directive was opened but never closed with `}}`.
    #[error("unterminated {kind} directive on line {line}")]
    Unterminated { kind: DirectiveKind, line: usize },
}

/// A template source with its directives extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Renderable body with the matched directive statements removed.
    pub body: String,
    /// Names listed by the `extend` directive, in source order.
    pub extends: Vec<String>,
    /// Names listed by the `include` directive, in source order.
    pub includes: Vec<String>,
}

impl Directives {
    /// Returns true if the source declared no dependencies at all.
    pub fn is_standalone(&self) -> bool {
        self.extends.is_empty() && self.includes.is_empty()
    }
}

/// Extracts the `extend` and `include` directives from a template source.
///
/// The extend directive is removed first and the include directive is then
/// searched for in what remains. Names are returned as written; duplicates are
/// not removed here.
///
/// # Errors
///
/// Returns [`DirectiveError::Unterminated`] if the first opener of either kind
/// has no well-formed closing `}}`.
pub fn parse(source: &str) -> Result<Directives, DirectiveError> {
    let mut body = source.to_string();

    let extends = match locate(&body, DirectiveKind::Extend)? {
        Some(span) => take(&mut body, span),
        None => Vec::new(),
    };

    let includes = match locate(&body, DirectiveKind::Include)? {
        Some(span) => take(&mut body, span),
        None => Vec::new(),
    };

    Ok(Directives {
        body,
        extends,
        includes,
    })
}

/// Splits the quoted literals of one directive statement into names.
///
/// ```rust
/// use tessera_directive::names;
///
/// assert_eq!(names(r#"{{include "a b" "c"}}"#), vec!["a", "b", "c"]);
/// ```
pub fn names(statement: &str) -> Vec<String> {
    QUOTED
        .find_iter(statement)
        .map(|m| m.as_str())
        .filter(|quoted| quoted.len() >= 2)
        .flat_map(|quoted| quoted[1..quoted.len() - 1].split_whitespace())
        .map(str::to_string)
        .collect()
}

fn locate(source: &str, kind: DirectiveKind) -> Result<Option<Range<usize>>, DirectiveError> {
    let Some(open) = kind.opener().find(source) else {
        return Ok(None);
    };

    match kind.full().find(source) {
        Some(m) if m.start() == open.start() => Ok(Some(m.range())),
        _ => Err(DirectiveError::Unterminated {
            kind,
            line: line_of(source, open.start()),
        }),
    }
}

fn take(body: &mut String, span: Range<usize>) -> Vec<String> {
    let found = names(&body[span.clone()]);
    body.replace_range(span, "");
    found
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

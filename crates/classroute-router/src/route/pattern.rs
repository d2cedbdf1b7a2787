//! Route pattern classification and compilation
//!
//! Pure functional parsing of route templates such as `/users/[id]`,
//! `/users/:id` or `/files/*` into an anchored regex plus the ordered list of
//! parameter names. All functions are **pure**: same input → same output.

use regex::Regex;

use super::params::RouteParams;
use crate::error::PatternError;

/// Kind of a route pattern
///
/// # Examples
///
/// ```
/// use classroute_router::route::pattern::{classify, PatternKind};
///
/// assert_eq!(classify("/about"), PatternKind::Static);
/// assert_eq!(classify("/users/[id]"), PatternKind::Dynamic);
/// assert_eq!(classify("/users/:id"), PatternKind::Dynamic);
/// assert_eq!(classify("/files/*"), PatternKind::Wildcard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// No parameters at all, matched by string equality
    Static,
    /// Contains `[name]` or `:name` segments
    Dynamic,
    /// Contains a `*` that may span several segments
    Wildcard,
}

impl PatternKind {
    /// Static patterns live in the direct lookup table, everything else is matched
    pub fn is_dynamic(self) -> bool {
        !matches!(self, PatternKind::Static)
    }
}

/// A lexical piece of a route pattern
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Param(String),
    Wildcard,
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits a pattern into literal text, parameters and wildcards
///
/// A `:` that is not followed by an identifier character stays literal text.
fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();

    let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some((pos, c)) = chars.next() {
        match c {
            '[' => {
                let rest = &pattern[pos + 1..];
                let end = rest.find(']').ok_or_else(|| PatternError::UnclosedBracket {
                    pattern: pattern.to_string(),
                })?;
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(PatternError::EmptyParam {
                        pattern: pattern.to_string(),
                    });
                }
                if name.contains(['/', '[']) {
                    return Err(PatternError::UnclosedBracket {
                        pattern: pattern.to_string(),
                    });
                }
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Param(name.to_string()));
                // Skip the name and the closing bracket
                for _ in 0..name.chars().count() + 1 {
                    chars.next();
                }
            }
            ':' if chars.peek().is_some_and(|&(_, next)| is_param_char(next)) => {
                let mut name = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if !is_param_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Param(name));
            }
            '*' => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Wildcard);
            }
            _ => literal.push(c),
        }
    }
    flush(&mut literal, &mut tokens);

    Ok(tokens)
}

/// Classifies a route pattern (pure function)
///
/// Never fails: malformed brackets are simply not counted as parameters here,
/// `compile` reports them.
pub fn classify(pattern: &str) -> PatternKind {
    if pattern.contains('*') {
        return PatternKind::Wildcard;
    }

    let has_bracket_param = pattern
        .split('[')
        .skip(1)
        .any(|rest| rest.find(']').is_some_and(|end| end > 0));

    let has_colon_param = pattern
        .split(':')
        .skip(1)
        .any(|rest| rest.chars().next().is_some_and(is_param_char));

    if has_bracket_param || has_colon_param {
        PatternKind::Dynamic
    } else {
        PatternKind::Static
    }
}

/// Name bound by the n-th (1-based) wildcard of a pattern
fn wildcard_name(index: usize) -> String {
    if index == 1 {
        "wildcard".to_string()
    } else {
        format!("wildcard{}", index)
    }
}

/// A compiled route pattern
///
/// Immutable once compiled. Parameter names are unique and appear in the same
/// left-to-right order as the capture groups of the regex.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    kind: PatternKind,
    regex: Regex,
    param_names: Vec<String>,
}

impl RoutePattern {
    /// Compiles a pattern into an anchored regex and ordered parameter names
    ///
    /// - `[name]` and `:name` capture exactly one segment: `([^/]+)`
    /// - `*` captures greedily across segments: `(.*)`
    /// - everything else is matched literally
    ///
    /// # Examples
    ///
    /// ```
    /// use classroute_router::route::pattern::RoutePattern;
    ///
    /// let pattern = RoutePattern::compile("/users/[id]/posts/:slug").unwrap();
    /// assert_eq!(pattern.param_names(), &["id", "slug"]);
    ///
    /// let params = pattern.captures("/users/42/posts/hello-world").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// assert_eq!(params.get("slug"), Some("hello-world"));
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let tokens = tokenize(pattern)?;

        let mut source = String::from("^");
        let mut param_names: Vec<String> = Vec::new();
        let mut wildcards = 0;

        for token in tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(&text)),
                Token::Param(name) => {
                    if param_names.contains(&name) {
                        return Err(PatternError::DuplicateParam {
                            pattern: pattern.to_string(),
                            name,
                        });
                    }
                    source.push_str("([^/]+)");
                    param_names.push(name);
                }
                Token::Wildcard => {
                    wildcards += 1;
                    source.push_str("(.*)");
                    param_names.push(wildcard_name(wildcards));
                }
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| PatternError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            kind: classify(pattern),
            regex,
            param_names,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Matches a concrete path, returning captured parameters in declaration order
    ///
    /// No normalization happens here: `/about/` and `/about` are different paths.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let caps = self.regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                    (name.clone(), value.to_string())
                })
                .collect(),
        )
    }
}

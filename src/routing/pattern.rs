//! Path template compilation.
//!
//! # Responsibilities
//! - Turn a route template (`/submit/[id]/*`) into an anchored matcher
//! - Record parameter names in left-to-right template order
//! - Percent-decode captured values into [`Params`]
//!
//! # Design Decisions
//! - Compiled once at registration; matching never allocates a new regex
//! - Literal text is escaped, so `.` in a template only matches `.`
//! - Every `*` binds the reserved name `wildcard`; with several wildcards
//!   the last capture wins
//! - Malformed brackets are rejected at compile time, never at match time

use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

/// Reserved parameter name bound by every `*` token.
pub const WILDCARD_PARAM: &str = "wildcard";

/// A template that cannot be compiled. Positions are byte offsets into the template.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unclosed '[' at position {position} in template {template:?}")]
    UnclosedBracket { template: String, position: usize },

    #[error("unexpected ']' at position {position} in template {template:?}")]
    UnopenedBracket { template: String, position: usize },

    #[error("nested '[' at position {position} in template {template:?}")]
    NestedBracket { template: String, position: usize },

    #[error("empty parameter name at position {position} in template {template:?}")]
    EmptyParamName { template: String, position: usize },

    #[error("template {template:?} produced an invalid matcher: {source}")]
    Regex {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Parameters extracted from a matched path.
///
/// Keys are unique: inserting an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(Arc<str>, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, overwriting any previous value for the same name.
    pub fn insert(&mut self, name: Arc<str>, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile a template.
    ///
    /// `[name]` matches exactly one path segment, `*` matches the rest of the
    /// path including separators. Everything else is literal.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let mut regex_src = String::with_capacity(template.len() + 16);
        let mut param_names = Vec::new();
        let mut literal = String::new();

        regex_src.push('^');

        let mut chars = template.char_indices();
        while let Some((pos, c)) = chars.next() {
            match c {
                '[' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (inner_pos, inner) in chars.by_ref() {
                        match inner {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '[' => {
                                return Err(PatternError::NestedBracket {
                                    template: template.to_string(),
                                    position: inner_pos,
                                });
                            }
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(PatternError::UnclosedBracket {
                            template: template.to_string(),
                            position: pos,
                        });
                    }
                    if name.is_empty() {
                        return Err(PatternError::EmptyParamName {
                            template: template.to_string(),
                            position: pos,
                        });
                    }
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_src.push_str("([^/]+)");
                    param_names.push(Arc::from(name));
                }
                ']' => {
                    return Err(PatternError::UnopenedBracket {
                        template: template.to_string(),
                        position: pos,
                    });
                }
                '*' => {
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_src.push_str("(.*)");
                    param_names.push(Arc::from(WILDCARD_PARAM));
                }
                other => literal.push(other),
            }
        }

        regex_src.push_str(&regex::escape(&literal));
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|source| PatternError::Regex {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            raw: template.to_string(),
            regex,
            param_names,
        })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parameter names in the order their captures appear.
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match a raw (still percent-encoded) path and decode every capture.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::new();
        for (index, name) in self.param_names.iter().enumerate() {
            let raw = caps.get(index + 1).map(|m| m.as_str()).unwrap_or_default();
            params.insert(Arc::clone(name), decode_component(raw));
        }
        Some(params)
    }
}

/// Percent-decode one captured value. Invalid UTF-8 is replaced rather than rejected.
fn decode_component(raw: &str) -> String {
    match urlencoding::decode_binary(raw.as_bytes()) {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cow::Owned(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

//! Per-segment shell globs.
//!
//! A segment glob matches one directory entry name, never a path, so there is
//! no separator handling: `*` matches any run of characters (including none),
//! `?` exactly one character, `[abc]`/`[a-z]`/`[!abc]` one character from (or
//! not from) a class. A `[` without a closing `]` is a literal bracket.
//! `[^abc]` is accepted as a synonym for `[!abc]`, as most shells do; a strict
//! POSIX matcher would read that `^` as a literal.
//!
//! Case policy is fixed per catalog: case-insensitive by default, matching
//! Windows filesystem semantics.

#![allow(missing_docs)]

use regex::Regex;

use crate::core::errors::{ProbeError, Result};

/// Whether glob matching folds case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CasePolicy {
    #[default]
    Insensitive,
    Sensitive,
}

impl CasePolicy {
    #[must_use]
    pub const fn from_insensitive_flag(insensitive: bool) -> Self {
        if insensitive {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// No wildcard characters; compared directly.
    Literal(String),
    Wildcard(Regex),
}

/// One compiled pattern segment.
#[derive(Debug, Clone)]
pub struct SegmentGlob {
    original: String,
    policy: CasePolicy,
    matcher: Matcher,
}

impl SegmentGlob {
    /// Compile one segment. Fails on empty segments and on segments that
    /// contain a path separator.
    pub fn compile(segment: &str, policy: CasePolicy) -> Result<Self> {
        if segment.is_empty() {
            return Err(ProbeError::InvalidPattern {
                pattern: segment.to_string(),
                details: "empty path segment".to_string(),
            });
        }
        if segment.contains(['\\', '/']) {
            return Err(ProbeError::InvalidPattern {
                pattern: segment.to_string(),
                details: "segment contains a path separator".to_string(),
            });
        }

        let matcher = if has_wildcards(segment) {
            Matcher::Wildcard(glob_to_regex(segment, policy)?)
        } else {
            Matcher::Literal(match policy {
                CasePolicy::Insensitive => segment.to_lowercase(),
                CasePolicy::Sensitive => segment.to_string(),
            })
        };

        Ok(Self {
            original: segment.to_string(),
            policy,
            matcher,
        })
    }

    /// Whether an entry name matches this segment.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(literal) => match self.policy {
                CasePolicy::Insensitive => name.to_lowercase() == *literal,
                CasePolicy::Sensitive => name == literal,
            },
            Matcher::Wildcard(re) => re.is_match(name),
        }
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.matcher, Matcher::Literal(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    #[must_use]
    pub const fn policy(&self) -> CasePolicy {
        self.policy
    }
}

fn has_wildcards(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

/// Translate one glob segment into an anchored regex.
fn glob_to_regex(pattern: &str, policy: CasePolicy) -> Result<Regex> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex_str = String::with_capacity(pattern.len() * 2 + 8);
    if policy == CasePolicy::Insensitive {
        regex_str.push_str("(?i)");
    }
    regex_str.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Collapse runs of `*`; they are equivalent.
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                regex_str.push_str(".*");
            }
            '?' => {
                regex_str.push('.');
                i += 1;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut regex_str, &chars[i + 1..end]);
                    i = end + 1;
                }
                None => {
                    regex_str.push_str("\\[");
                    i += 1;
                }
            },
            c => {
                push_literal(&mut regex_str, c);
                i += 1;
            }
        }
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| ProbeError::InvalidPattern {
        pattern: pattern.to_string(),
        details: err.to_string(),
    })
}

/// Index of the `]` closing the class opened at `open`, if any.
///
/// A `]` directly after `[` or `[!` is part of the class.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if j < chars.len() && (chars[j] == '!' || chars[j] == '^') {
        j += 1;
    }
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn push_class(out: &mut String, body: &[char]) {
    let (negated, body) = match body.first() {
        Some('!' | '^') => (true, &body[1..]),
        _ => (false, body),
    };
    out.push('[');
    if negated {
        out.push('^');
    }
    for (idx, &c) in body.iter().enumerate() {
        let is_range = c == '-' && idx > 0 && idx + 1 < body.len();
        if is_range {
            out.push('-');
        } else if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out.push(']');
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

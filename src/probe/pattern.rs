//! Path patterns: a root volume/share followed by glob segments.

#![allow(missing_docs)]

use std::fmt;

use super::glob::{CasePolicy, SegmentGlob};
use crate::core::errors::{ProbeError, Result};

/// A parsed, compiled path pattern such as `C:\Users\*\AppData\*\1Password`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    root: String,
    share: String,
    segments: Vec<SegmentGlob>,
}

impl PathPattern {
    /// Parse a pattern. Both `\` and `/` separate segments; repeated separators
    /// are collapsed.
    ///
    /// The first segment is the root: a drive (`C:`) maps to its administrative
    /// share (`C$`), anything else is taken as a share name. The root may not
    /// contain wildcards and at least one segment must follow it.
    pub fn parse(raw: &str, policy: CasePolicy) -> Result<Self> {
        let mut parts = raw.split(['\\', '/']).filter(|s| !s.is_empty());
        let root = parts.next().ok_or_else(|| ProbeError::InvalidPattern {
            pattern: raw.to_string(),
            details: "pattern is empty".to_string(),
        })?;
        if root.contains(['*', '?', '[']) {
            return Err(ProbeError::InvalidPattern {
                pattern: raw.to_string(),
                details: format!("root '{root}' may not contain wildcards"),
            });
        }

        let segments = parts
            .map(|segment| {
                SegmentGlob::compile(segment, policy).map_err(|err| match err {
                    ProbeError::InvalidPattern { details, .. } => ProbeError::InvalidPattern {
                        pattern: raw.to_string(),
                        details: format!("segment '{segment}': {details}"),
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if segments.is_empty() {
            return Err(ProbeError::InvalidPattern {
                pattern: raw.to_string(),
                details: "pattern names no path below its root".to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            root: root.to_string(),
            share: share_for_root(root),
            segments,
        })
    }

    /// Pattern text as written in the catalog.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Share the pattern is resolved against (`C$` for `C:`).
    #[must_use]
    pub fn share(&self) -> &str {
        &self.share
    }

    /// Segments after the root, in order.
    #[must_use]
    pub fn segments(&self) -> &[SegmentGlob] {
        &self.segments
    }

    /// Number of segments containing at least one wildcard.
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_literal()).count()
    }

    /// Render a share-relative concrete path under this pattern's root.
    #[must_use]
    pub fn display_path(&self, share_relative: &str) -> String {
        if share_relative.is_empty() {
            self.root.clone()
        } else {
            format!("{}\\{share_relative}", self.root)
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn share_for_root(root: &str) -> String {
    let mut chars = root.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), Some(':'), None) if letter.is_ascii_alphabetic() => {
            format!("{}$", letter.to_ascii_uppercase())
        }
        _ => root.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> PathPattern {
        PathPattern::parse(raw, CasePolicy::Insensitive).unwrap()
    }

    #[test]
    fn drive_root_maps_to_admin_share() {
        let pattern = parse(r"C:\Program Files\KeePass*");
        assert_eq!(pattern.share(), "C$");
        assert_eq!(pattern.segments().len(), 2);
        assert_eq!(pattern.wildcard_count(), 1);
        assert_eq!(parse(r"d:\Tools\x").share(), "D$");
    }

    #[test]
    fn doubled_and_forward_separators_collapse() {
        let pattern = parse(r"C:\\Users\\*\\AppData\\*\\1Password");
        let names: Vec<&str> = pattern.segments().iter().map(SegmentGlob::as_str).collect();
        assert_eq!(names, vec!["Users", "*", "AppData", "*", "1Password"]);
        assert_eq!(parse("C:/Program Files/Enpass").segments().len(), 2);
    }

    #[test]
    fn share_root_is_kept_verbatim() {
        assert_eq!(parse(r"ADMIN$\Temp\x").share(), "ADMIN$");
    }

    #[test]
    fn wildcard_root_rejected() {
        let err = PathPattern::parse(r"*:\Program Files", CasePolicy::Insensitive).unwrap_err();
        assert_eq!(err.code(), "PRB-2002");
    }

    #[test]
    fn root_only_and_empty_patterns_rejected() {
        assert!(PathPattern::parse("C:", CasePolicy::Insensitive).is_err());
        assert!(PathPattern::parse(r"C:\", CasePolicy::Insensitive).is_err());
        assert!(PathPattern::parse("", CasePolicy::Insensitive).is_err());
    }

    #[test]
    fn malformed_segment_error_names_whole_pattern() {
        let err = PathPattern::parse(r"C:\Tools\[z-a]", CasePolicy::Insensitive).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(r"'C:\Tools\[z-a]'"), "{msg}");
        assert!(msg.contains(r"segment '[z-a]'"), "{msg}");
        assert!(!msg.contains(r"\\"), "backslashes must not be escaped: {msg}");
    }

    #[test]
    fn display_path_prefixes_root() {
        let pattern = parse(r"C:\Program Files\KeePass*");
        assert_eq!(
            pattern.display_path(r"Program Files\KeePass2"),
            r"C:\Program Files\KeePass2"
        );
    }
}

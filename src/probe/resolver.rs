//! Wildcard path resolution over a listing-only remote filesystem.
//!
//! The resolver expands a [`PathPattern`] one segment at a time. The frontier
//! starts at the share root; each step lists every frontier directory, keeps
//! the children whose names match the segment, and the survivors become the
//! next frontier. An empty frontier ends resolution with no match, so a
//! wildcard that matches nothing never causes deeper listings.
//!
//! A listing that fails (missing path, access denied, transport error) only
//! removes that branch. Sibling branches keep going. Only a session-level
//! failure aborts resolution.

#![allow(missing_docs)]

use std::collections::HashSet;

use serde::Serialize;

use super::pattern::PathPattern;
use crate::core::errors::{ProbeError, Result};
use crate::session::{ListingError, Session, join_share_path};

/// A listing that failed and was treated as "no children".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingFailure {
    pub share: String,
    pub path: String,
    pub kind: &'static str,
    pub message: String,
}

/// Side channel for recovered failures and request accounting.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    failures: Vec<ListingFailure>,
    listings: usize,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_listing(&mut self) {
        self.listings += 1;
    }

    pub fn record_failure(&mut self, share: &str, path: &str, error: &ListingError) {
        self.failures.push(ListingFailure {
            share: share.to_string(),
            path: path.to_string(),
            kind: error.kind_label(),
            message: error.to_string(),
        });
    }

    /// Failed listings, in request order.
    #[must_use]
    pub fn failures(&self) -> &[ListingFailure] {
        &self.failures
    }

    /// Number of listing requests issued, failed or not.
    #[must_use]
    pub fn listing_count(&self) -> usize {
        self.listings
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<ListingFailure> {
        self.failures
    }
}

/// Resolution knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Ignore `.` and `..` entries that SMB servers include in listings.
    pub skip_dot_entries: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            skip_dot_entries: true,
        }
    }
}

/// Resolves path patterns against one session.
pub struct PathResolver<'s, S: Session + ?Sized> {
    session: &'s S,
    options: ResolveOptions,
}

impl<'s, S: Session + ?Sized> PathResolver<'s, S> {
    pub fn new(session: &'s S, options: ResolveOptions) -> Self {
        Self { session, options }
    }

    /// Whether `pattern` matches at least one existing path.
    pub fn resolve(&self, pattern: &PathPattern, diagnostics: &mut Diagnostics) -> Result<bool> {
        Ok(self.first_match(pattern, diagnostics)?.is_some())
    }

    /// The first concrete share-relative path matching `pattern`, if any.
    pub fn first_match(
        &self,
        pattern: &PathPattern,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<String>> {
        let share = pattern.share();
        let mut frontier = vec![String::new()];

        for segment in pattern.segments() {
            let mut next = Vec::new();
            let mut seen = HashSet::new();

            for parent in &frontier {
                diagnostics.record_listing();
                let children = match self.session.list_directory(share, parent) {
                    Ok(children) => children,
                    Err(err) if err.is_session_fatal() => {
                        return Err(ProbeError::Session {
                            target: self.session.identity().label(),
                            details: err.to_string(),
                        });
                    }
                    Err(err) => {
                        diagnostics.record_failure(share, parent, &err);
                        continue;
                    }
                };

                for child in children {
                    if self.options.skip_dot_entries && is_dot_entry(&child.name) {
                        continue;
                    }
                    if segment.matches(&child.name) {
                        let path = join_share_path(parent, &child.name);
                        if seen.insert(path.clone()) {
                            next.push(path);
                        }
                    }
                }
            }

            if next.is_empty() {
                return Ok(None);
            }
            frontier = next;
        }

        Ok(frontier.into_iter().next())
    }

    /// First pattern (in order) that resolves, with its concrete match.
    /// Later patterns are not tried once one matches.
    pub fn first_matching<'p>(
        &self,
        patterns: &'p [PathPattern],
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<(&'p PathPattern, String)>> {
        patterns
            .iter()
            .find_map(|pattern| {
                self.first_match(pattern, diagnostics)
                    .map(|hit| hit.map(|path| (pattern, path)))
                    .transpose()
            })
            .transpose()
    }
}

fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::probe::glob::CasePolicy;
    use crate::session::snapshot::{HostSnapshot, SnapshotSession};
    use crate::session::{DirEntry, IpcEntry, TargetIdentity};

    /// Wraps a session and records every directory listing request.
    struct Recording<S> {
        inner: S,
        requests: RefCell<Vec<String>>,
    }

    impl<S: Session> Recording<S> {
        fn new(inner: S) -> Self {
            Self {
                inner,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl<S: Session> Session for Recording<S> {
        fn identity(&self) -> &TargetIdentity {
            self.inner.identity()
        }

        fn list_directory(
            &self,
            share: &str,
            path: &str,
        ) -> std::result::Result<Vec<DirEntry>, ListingError> {
            self.requests.borrow_mut().push(path.to_string());
            self.inner.list_directory(share, path)
        }

        fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
            self.inner.list_ipc_endpoints()
        }
    }

    fn host(paths: &[&str]) -> HostSnapshot {
        let mut snapshot = HostSnapshot::default();
        snapshot.identity = TargetIdentity::new("10.0.0.5");
        let share = snapshot.shares.entry("C$".to_string()).or_default();
        for path in paths {
            share.insert_path(path);
        }
        snapshot
    }

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw, CasePolicy::Insensitive).unwrap()
    }

    fn resolve(session: &impl Session, raw: &str) -> (bool, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let hit = PathResolver::new(session, ResolveOptions::default())
            .resolve(&pattern(raw), &mut diagnostics)
            .unwrap();
        (hit, diagnostics)
    }

    #[test]
    fn wildcard_leaf_resolves() {
        let session = SnapshotSession::new(host(&[
            r"Program Files\KeePass2",
            r"Program Files\Other",
        ]));
        let mut diagnostics = Diagnostics::new();
        let hit = PathResolver::new(&session, ResolveOptions::default())
            .first_match(&pattern(r"C:\Program Files\KeePass*"), &mut diagnostics)
            .unwrap();
        assert_eq!(hit.as_deref(), Some(r"Program Files\KeePass2"));
        assert_eq!(diagnostics.listing_count(), 2);
    }

    #[test]
    fn literal_pattern_is_existence_check() {
        let session = SnapshotSession::new(host(&[r"Program Files\Bitwarden"]));
        assert!(resolve(&session, r"C:\Program Files\Bitwarden").0);
        assert!(!resolve(&session, r"C:\Program Files\Dashlane").0);
    }

    #[test]
    fn nested_wildcards_resolve_through_any_branch() {
        let session = SnapshotSession::new(host(&[
            r"Users\alice\AppData\Roaming",
            r"Users\bob\AppData\Local\1Password",
        ]));
        assert!(resolve(&session, r"C:\Users\*\AppData\*\1Password").0);
    }

    #[test]
    fn dead_second_wildcard_level_is_no_match() {
        let session = SnapshotSession::new(host(&[
            r"Users\alice\AppData\Roaming\Mozilla",
            r"Users\bob\AppData\Local\Google",
        ]));
        assert!(!resolve(&session, r"C:\Users\*\AppData\*\1Password").0);
    }

    #[test]
    fn empty_first_wildcard_stops_before_deeper_listings() {
        let session = Recording::new(SnapshotSession::new(host(&[r"Program Files\Other"])));
        let (hit, _) = resolve(&session, r"C:\Program Files\KeePass*\Plugins\*");
        assert!(!hit);
        assert_eq!(session.requests(), vec![String::new(), "Program Files".to_string()]);
    }

    #[test]
    fn failing_branch_does_not_hide_sibling_match() {
        let mut snapshot = host(&[
            r"Users\alice\AppData\Local",
            r"Users\bob\AppData\Local\Bitwarden",
        ]);
        snapshot.denied.push(r"C$\Users\alice".to_string());
        let session = SnapshotSession::new(snapshot);

        let (hit, diagnostics) = resolve(&session, r"C:\Users\*\AppData\Local\Bitwarden");
        assert!(hit);
        assert_eq!(diagnostics.failures().len(), 1);
        assert_eq!(diagnostics.failures()[0].path, r"Users\alice");
        assert_eq!(diagnostics.failures()[0].kind, "access_denied");
    }

    #[test]
    fn childless_directory_ends_resolution_quietly() {
        let session = SnapshotSession::new(host(&[r"Program Files\KeePass2"]));
        let (hit, diagnostics) = resolve(&session, r"C:\Program Files\KeePass2\missing\x");
        assert!(!hit);
        assert!(diagnostics.failures().is_empty());
    }

    #[test]
    fn session_loss_aborts_resolution() {
        let mut snapshot = host(&[r"Program Files\KeePass2"]);
        snapshot.disconnected = true;
        let session = SnapshotSession::new(snapshot);
        let mut diagnostics = Diagnostics::new();
        let err = PathResolver::new(&session, ResolveOptions::default())
            .resolve(&pattern(r"C:\Program Files\KeePass*"), &mut diagnostics)
            .unwrap_err();
        assert_eq!(err.code(), "PRB-3001");
    }

    #[test]
    fn dot_entries_never_match_wildcards() {
        let mut snapshot = host(&[r"Users\.\AppData\Local\Bitwarden"]);
        snapshot
            .shares
            .get_mut("C$")
            .unwrap()
            .insert_path(r"Users\..\AppData\Local\Bitwarden");
        let session = SnapshotSession::new(snapshot);
        assert!(!resolve(&session, r"C:\Users\*\AppData\Local\Bitwarden").0);

        let mut diagnostics = Diagnostics::new();
        let permissive = PathResolver::new(
            &session,
            ResolveOptions {
                skip_dot_entries: false,
            },
        );
        assert!(
            permissive
                .resolve(&pattern(r"C:\Users\*\AppData\Local\Bitwarden"), &mut diagnostics)
                .unwrap()
        );
    }

    #[test]
    fn first_matching_stops_at_first_resolving_pattern() {
        let session = Recording::new(SnapshotSession::new(host(&[
            r"Program Files\1Password",
            r"Program Files (x86)\1Password",
        ])));
        let patterns = vec![
            pattern(r"C:\Program Files\1Password"),
            pattern(r"C:\Program Files (x86)\1Password"),
        ];
        let mut diagnostics = Diagnostics::new();
        let (matched, path) = PathResolver::new(&session, ResolveOptions::default())
            .first_matching(&patterns, &mut diagnostics)
            .unwrap()
            .unwrap();
        assert_eq!(matched.as_str(), r"C:\Program Files\1Password");
        assert_eq!(path, r"Program Files\1Password");
        assert!(
            !session
                .requests()
                .iter()
                .any(|p| p.starts_with("Program Files (x86)"))
        );
    }

    #[test]
    fn duplicate_children_are_deduplicated() {
        struct Duplicating;
        impl Session for Duplicating {
            fn identity(&self) -> &TargetIdentity {
                static IDENTITY: std::sync::OnceLock<TargetIdentity> = std::sync::OnceLock::new();
                IDENTITY.get_or_init(|| TargetIdentity::new("dup"))
            }
            fn list_directory(
                &self,
                _share: &str,
                path: &str,
            ) -> std::result::Result<Vec<DirEntry>, ListingError> {
                match path {
                    "" => Ok(vec![DirEntry::dir("Users"), DirEntry::dir("Users")]),
                    "Users" => Ok(vec![DirEntry::dir("alice")]),
                    _ => Ok(Vec::new()),
                }
            }
            fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
                Ok(Vec::new())
            }
        }

        let (hit, diagnostics) = resolve(&Duplicating, r"C:\User?\alice");
        assert!(hit);
        // One root listing, then a single listing of the deduplicated "Users".
        assert_eq!(diagnostics.listing_count(), 2);
    }
}

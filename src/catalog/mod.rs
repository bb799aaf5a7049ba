//! Signature catalog: which products to look for and how to recognise them.
//!
//! Signatures are plain data (product name, path patterns, pipe identifier
//! substrings). A [`Catalog`] is the validated, compiled, immutable form used
//! by the probe. It is built once per run and shared read-only, including
//! across parallel host probes.
//!
//! Catalog files use a versioned schema, in TOML or JSON:
//!
//! ```toml
//! schema_version = 1
//!
//! [[signatures]]
//! name = "KeePassXC"
//! paths = ['C:\Program Files\KeePassXC']
//! pipes = ["keepassxc"]
//! ```

#![allow(missing_docs)]

pub mod builtin;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::CatalogConfig;
use crate::core::errors::{ProbeError, Result};
use crate::probe::glob::CasePolicy;
use crate::probe::pattern::PathPattern;

/// Current catalog schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// One product's detection signature, as written by a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Product name; unique within a catalog.
    pub name: String,
    /// Path patterns, tried in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    /// Substrings identifying the product's IPC endpoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            pipes: Vec::new(),
            notes: None,
        }
    }

    #[must_use]
    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.paths = paths.iter().map(|p| (*p).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_pipes(mut self, pipes: &[&str]) -> Self {
        self.pipes = pipes.iter().map(|p| (*p).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// On-disk catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSchema {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl SignatureSchema {
    fn check_version(self) -> Result<Self> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(ProbeError::UnsupportedSchema {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(self)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str::<Self>(raw)?.check_version()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str::<Self>(raw)?.check_version()
    }

    /// Load from file, picking the format by extension (`.json`, else TOML).
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ProbeError::io(path, source))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_toml(&raw)
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| ProbeError::Serialization {
            context: "toml",
            details: err.to_string(),
        })
    }
}

/// A signature with compiled patterns and normalised identifiers.
#[derive(Debug, Clone)]
pub struct CompiledSignature {
    name: String,
    patterns: Vec<PathPattern>,
    pipes: Vec<String>,
    pipes_lower: Vec<String>,
    notes: Option<String>,
}

impl CompiledSignature {
    fn compile(signature: &Signature, policy: CasePolicy) -> Result<Self> {
        let name = signature.name.trim();
        if name.is_empty() {
            return Err(ProbeError::InvalidSignature {
                product: signature.name.clone(),
                details: "product name is empty".to_string(),
            });
        }
        if signature.paths.is_empty() && signature.pipes.is_empty() {
            return Err(ProbeError::InvalidSignature {
                product: name.to_string(),
                details: "signature has neither paths nor pipes".to_string(),
            });
        }
        if signature.pipes.iter().any(|pipe| pipe.trim().is_empty()) {
            // An empty substring would match every endpoint.
            return Err(ProbeError::InvalidSignature {
                product: name.to_string(),
                details: "pipe identifiers must be non-empty".to_string(),
            });
        }

        let patterns = signature
            .paths
            .iter()
            .map(|raw| PathPattern::parse(raw, policy))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            patterns,
            pipes: signature.pipes.clone(),
            pipes_lower: signature.pipes.iter().map(|p| p.to_lowercase()).collect(),
            notes: signature.notes.clone(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Pipe identifiers as configured.
    #[must_use]
    pub fn pipes(&self) -> &[String] {
        &self.pipes
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// First configured identifier contained in `endpoint_lower`, which must
    /// already be lowercased.
    #[must_use]
    pub fn matching_pipe(&self, endpoint_lower: &str) -> Option<&str> {
        self.pipes_lower
            .iter()
            .position(|needle| endpoint_lower.contains(needle.as_str()))
            .map(|idx| self.pipes[idx].as_str())
    }
}

/// Validated, immutable, ordered set of signatures.
#[derive(Debug, Clone)]
pub struct Catalog {
    policy: CasePolicy,
    signatures: Vec<CompiledSignature>,
}

impl Catalog {
    /// Compile signatures. Product names must be unique (ignoring case) and
    /// every pattern must parse.
    pub fn compile(signatures: &[Signature], policy: CasePolicy) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(signatures.len());
        for signature in signatures {
            let sig = CompiledSignature::compile(signature, policy)?;
            if !seen.insert(sig.name.to_lowercase()) {
                return Err(ProbeError::DuplicateProduct {
                    name: sig.name.clone(),
                });
            }
            compiled.push(sig);
        }
        Ok(Self {
            policy,
            signatures: compiled,
        })
    }

    /// Catalog of the bundled signatures only.
    pub fn builtin(policy: CasePolicy) -> Result<Self> {
        Self::compile(&builtin::builtin_signatures(), policy)
    }

    /// Build the catalog described by configuration: bundled signatures (if
    /// enabled) followed by every configured catalog file, in order.
    pub fn from_config(config: &CatalogConfig, policy: CasePolicy) -> Result<Self> {
        let mut signatures = if config.builtin {
            builtin::builtin_signatures()
        } else {
            Vec::new()
        };
        for file in &config.files {
            signatures.extend(SignatureSchema::from_file(file)?.signatures);
        }
        if signatures.is_empty() {
            return Err(ProbeError::InvalidConfig {
                details: "catalog is empty: enable catalog.builtin or add catalog.files"
                    .to_string(),
            });
        }
        Self::compile(&signatures, policy)
    }

    #[must_use]
    pub fn signatures(&self) -> &[CompiledSignature] {
        &self.signatures
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CompiledSignature> {
        self.signatures
            .iter()
            .find(|sig| sig.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub const fn policy(&self) -> CasePolicy {
        self.policy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ProbeError, Result};

/// Full probe configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeConfig,
    pub catalog: CatalogConfig,
    pub targets: Vec<TargetConfig>,
    pub paths: PathsConfig,
}

/// Resolution and scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Match path segments without regard to case, as Windows filesystems do.
    pub case_insensitive_globs: bool,
    /// Hosts probed concurrently.
    pub parallelism: usize,
    /// Drop `.` and `..` from directory listings before matching.
    pub skip_dot_entries: bool,
}

/// Where signatures come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the bundled password-manager signatures.
    pub builtin: bool,
    /// Extra catalog files (TOML or JSON), appended in order.
    pub files: Vec<PathBuf>,
}

/// One host to probe and how to reach its shares.
///
/// Exactly one backing is allowed: a recorded `snapshot` file, or a set of
/// locally mounted `shares` (plus an optional `ipc_dir` standing in for the
/// pipe namespace).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub kerberos: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub shares: BTreeMap<String, PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipc_dir: Option<PathBuf>,
}

/// Filesystem paths used by approbe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map_or(2, std::num::NonZeroUsize::get);
        Self {
            case_insensitive_globs: true,
            parallelism: (cpus / 2).max(1),
            skip_dot_entries: true,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            files: Vec::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[PRB-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("approbe").join("config.toml");
        let data = home_dir.join(".local").join("share").join("approbe");
        Self {
            config_file: cfg,
            jsonl_log: data.join("probe.jsonl"),
        }
    }
}

impl TargetConfig {
    /// Target backed by a snapshot file.
    pub fn from_snapshot(host: impl Into<String>, snapshot: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            snapshot: Some(snapshot.into()),
            ..Self::default()
        }
    }

    /// Name used before a session exists: the host, else the snapshot file
    /// stem.
    #[must_use]
    pub fn display_label(&self) -> String {
        let host = self.host.trim();
        if !host.is_empty() {
            return host.to_string();
        }
        self.snapshot
            .as_deref()
            .and_then(Path::file_stem)
            .map_or_else(|| "unnamed".to_string(), |stem| stem.to_string_lossy().into_owned())
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| ProbeError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(ProbeError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without env overrides or validation.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PROBE_CASE_INSENSITIVE_GLOBS") {
            self.probe.case_insensitive_globs =
                parse_env_bool("PROBE_CASE_INSENSITIVE_GLOBS", &raw)?;
        }
        if let Some(raw) = lookup("PROBE_PARALLELISM") {
            self.probe.parallelism = parse_env_usize("PROBE_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("PROBE_SKIP_DOT_ENTRIES") {
            self.probe.skip_dot_entries = parse_env_bool("PROBE_SKIP_DOT_ENTRIES", &raw)?;
        }
        if let Some(raw) = lookup("PROBE_BUILTIN_CATALOG") {
            self.catalog.builtin = parse_env_bool("PROBE_BUILTIN_CATALOG", &raw)?;
        }
        if let Some(raw) = lookup("PROBE_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Resolve relative file references against the config file's directory
    /// and canonicalise share names (`c:` and `c$` both become `C$`).
    fn normalize(&mut self) {
        let base = self
            .paths
            .config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() && !base.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        };

        for file in &mut self.catalog.files {
            anchor(file);
        }
        for target in &mut self.targets {
            target.host = target.host.trim().to_string();
            if let Some(snapshot) = target.snapshot.as_mut() {
                anchor(snapshot);
            }
            if let Some(ipc_dir) = target.ipc_dir.as_mut() {
                anchor(ipc_dir);
            }
            let shares = std::mem::take(&mut target.shares);
            target.shares = shares
                .into_iter()
                .map(|(name, mut root)| {
                    anchor(&mut root);
                    (normalize_share_name(&name), root)
                })
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.parallelism == 0 {
            return Err(ProbeError::InvalidConfig {
                details: "probe.parallelism must be >= 1".to_string(),
            });
        }

        for (index, target) in self.targets.iter().enumerate() {
            if target.host.trim().is_empty() {
                return Err(ProbeError::InvalidConfig {
                    details: format!("targets[{index}].host must not be empty"),
                });
            }
            match (target.snapshot.is_some(), target.shares.is_empty()) {
                (true, false) => {
                    return Err(ProbeError::InvalidConfig {
                        details: format!(
                            "target {}: set either snapshot or shares, not both",
                            target.host
                        ),
                    });
                }
                (false, true) => {
                    return Err(ProbeError::InvalidConfig {
                        details: format!(
                            "target {}: one of snapshot or shares is required",
                            target.host
                        ),
                    });
                }
                _ => {}
            }
            if target.snapshot.is_some() && target.ipc_dir.is_some() {
                return Err(ProbeError::InvalidConfig {
                    details: format!(
                        "target {}: ipc_dir only applies to mounted shares",
                        target.host
                    ),
                });
            }
            if let Some(name) = target.shares.keys().find(|name| name.trim().is_empty()) {
                return Err(ProbeError::InvalidConfig {
                    details: format!("target {}: invalid share name '{name}'", target.host),
                });
            }
        }

        Ok(())
    }
}

/// Canonical share name: uppercase, drive letters written as admin shares.
#[must_use]
pub fn normalize_share_name(name: &str) -> String {
    let trimmed = name.trim();
    let upper = trimmed.to_ascii_uppercase();
    match upper.strip_suffix(':') {
        Some(drive) if drive.len() == 1 && drive.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("{drive}$")
        }
        _ => upper,
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|error| ProbeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| ProbeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{Config, ProbeError, TargetConfig, normalize_share_name};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.probe.case_insensitive_globs);
        assert!(cfg.probe.skip_dot_entries);
        assert!(cfg.probe.parallelism >= 1);
        assert!(cfg.catalog.builtin);
    }

    #[test]
    fn zero_parallelism_rejected() {
        let mut cfg = Config::default();
        cfg.probe.parallelism = 0;
        let err = cfg.validate().expect_err("expected parallelism error");
        assert!(err.to_string().contains("parallelism"));
    }

    #[test]
    fn parses_targets_from_toml() {
        let cfg = Config::from_toml_str(
            r#"
            [probe]
            parallelism = 3

            [[targets]]
            host = "10.0.0.5"
            hostname = "ws01"
            domain = "corp.local"
            kerberos = true
            snapshot = "ws01.json"

            [[targets]]
            host = "10.0.0.6"
            ipc_dir = "/mnt/ws02-pipes"

            [targets.shares]
            "C$" = "/mnt/ws02-c"
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.probe.parallelism, 3);
        assert!(cfg.probe.case_insensitive_globs);
        assert_eq!(cfg.targets.len(), 2);
        assert_eq!(cfg.targets[0].hostname.as_deref(), Some("ws01"));
        assert!(cfg.targets[0].kerberos);
        assert_eq!(
            cfg.targets[1].shares.get("C$"),
            Some(&PathBuf::from("/mnt/ws02-c"))
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn target_needs_exactly_one_backing() {
        let mut cfg = Config::default();
        cfg.targets.push(TargetConfig {
            host: "10.0.0.9".to_string(),
            ..TargetConfig::default()
        });
        let err = cfg.validate().expect_err("target without backing");
        assert!(err.to_string().contains("required"));

        cfg.targets[0].snapshot = Some(PathBuf::from("a.json"));
        cfg.targets[0]
            .shares
            .insert("C$".to_string(), PathBuf::from("/mnt/c"));
        let err = cfg.validate().expect_err("target with both backings");
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn blank_host_rejected() {
        let mut cfg = Config::default();
        cfg.targets.push(TargetConfig::from_snapshot("  ", "x.json"));
        let err = cfg.validate().expect_err("blank host");
        assert!(matches!(err, ProbeError::InvalidConfig { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("PROBE_CASE_INSENSITIVE_GLOBS", "false"),
            ("PROBE_PARALLELISM", "7"),
            ("PROBE_BUILTIN_CATALOG", "false"),
            ("PROBE_JSONL_LOG", "/tmp/approbe/custom.jsonl"),
        ]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");

        assert!(!cfg.probe.case_insensitive_globs);
        assert_eq!(cfg.probe.parallelism, 7);
        assert!(!cfg.catalog.builtin);
        assert!(cfg.probe.skip_dot_entries);
        assert_eq!(
            cfg.paths.jsonl_log,
            PathBuf::from("/tmp/approbe/custom.jsonl")
        );
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("PROBE_SKIP_DOT_ENTRIES", "sometimes")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid bool should fail");
        match err {
            ProbeError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("PROBE_SKIP_DOT_ENTRIES"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn normalize_anchors_relative_paths_and_share_names() {
        let mut cfg = Config::default();
        cfg.paths.config_file = PathBuf::from("/etc/approbe/config.toml");
        cfg.catalog.files.push(PathBuf::from("extra.toml"));
        cfg.targets
            .push(TargetConfig::from_snapshot("10.0.0.5", "snaps/ws01.json"));
        let mut mounted = TargetConfig {
            host: "10.0.0.6".to_string(),
            ..TargetConfig::default()
        };
        mounted
            .shares
            .insert("c:".to_string(), PathBuf::from("/mnt/c"));
        cfg.targets.push(mounted);

        cfg.normalize();

        assert_eq!(cfg.catalog.files[0], Path::new("/etc/approbe/extra.toml"));
        assert_eq!(
            cfg.targets[0].snapshot.as_deref(),
            Some(Path::new("/etc/approbe/snaps/ws01.json"))
        );
        assert_eq!(
            cfg.targets[1].shares.get("C$"),
            Some(&PathBuf::from("/mnt/c"))
        );
    }

    #[test]
    fn display_label_falls_back_to_snapshot_stem() {
        assert_eq!(TargetConfig::from_snapshot("10.0.0.5", "a/ws01.json").display_label(), "10.0.0.5");
        assert_eq!(TargetConfig::from_snapshot("", "a/ws01.json").display_label(), "ws01");
        assert_eq!(TargetConfig::default().display_label(), "unnamed");
    }

    #[test]
    fn share_names_canonicalise() {
        assert_eq!(normalize_share_name("c:"), "C$");
        assert_eq!(normalize_share_name("d$"), "D$");
        assert_eq!(normalize_share_name(" Data "), "DATA");
        assert_eq!(normalize_share_name("ab:"), "AB:");
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/definitely/not/here/approbe.toml")))
            .expect_err("explicit missing path should fail");
        assert_eq!(err.code(), "PRB-1002");
    }

    #[test]
    fn load_reads_file_and_validates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[targets]]\nhost = \"10.0.0.5\"\nsnapshot = \"ws01.json\"\n",
        )
        .expect("write config");

        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.paths.config_file, path);
        assert_eq!(
            cfg.targets[0].snapshot.as_deref(),
            Some(dir.path().join("ws01.json").as_path())
        );
    }

    #[test]
    fn stable_hash_deterministic() {
        let cfg = Config::default();
        let a = cfg.stable_hash().expect("hash");
        let b = cfg.stable_hash().expect("hash");
        assert_eq!(a, b);
        let mut modified = cfg.clone();
        modified.probe.skip_dot_entries = false;
        assert_ne!(a, modified.stable_hash().expect("hash"));
    }
}

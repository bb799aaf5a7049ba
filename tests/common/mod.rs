#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use app_presence_probe::session::snapshot::{HostSnapshot, SnapshotSession};
use app_presence_probe::session::{
    DirEntry, IpcEntry, ListingError, Session, TargetIdentity,
};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_approbe") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "approbe.exe" } else { "approbe" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve approbe binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

/// Run the binary with an isolated HOME and activity log, plus `env`.
pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("approbe-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let stamp = format!("{}-{}", sanitize(case_name), now_millis());
    let log_path = root.join(format!("{stamp}.log"));
    let home = root.join(format!("{stamp}-home"));
    fs::create_dir_all(&home).expect("create isolated HOME");
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", &home)
        .env("PROBE_JSONL_LOG", home.join("probe.jsonl"))
        .env_remove("PROBE_OUTPUT_FORMAT")
        .env_remove("PROBE_PARALLELISM")
        .env_remove("PROBE_CASE_INSENSITIVE_GLOBS")
        .env_remove("PROBE_BUILTIN_CATALOG")
        .env("RUST_BACKTRACE", "1");
    for (name, value) in env {
        command.env(name, value);
    }
    let output = command.output().expect("execute approbe command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_content = format!(
        "case={case_name}\nbin={}\nargs={args:?}\nenv={env:?}\nstatus={}\n\
         ----- stdout -----\n{stdout}\n----- stderr -----\n{stderr}\n",
        bin_path.display(),
        output.status,
    );
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Snapshot of a host with the given `C$`-relative directories and pipes.
pub fn host(label: &str, paths: &[&str], pipes: &[&str]) -> HostSnapshot {
    let mut snapshot = HostSnapshot {
        identity: TargetIdentity::new(label),
        ipc: pipes.iter().map(|p| (*p).to_string()).collect(),
        ..HostSnapshot::default()
    };
    let share = snapshot.shares.entry("C$".to_string()).or_default();
    for path in paths {
        share.insert_path(path);
    }
    snapshot
}

/// Write a snapshot to `dir/name.json` and return its path.
pub fn write_snapshot(dir: &Path, name: &str, snapshot: &HostSnapshot) -> PathBuf {
    let path = dir.join(format!("{name}.json"));
    fs::write(&path, serde_json::to_string_pretty(snapshot).expect("serialize snapshot"))
        .expect("write snapshot");
    path
}

/// In-memory session that records every request and can inject failures
/// for chosen share-relative paths.
pub struct RecordingSession {
    inner: SnapshotSession,
    failures: BTreeMap<String, ListingError>,
    listings: Mutex<Vec<String>>,
    ipc_listings: Mutex<usize>,
}

impl RecordingSession {
    pub fn new(snapshot: HostSnapshot) -> Self {
        Self {
            inner: SnapshotSession::new(snapshot),
            failures: BTreeMap::new(),
            listings: Mutex::new(Vec::new()),
            ipc_listings: Mutex::new(0),
        }
    }

    /// Make listings of `share\path` fail with `error`.
    pub fn failing(mut self, share: &str, path: &str, error: ListingError) -> Self {
        self.failures.insert(qualify(share, path), error);
        self
    }

    /// Every directory listing requested so far, as `SHARE\path`.
    pub fn listings(&self) -> Vec<String> {
        self.listings.lock().expect("listing log").clone()
    }

    pub fn listed(&self) -> BTreeSet<String> {
        self.listings().into_iter().collect()
    }

    pub fn ipc_listings(&self) -> usize {
        *self.ipc_listings.lock().expect("ipc counter")
    }
}

fn qualify(share: &str, path: &str) -> String {
    if path.is_empty() {
        share.to_ascii_uppercase()
    } else {
        format!("{}\\{path}", share.to_ascii_uppercase())
    }
}

impl Session for RecordingSession {
    fn identity(&self) -> &TargetIdentity {
        self.inner.identity()
    }

    fn list_directory(&self, share: &str, path: &str) -> Result<Vec<DirEntry>, ListingError> {
        let key = qualify(share, path);
        self.listings.lock().expect("listing log").push(key.clone());
        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }
        self.inner.list_directory(share, path)
    }

    fn list_ipc_endpoints(&self) -> Result<Vec<IpcEntry>, ListingError> {
        *self.ipc_listings.lock().expect("ipc counter") += 1;
        if let Some(error) = self.failures.get("IPC$") {
            return Err(error.clone());
        }
        self.inner.list_ipc_endpoints()
    }
}

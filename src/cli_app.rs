//! Top-level CLI definition and dispatch.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use app_presence_probe::catalog::{Catalog, SignatureSchema};
use app_presence_probe::core::config::{Config, TargetConfig};
use app_presence_probe::core::errors::ProbeError;
use app_presence_probe::logger::ActivityLog;
use app_presence_probe::logger::jsonl::{JsonlConfig, JsonlWriter};
use app_presence_probe::probe::detect::{Evidence, ProbeOptions};
use app_presence_probe::probe::fleet::{Fleet, HostJob, HostOutcome};
use app_presence_probe::probe::glob::CasePolicy;
use app_presence_probe::probe::pattern::PathPattern;
use app_presence_probe::probe::report::{
    FleetSummary, NONE_DETECTED, detection_line, outcome_json, report_lines,
};
use app_presence_probe::probe::resolver::{Diagnostics, PathResolver, ResolveOptions};
use app_presence_probe::session::open_target;

/// Remote application presence probe.
#[derive(Debug, Parser)]
#[command(
    name = "approbe",
    author,
    version,
    about = "Detect installed and running desktop applications on remote hosts",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity (listing diagnostics).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (detections and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Probe targets for known applications.
    Scan(ScanArgs),
    /// Inspect or validate signature catalogs.
    Catalog(CatalogArgs),
    /// Parse a path pattern and optionally resolve it against a target.
    CheckPattern(CheckPatternArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
}

/// Ad-hoc target selection shared by `scan` and `check-pattern`.
#[derive(Debug, Clone, Args, Default)]
struct TargetArgs {
    /// Probe a captured host snapshot (repeatable).
    #[arg(long, value_name = "FILE", conflicts_with = "mount")]
    snapshot: Vec<PathBuf>,
    /// Map a share to a local directory, e.g. `C$=/mnt/ws01/c` (repeatable).
    #[arg(long, value_name = "SHARE=PATH", value_parser = parse_mount)]
    mount: Vec<(String, PathBuf)>,
    /// Directory listing the IPC namespace of a mounted target.
    #[arg(long, value_name = "PATH", requires = "mount")]
    ipc_dir: Option<PathBuf>,
    /// Host label for an ad-hoc target.
    #[arg(long, value_name = "HOST")]
    host: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Extra catalog file (repeatable).
    #[arg(long = "catalog", value_name = "FILE")]
    catalogs: Vec<PathBuf>,
    /// Skip the bundled signatures.
    #[arg(long)]
    no_builtin: bool,
    /// Match path segments case-sensitively.
    #[arg(long)]
    case_sensitive: bool,
    /// Hosts probed concurrently.
    #[arg(long, value_name = "N")]
    parallelism: Option<usize>,
    /// Do not write the JSONL activity log.
    #[arg(long)]
    no_log: bool,
}

#[derive(Debug, Clone, Args)]
struct CatalogArgs {
    #[command(subcommand)]
    command: Option<CatalogCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum CatalogCommand {
    /// List the effective signatures.
    List,
    /// Show one signature.
    Show {
        /// Product name (case-insensitive).
        name: String,
    },
    /// Validate a catalog file without scanning.
    Validate {
        /// Catalog file (TOML or JSON).
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CheckPatternArgs {
    /// Pattern such as `C:\Program Files\KeePass*`.
    pattern: String,
    #[command(flatten)]
    target: TargetArgs,
    /// Match path segments case-sensitively.
    #[arg(long)]
    case_sensitive: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include build metadata.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Some hosts failed, others were probed.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<ProbeError> for CliError {
    fn from(err: ProbeError) -> Self {
        if err.is_configuration() {
            Self::User(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::Catalog(args) => run_catalog(cli, args),
        Command::CheckPattern(args) => run_check_pattern(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(parallelism) = args.parallelism {
        if parallelism == 0 {
            return Err(CliError::User("--parallelism must be >= 1".to_string()));
        }
        config.probe.parallelism = parallelism;
    }
    if args.case_sensitive {
        config.probe.case_insensitive_globs = false;
    }
    if args.no_builtin {
        config.catalog.builtin = false;
    }
    config.catalog.files.extend(args.catalogs.iter().cloned());

    let policy = CasePolicy::from_insensitive_flag(config.probe.case_insensitive_globs);
    let catalog = Catalog::from_config(&config.catalog, policy)?;

    let targets = match adhoc_targets(&args.target)? {
        Some(targets) => targets,
        None => config.targets.clone(),
    };
    if targets.is_empty() {
        return Err(CliError::User(
            "no targets: pass --snapshot/--mount or add [[targets]] to the config".to_string(),
        ));
    }

    let mut log = if args.no_log {
        ActivityLog::disabled()
    } else {
        ActivityLog::new(JsonlWriter::open(JsonlConfig::at(&config.paths.jsonl_log)))
    };
    let hash = config
        .stable_hash()
        .map_err(|e| CliError::Internal(e.to_string()))?;
    log.config_loaded(
        &config.paths.config_file.to_string_lossy(),
        &hash,
        catalog.len(),
    );
    let jobs: Vec<HostJob> = targets.into_iter().map(HostJob::from_target).collect();
    for job in &jobs {
        log.probe_start(job.label());
    }

    let options = ProbeOptions {
        resolve: resolve_options(&config),
    };
    let fleet = Fleet::new(Arc::new(catalog), options, config.probe.parallelism);
    let outcomes = fleet.run(jobs);

    let mode = output_mode(cli);
    for outcome in &outcomes {
        log.host_outcome(outcome);
        match mode {
            OutputMode::Human => print_outcome_human(cli, outcome),
            OutputMode::Json => write_json_line(&outcome_json(outcome))?,
        }
    }
    log.flush();

    let summary = FleetSummary::from_outcomes(&outcomes);
    match mode {
        OutputMode::Human => {
            if !cli.quiet && (outcomes.len() > 1 || cli.verbose) {
                println!("{}", summary.line().bold());
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({ "command": "scan", "summary": summary }))?;
        }
    }

    if summary.failed_hosts == 0 {
        Ok(())
    } else if summary.failed_hosts == summary.hosts {
        Err(CliError::Runtime(format!(
            "all {} host(s) failed",
            summary.hosts
        )))
    } else {
        Err(CliError::Partial(format!(
            "{} of {} host(s) failed",
            summary.failed_hosts, summary.hosts
        )))
    }
}

fn print_outcome_human(cli: &Cli, outcome: &HostOutcome) {
    let report = match &outcome.result {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{} {}: {err}", "error:".red().bold(), outcome.label);
            return;
        }
    };

    if cli.quiet {
        for detection in &report.detections {
            println!("{}: {}", report.target, detection_line(detection));
        }
        return;
    }

    println!("{}", format!("[{}]", report.target).bold());
    let detection_count = report.detections.len();
    for (index, line) in report_lines(report, cli.verbose).into_iter().enumerate() {
        if index < detection_count {
            let detection = &report.detections[index];
            if detection.evidence == Evidence::Installed {
                println!("  {}", line.green());
            } else {
                println!("  {}", line.red().bold());
            }
        } else if line == NONE_DETECTED {
            println!("  {}", line.dimmed());
        } else {
            println!("  {}", line.yellow());
        }
    }
}

/// Targets named on the command line, if any.
fn adhoc_targets(args: &TargetArgs) -> Result<Option<Vec<TargetConfig>>, CliError> {
    if !args.snapshot.is_empty() {
        if args.host.is_some() && args.snapshot.len() > 1 {
            return Err(CliError::User(
                "--host labels a single target; it cannot be combined with several --snapshot files"
                    .to_string(),
            ));
        }
        let host = args.host.clone().unwrap_or_default();
        return Ok(Some(
            args.snapshot
                .iter()
                .map(|path| TargetConfig::from_snapshot(host.clone(), path.clone()))
                .collect(),
        ));
    }
    if args.mount.is_empty() {
        return Ok(None);
    }

    let mut shares = BTreeMap::new();
    for (share, root) in &args.mount {
        if shares.insert(share.clone(), root.clone()).is_some() {
            return Err(CliError::User(format!("share {share} mounted twice")));
        }
    }
    Ok(Some(vec![TargetConfig {
        host: args.host.clone().unwrap_or_else(|| "localhost".to_string()),
        shares,
        ipc_dir: args.ipc_dir.clone(),
        ..TargetConfig::default()
    }]))
}

fn resolve_options(config: &Config) -> ResolveOptions {
    ResolveOptions {
        skip_dot_entries: config.probe.skip_dot_entries,
    }
}

fn parse_mount(raw: &str) -> Result<(String, PathBuf), String> {
    let (share, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SHARE=PATH, got {raw:?}"))?;
    let share = app_presence_probe::core::config::normalize_share_name(share);
    if share.is_empty() || path.trim().is_empty() {
        return Err(format!("expected SHARE=PATH, got {raw:?}"));
    }
    Ok((share, PathBuf::from(path)))
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

fn run_catalog(cli: &Cli, args: &CatalogArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(CatalogCommand::List) => {
            let catalog = effective_catalog(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    for signature in catalog.signatures() {
                        println!(
                            "{:<16} {} path pattern(s), {} pipe identifier(s)",
                            signature.name().bold(),
                            signature.patterns().len(),
                            signature.pipes().len()
                        );
                    }
                }
                OutputMode::Json => {
                    let signatures: Vec<Value> =
                        catalog.signatures().iter().map(signature_json).collect();
                    write_json_line(&json!({
                        "command": "catalog list",
                        "case_policy": policy_label(catalog.policy()),
                        "signatures": signatures,
                    }))?;
                }
            }
            Ok(())
        }
        Some(CatalogCommand::Show { name }) => {
            let catalog = effective_catalog(cli)?;
            let signature = catalog
                .get(name)
                .ok_or_else(|| CliError::User(format!("no signature named {name:?}")))?;
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", signature.name().bold());
                    for pattern in signature.patterns() {
                        println!("  path  {pattern}");
                    }
                    for pipe in signature.pipes() {
                        println!("  pipe  {pipe}");
                    }
                    if let Some(notes) = signature.notes() {
                        println!("  notes {notes}");
                    }
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "catalog show",
                    "signature": signature_json(signature),
                }))?,
            }
            Ok(())
        }
        Some(CatalogCommand::Validate { file }) => {
            let result = SignatureSchema::from_file(file)
                .and_then(|schema| Catalog::compile(&schema.signatures, CasePolicy::default()));
            match (result, output_mode(cli)) {
                (Ok(catalog), OutputMode::Human) => {
                    println!("Catalog is valid: {} signature(s).", catalog.len());
                    Ok(())
                }
                (Ok(catalog), OutputMode::Json) => write_json_line(&json!({
                    "command": "catalog validate",
                    "valid": true,
                    "path": file.to_string_lossy(),
                    "signatures": catalog.len(),
                })),
                (Err(e), mode) => {
                    if mode == OutputMode::Json {
                        write_json_line(&json!({
                            "command": "catalog validate",
                            "valid": false,
                            "path": file.to_string_lossy(),
                            "error_code": e.code(),
                            "error": e.to_string(),
                        }))?;
                    } else {
                        eprintln!("Catalog is INVALID: {e}");
                    }
                    Err(CliError::User(format!("invalid catalog: {e}")))
                }
            }
        }
    }
}

fn effective_catalog(cli: &Cli) -> Result<Catalog, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let policy = CasePolicy::from_insensitive_flag(config.probe.case_insensitive_globs);
    Ok(Catalog::from_config(&config.catalog, policy)?)
}

fn signature_json(signature: &app_presence_probe::catalog::CompiledSignature) -> Value {
    json!({
        "name": signature.name(),
        "paths": signature.patterns().iter().map(PathPattern::as_str).collect::<Vec<_>>(),
        "pipes": signature.pipes(),
        "notes": signature.notes(),
    })
}

const fn policy_label(policy: CasePolicy) -> &'static str {
    match policy {
        CasePolicy::Insensitive => "insensitive",
        CasePolicy::Sensitive => "sensitive",
    }
}

// ---------------------------------------------------------------------------
// check-pattern
// ---------------------------------------------------------------------------

fn run_check_pattern(cli: &Cli, args: &CheckPatternArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let policy = if args.case_sensitive {
        CasePolicy::Sensitive
    } else {
        CasePolicy::from_insensitive_flag(config.probe.case_insensitive_globs)
    };
    let pattern = PathPattern::parse(&args.pattern, policy)?;

    let target = match adhoc_targets(&args.target)? {
        Some(mut targets) if targets.len() == 1 => targets.pop(),
        Some(_) => {
            return Err(CliError::User(
                "check-pattern takes a single target".to_string(),
            ));
        }
        None => None,
    };

    let resolution = match &target {
        Some(target) => {
            let session = open_target(target)?;
            let mut diagnostics = Diagnostics::new();
            let hit = PathResolver::new(&*session, resolve_options(&config))
                .first_match(&pattern, &mut diagnostics)?;
            Some((session.identity().label(), hit, diagnostics))
        }
        None => None,
    };

    match output_mode(cli) {
        OutputMode::Human => {
            println!("pattern   {pattern}");
            println!("share     {}", pattern.share());
            let segments: Vec<&str> = pattern.segments().iter().map(|s| s.as_str()).collect();
            println!("segments  {}", segments.join(" | "));
            println!("wildcards {}", pattern.wildcard_count());
            if let Some((label, hit, diagnostics)) = &resolution {
                match hit {
                    Some(path) => println!(
                        "{}",
                        format!("match on {label}: {}", pattern.display_path(path)).green()
                    ),
                    None => println!("{}", format!("no match on {label}").dimmed()),
                }
                if cli.verbose {
                    for failure in diagnostics.failures() {
                        println!(
                            "  listing {}\\{} failed ({})",
                            failure.share, failure.path, failure.kind
                        );
                    }
                    println!("  {} listing(s)", diagnostics.listing_count());
                }
            }
        }
        OutputMode::Json => {
            let mut payload = json!({
                "command": "check-pattern",
                "pattern": pattern.as_str(),
                "share": pattern.share(),
                "segments": pattern.segments().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                "wildcards": pattern.wildcard_count(),
            });
            if let Some((label, hit, diagnostics)) = &resolution {
                payload["target"] = json!(label);
                payload["matched"] = json!(hit.is_some());
                payload["match"] = json!(hit.as_deref().map(|p| pattern.display_path(p)));
                payload["listings"] = json!(diagnostics.listing_count());
                payload["failures"] = serde_json::to_value(diagnostics.failures())?;
            }
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config
                    .stable_hash()
                    .map_err(|e| CliError::Internal(e.to_string()))?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Targets: {}", config.targets.len());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "targets": config.targets.len(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": false,
                        "error_code": e.code(),
                        "error": e.to_string(),
                    }))?,
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// version + output helpers
// ---------------------------------------------------------------------------

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("approbe {version}");
            if args.verbose || cli.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "binary": "approbe",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            }))?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("PROBE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "approbe",
            "--config",
            "/tmp/approbe.toml",
            "--json",
            "--no-color",
            "-v",
            "scan",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["approbe", "scan", "--json", "--no-color", "-q"]);
        assert!(after.is_ok());
    }

    #[test]
    fn parses_every_subcommand() {
        let cases = [
            vec!["approbe", "scan", "--snapshot", "a.json", "--snapshot", "b.json"],
            vec!["approbe", "scan", "--mount", "C$=/mnt/c", "--ipc-dir", "/mnt/pipes"],
            vec!["approbe", "scan", "--catalog", "extra.toml", "--no-builtin"],
            vec!["approbe", "scan", "--parallelism", "4", "--case-sensitive", "--no-log"],
            vec!["approbe", "catalog"],
            vec!["approbe", "catalog", "list"],
            vec!["approbe", "catalog", "show", "keepass"],
            vec!["approbe", "catalog", "validate", "extra.toml"],
            vec!["approbe", "check-pattern", r"C:\Program Files\KeePass*"],
            vec![
                "approbe",
                "check-pattern",
                r"C:\Users\*\AppData",
                "--snapshot",
                "ws01.json",
            ],
            vec!["approbe", "config", "validate"],
            vec!["approbe", "completions", "bash"],
            vec!["approbe", "version", "--verbose"],
        ];
        for case in cases {
            assert!(Cli::try_parse_from(&case).is_ok(), "failed to parse {case:?}");
        }
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["approbe", "-v", "-q", "scan"]).is_err());
    }

    #[test]
    fn snapshot_and_mount_conflict() {
        let parsed = Cli::try_parse_from([
            "approbe",
            "scan",
            "--snapshot",
            "a.json",
            "--mount",
            "C$=/mnt/c",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn mount_values_normalise_share_names() {
        assert_eq!(
            parse_mount("c:=/mnt/c").unwrap(),
            ("C$".to_string(), PathBuf::from("/mnt/c"))
        );
        assert!(parse_mount("/mnt/c").is_err());
        assert!(parse_mount("C$=").is_err());
    }

    #[test]
    fn adhoc_snapshot_targets_keep_order() {
        let args = TargetArgs {
            snapshot: vec![PathBuf::from("b.json"), PathBuf::from("a.json")],
            ..TargetArgs::default()
        };
        let targets = adhoc_targets(&args).unwrap().unwrap();
        let labels: Vec<String> = targets.iter().map(TargetConfig::display_label).collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert!(adhoc_targets(&TargetArgs::default()).unwrap().is_none());
    }

    #[test]
    fn host_label_applies_to_a_single_snapshot_only() {
        let single = TargetArgs {
            snapshot: vec![PathBuf::from("ws01.json")],
            host: Some("10.0.0.5".to_string()),
            ..TargetArgs::default()
        };
        let targets = adhoc_targets(&single).unwrap().unwrap();
        assert_eq!(targets[0].display_label(), "10.0.0.5");

        let several = TargetArgs {
            snapshot: vec![PathBuf::from("ws01.json"), PathBuf::from("ws02.json")],
            host: Some("10.0.0.5".to_string()),
            ..TargetArgs::default()
        };
        let err = adhoc_targets(&several).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn resolve_options_follow_probe_config() {
        let mut config = Config::default();
        assert!(resolve_options(&config).skip_dot_entries);
        config.probe.skip_dot_entries = false;
        assert!(!resolve_options(&config).skip_dot_entries);
    }

    #[test]
    fn exit_codes_follow_contract() {
        assert_eq!(CliError::User(String::new()).exit_code(), 1);
        assert_eq!(CliError::Runtime(String::new()).exit_code(), 2);
        assert_eq!(CliError::Internal(String::new()).exit_code(), 3);
        assert_eq!(CliError::Partial(String::new()).exit_code(), 4);

        let config_err: CliError = ProbeError::DuplicateProduct {
            name: "KeePass".to_string(),
        }
        .into();
        assert_eq!(config_err.exit_code(), 1);
        let session_err: CliError = ProbeError::Session {
            target: "h".to_string(),
            details: "lost".to_string(),
        }
        .into();
        assert_eq!(session_err.exit_code(), 2);
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }
}

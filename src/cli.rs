use crate::{
    config::Config,
    mapping, pipeline, scan, sidecar,
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bibxml-tools")]
#[command(about = "Maintenance and probing utilities for the bibxml data archive")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./bibxml-tools.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a remote API for every archive path and write per-dirname
    /// report and stats artifacts.
    TestPaths {
        /// Base URL of the primary API to probe.
        endpoint_root: String,
        /// Local filesystem root of the document archive.
        archive_root: PathBuf,
        /// Sub-archive to test; repeatable. Omit to test all of them.
        #[arg(long = "dirname")]
        dirnames: Vec<String>,
        /// Output directory for report and stats artifacts.
        #[arg(long)]
        reports_dir: PathBuf,
        /// Shuffle path order; disables resumption.
        #[arg(long)]
        randomize: bool,
        /// Secondary API base URL for diff comparison.
        #[arg(long)]
        reference_root: Option<String>,
        /// Also probe known alias sub-archive names.
        #[arg(long)]
        check_aliases: bool,
        /// Resume at path index N (single dirname, no aliases, no randomize).
        #[arg(long)]
        continue_at: Option<usize>,
        /// Fixed delay in seconds after each probe.
        #[arg(long, default_value_t = 0.0)]
        sleep: f64,
        /// Output detail level (0 = quiet, 1 = progress, 2 = chatty).
        #[arg(long, default_value_t = 1)]
        verbosity: u8,
    },
    /// Convert a YAML path->docid mapping into the JSON import format.
    Convert {
        /// YAML mapping file.
        input: PathBuf,
        /// Sub-archive name to prefix mapped paths with.
        #[arg(long)]
        dirname: String,
        /// Write JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        verbose: bool,
    },
    /// Write or update per-file sidecar metadata from a YAML mapping.
    UpdateSidecars {
        /// YAML mapping file.
        mapping: PathBuf,
        /// Directory holding the archive's XML and sidecar files.
        datadir: PathBuf,
        #[arg(long)]
        verbose: bool,
    },
    /// Normalize W3C docid prefixes in a YAML mapping.
    FixW3c {
        input: PathBuf,
        output: PathBuf,
    },
    /// Scan archive XML files for encoding problems.
    Validate {
        archive_root: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::TestPaths {
            endpoint_root,
            archive_root,
            dirnames,
            reports_dir,
            randomize,
            reference_root,
            check_aliases,
            continue_at,
            sleep,
            verbosity,
        } => {
            let opts = pipeline::TestPathsOptions {
                api_root: endpoint_root.clone(),
                archive_root: archive_root.clone(),
                dirnames: dirnames.clone(),
                reports_dir: reports_dir.clone(),
                reference_root: reference_root.clone(),
                check_aliases: *check_aliases,
                randomize: *randomize,
                continue_at: *continue_at,
                sleep_seconds: *sleep,
                verbosity: *verbosity,
            };
            pipeline::run_test_paths(&cfg, &opts)
        }
        Command::Convert {
            input,
            dirname,
            out,
            verbose,
        } => mapping::run_convert(input, dirname, out.as_deref(), *verbose),
        Command::UpdateSidecars {
            mapping,
            datadir,
            verbose,
        } => {
            let (stats, errors) = sidecar::run_update(mapping, datadir, *verbose, true)?;
            println!("Done");
            println!("unchanged sidecar files: {}", stats.unchanged);
            println!("updated sidecar files: {}", stats.updated);
            println!("new sidecar files: {}", stats.created);
            println!("orphaned sidecar files: {}", errors.orphaned);
            println!("malformed sidecar files: {}", errors.malformed);
            println!("nonexistent paths mapped: {}", errors.nonexistent_mapped);
            Ok(())
        }
        Command::FixW3c { input, output } => mapping::run_fix_w3c(input, output),
        Command::Validate { archive_root } => {
            let scanner = scan::Scanner::new()?;
            let findings = scanner.scan_archive(archive_root, true)?;
            for finding in &findings {
                println!("{}: {}", finding.path, finding.problem);
            }
            Ok(())
        }
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(path) = user {
        return Config::load(path);
    }
    let default = PathBuf::from("bibxml-tools.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file && !cfg.logging.file_path.is_empty() {
        let path = Path::new(&cfg.logging.file_path);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

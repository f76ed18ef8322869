use crate::{
    archive,
    config::Config,
    probe::Prober,
    report::{self, Reporter, RunStats},
    selection,
};
use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Run options for one test-paths invocation, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct TestPathsOptions {
    pub api_root: String,
    pub archive_root: PathBuf,
    pub dirnames: Vec<String>,
    pub reports_dir: PathBuf,
    pub reference_root: Option<String>,
    pub check_aliases: bool,
    pub randomize: bool,
    pub continue_at: Option<usize>,
    pub sleep_seconds: f64,
    pub verbosity: u8,
}

/// Run context for one invocation: created at run start, dropped at run end.
/// All state (prober, counters, report handles) flows through here
/// explicitly; there is no process-wide state.
pub struct PathTester<'a> {
    cfg: &'a Config,
    opts: &'a TestPathsOptions,
}

impl<'a> PathTester<'a> {
    pub fn new(cfg: &'a Config, opts: &'a TestPathsOptions) -> Self {
        Self { cfg, opts }
    }

    /// Resolves the dirnames to test and rejects bad configuration before
    /// any network traffic or file writes.
    pub fn validate(&self) -> Result<Vec<String>> {
        let opts = self.opts;

        if !opts.reports_dir.is_dir() {
            bail!(
                "configuration error: reports directory does not exist: {}",
                opts.reports_dir.display()
            );
        }
        if !opts.archive_root.is_dir() {
            bail!(
                "configuration error: archive root does not exist: {}",
                opts.archive_root.display()
            );
        }

        let dirnames = if opts.dirnames.is_empty() {
            archive::list_dirnames(&opts.archive_root)?
        } else {
            opts.dirnames.clone()
        };
        if dirnames.is_empty() {
            bail!(
                "configuration error: no sub-archives found under {}",
                opts.archive_root.display()
            );
        }

        for dirname in &dirnames {
            if !opts.archive_root.join(dirname).is_dir() {
                bail!(
                    "configuration error: sub-archive {} does not exist under {}",
                    dirname,
                    opts.archive_root.display()
                );
            }
            if opts.check_aliases {
                archive::aliases_for(self.cfg, dirname)?;
            }
        }

        selection::check_resume_compatibility(
            opts.continue_at,
            dirnames.len(),
            opts.check_aliases,
            opts.randomize,
        )?;

        Ok(dirnames)
    }

    /// Tests every dirname in turn. A failure inside one dirname is logged
    /// and the run continues with the next, matching operator expectations
    /// for long sweeps.
    pub fn run(&self, dirnames: &[String]) -> Result<()> {
        for dirname in dirnames {
            match self.run_dirname(dirname) {
                Ok(stats) => {
                    info!(
                        dirname = %dirname,
                        processed = stats.processed,
                        failed = stats.failed,
                        "finished testing sub-archive"
                    );
                }
                Err(err) => {
                    error!("failed to test directory {dirname} ({err:#})");
                }
            }
        }
        Ok(())
    }

    fn run_dirname(&self, dirname: &str) -> Result<RunStats> {
        let opts = self.opts;

        let mut paths = archive::enumerate(&opts.archive_root, dirname)?;
        if opts.check_aliases {
            let aliases = archive::aliases_for(self.cfg, dirname)?;
            if opts.verbosity > 1 {
                info!(
                    "dirname {dirname} unpacked to include {}",
                    aliases.join(", ")
                );
            }
            paths = archive::expand_aliases(self.cfg, dirname, paths)?;
        }

        let selected = selection::apply(paths, opts.randomize, opts.continue_at);
        let start_index = opts.continue_at.unwrap_or(0);

        let mut reporter = self.open_reporter(dirname, start_index)?;
        let prober = Prober::new(self.cfg, &opts.api_root, opts.reference_root.as_deref());

        let progress = self.progress_bar(dirname, selected.len());
        for (offset, path) in selected.iter().enumerate() {
            let outcome = prober.probe(path);
            reporter.record(start_index + offset, path, &outcome)?;
            progress.inc(1);

            if opts.sleep_seconds > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(opts.sleep_seconds));
            }
        }
        progress.finish_and_clear();

        reporter.finish()
    }

    /// Resumed runs append to the existing report; everything else starts
    /// fresh, truncating prior artifacts for the dirname.
    fn open_reporter(&self, dirname: &str, start_index: usize) -> Result<Reporter> {
        let opts = self.opts;
        let (report_path, _) = report::artifact_paths(self.cfg, &opts.reports_dir, dirname);

        if opts.continue_at.is_some() && report_path.is_file() {
            Reporter::resume(self.cfg, &opts.reports_dir, dirname, start_index)
        } else {
            Reporter::create(
                self.cfg,
                &opts.reports_dir,
                dirname,
                &opts.api_root,
                opts.reference_root.as_deref(),
            )
        }
    }

    fn progress_bar(&self, dirname: &str, len: usize) -> ProgressBar {
        if self.opts.verbosity == 0 {
            return ProgressBar::hidden();
        }
        ProgressBar::new(len as u64)
            .with_style(
                ProgressStyle::with_template("{msg} {wide_bar} {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
            .with_message(format!("Checking paths in {dirname}"))
    }
}

/// Convenience wrapper used by the CLI: validate, then run.
pub fn run_test_paths(cfg: &Config, opts: &TestPathsOptions) -> Result<()> {
    let tester = PathTester::new(cfg, opts);
    let dirnames = tester.validate()?;
    tester.run(&dirnames)
}

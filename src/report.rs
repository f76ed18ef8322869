use crate::{
    archive::ArchivePath,
    config::Config,
    probe::{ProbeOutcome, Resolution, method_label},
    util::{html_escape, now_rfc3339},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Aggregate counters for one sub-archive run. Serialized to the stats log
/// after every entry and reloaded from it when resuming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub processed: u64,
    pub resolved_primary: u64,
    pub resolved_alias: u64,
    pub not_found: u64,
    pub transport_error: u64,
    pub failed: u64,
}

impl RunStats {
    pub fn record(&mut self, resolution: Resolution) {
        self.processed += 1;
        match resolution {
            Resolution::ResolvedPrimary => self.resolved_primary += 1,
            Resolution::ResolvedAlias => self.resolved_alias += 1,
            Resolution::NotFound => self.not_found += 1,
            Resolution::TransportError => self.transport_error += 1,
        }
        if resolution.is_failure() {
            self.failed += 1;
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading stats log {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| "parsing stats log")
    }
}

const REPORT_CSS: &str = r#"
    body, html { padding: 0; margin: 0; }
    body { padding: 1em; font-size: 14px; line-height: 1.2; font-family: sans-serif; }
    h1 { font-size: 120%; }
    pre.xml { white-space: pre-line; max-width: 80vw; overflow: auto; background: whiteSmoke; padding: 1em; }
    pre.diff { max-width: 80vw; overflow: auto; background: whiteSmoke; padding: 1em; }
    .tools a { margin-right: 1em; }
"#;

const REPORT_TOOLS: &str = r#"<p class="tools">
    <a href="javascript:document.querySelectorAll('details').forEach(el => el.setAttribute('open', 'open'))">Open all</a>
    <a href="javascript:document.querySelectorAll('details').forEach(el => el.removeAttribute('open'))">Close all</a>
    <a href="javascript:document.querySelectorAll('details.path:not(.error)').forEach(el => el.style.display = 'none')">Hide successful paths</a>
    <a href="javascript:document.querySelectorAll('details.path:not(.has-diff)').forEach(el => el.style.display = 'none')">Hide paths w/o diff</a>
    <a href="javascript:document.querySelectorAll('details.path').forEach(el => el.style.display = 'block')">Show all paths</a>
</p>"#;

/// Owns the two per-dirname artifacts: the browsable HTML report and the
/// YAML stats log. Every recorded entry is flushed to the report before the
/// stats log is rewritten, in that order, so an interrupt between paths
/// leaves both files valid for resumption.
pub struct Reporter {
    report: File,
    stats_path: PathBuf,
    stats: RunStats,
    dirname: String,
}

impl Reporter {
    /// Starts a fresh report, truncating any prior artifacts for the
    /// dirname. This is the documented data-loss point of non-resumed runs.
    pub fn create(
        cfg: &Config,
        reports_dir: &Path,
        dirname: &str,
        api_root: &str,
        reference_root: Option<&str>,
    ) -> Result<Self> {
        let (report_path, stats_path) = artifact_paths(cfg, reports_dir, dirname);

        let mut report = File::create(&report_path)
            .with_context(|| format!("creating report {}", report_path.display()))?;

        let comparing = match reference_root {
            Some(reference) => format!(" comparing with {}", html_escape(reference)),
            None => String::new(),
        };
        let header = format!(
            "<!doctype html>\n<head>\n<style>{css}</style>\n<meta charset=\"utf-8\">\n\
             <title>xml2rfc path report for {dirname} directory</title>\n<body>\n\
             <h1>xml2rfc path report for {dirname} directory</h1>\n\
             <p>Testing {api}{comparing}\n{tools}\n<details>\n<summary>Processed paths</summary>\n",
            css = REPORT_CSS,
            dirname = html_escape(dirname),
            api = html_escape(api_root),
            tools = REPORT_TOOLS,
        );
        report.write_all(header.as_bytes())?;
        report.flush()?;

        let reporter = Self {
            report,
            stats_path,
            stats: RunStats::default(),
            dirname: dirname.to_string(),
        };
        reporter.write_stats()?;
        Ok(reporter)
    }

    /// Reopens an interrupted run's artifacts: report in append mode with a
    /// resume marker, counters seeded from the existing stats log.
    pub fn resume(
        cfg: &Config,
        reports_dir: &Path,
        dirname: &str,
        start_index: usize,
    ) -> Result<Self> {
        let (report_path, stats_path) = artifact_paths(cfg, reports_dir, dirname);

        let stats = RunStats::load(&stats_path)?;
        let mut report = OpenOptions::new()
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening report for append {}", report_path.display()))?;

        let marker = format!(
            "<p class=\"resumed\">Resumed at index {start_index} ({})\n",
            now_rfc3339()
        );
        report.write_all(marker.as_bytes())?;
        report.flush()?;

        Ok(Self {
            report,
            stats_path,
            stats,
            dirname: dirname.to_string(),
        })
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Appends one formatted entry, then rewrites the stats log. Both writes
    /// complete before the caller probes the next path.
    pub fn record(&mut self, index: usize, path: &ArchivePath, outcome: &ProbeOutcome) -> Result<()> {
        let entry = self.format_entry(index, path, outcome);
        self.report.write_all(entry.as_bytes())?;
        self.report.flush()?;

        self.stats.record(outcome.resolution);
        self.write_stats()?;
        Ok(())
    }

    /// Closes the processed-paths block and appends the stats footer.
    pub fn finish(mut self) -> Result<RunStats> {
        let stats_yaml =
            serde_yaml::to_string(&self.stats).with_context(|| "serializing stats")?;
        let footer = format!(
            "</details>\n<h2>Stats</h2>\n<pre>{}</pre>\n",
            html_escape(&stats_yaml)
        );
        self.report.write_all(footer.as_bytes())?;
        self.report.flush()?;
        Ok(self.stats)
    }

    fn format_entry(&self, index: usize, path: &ArchivePath, outcome: &ProbeOutcome) -> String {
        let error_class = if outcome.resolution.is_failure() {
            "error"
        } else {
            "success"
        };
        let has_diff = outcome
            .reference
            .as_ref()
            .is_some_and(|r| r.diff.is_some());
        let diff_class = if has_diff { " has-diff" } else { "" };

        let summary_note = match (&outcome.error, &outcome.successful_method) {
            (Some(_), _) => "<strong>error ⚠️</strong>".to_string(),
            (None, Some(method)) => html_escape(&method.method),
            (None, None) => outcome.resolution.label().to_string(),
        };
        let diff_note = if has_diff { " — diff available" } else { "" };

        let mut body = String::new();
        body.push_str(&format!(
            "<p>Attempted <a href=\"{url}\">{url}</a> ({elapsed_ms} ms)\n",
            url = html_escape(&outcome.url),
            elapsed_ms = outcome.elapsed.as_millis(),
        ));

        match (&outcome.error, &outcome.successful_method) {
            (Some(error), _) => {
                body.push_str(&format!(
                    "<p>Request failed with (error possibly truncated): <pre>{}</pre>\n",
                    html_escape(error)
                ));
            }
            (None, Some(method)) => {
                body.push_str(&format!("<p>{} succeeded\n", method_label(&method.method)));
            }
            (None, None) => {
                body.push_str(&format!("<p>Resolved as {}\n", outcome.resolution.label()));
            }
        }

        if let Some(digest) = &outcome.body_sha256 {
            body.push_str(&format!("<p>Payload sha256: <code>{digest}</code>\n"));
        }

        if let Some(reference) = &outcome.reference {
            body.push_str(&format!(
                "<p>Comparing with reference: <a href=\"{url}\">{url}</a>\n",
                url = html_escape(&reference.url)
            ));
        }

        match (&outcome.reference, &outcome.body) {
            (Some(reference), Some(xml)) => {
                if let Some(diff) = &reference.diff {
                    body.push_str(&format!(
                        "<p>Diff of effective outcome against reference: <pre class=\"diff\">{}</pre>\n",
                        html_escape(diff)
                    ));
                } else {
                    body.push_str(&format!(
                        "<details><summary>Obtained XML is identical to reference</summary>\
                         <pre class=\"xml\">{}</pre></details>\n",
                        html_escape(xml)
                    ));
                }
            }
            (None, Some(xml)) => {
                body.push_str(&format!(
                    "<details><summary>Obtained XML</summary><pre class=\"xml\">{}</pre></details>\n",
                    html_escape(xml)
                ));
            }
            _ => {}
        }

        format!(
            "<details class=\"path {error_class}{diff_class}\">\n\
             <summary>#{index} {dirname} / {basename} — {summary_note}{diff_note}</summary>\n\
             <div style=\"padding: 0 1em 1em 1em;\">\n{body}</div>\n</details>\n",
            dirname = html_escape(&self.dirname),
            basename = html_escape(&path.basename),
        )
    }

    /// Rewrites the stats log via a temp file + rename so a kill mid-write
    /// cannot leave a truncated log.
    fn write_stats(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.stats).with_context(|| "serializing stats")?;
        let tmp = self.stats_path.with_extension("log.tmp");
        std::fs::write(&tmp, yaml)
            .with_context(|| format!("writing stats log {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.stats_path)
            .with_context(|| format!("replacing stats log {}", self.stats_path.display()))?;
        Ok(())
    }
}

/// Report and stats-log paths for a dirname under the reports directory.
pub fn artifact_paths(cfg: &Config, reports_dir: &Path, dirname: &str) -> (PathBuf, PathBuf) {
    (
        reports_dir.join(format!("{dirname}{}", cfg.report.report_suffix)),
        reports_dir.join(format!("{dirname}{}", cfg.report.stats_suffix)),
    )
}

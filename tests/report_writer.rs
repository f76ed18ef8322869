use bibxml_tools::{
    archive::ArchivePath,
    config::Config,
    probe::{ProbeOutcome, Resolution},
    report::{Reporter, RunStats, artifact_paths},
};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn sample_path(basename: &str) -> ArchivePath {
    ArchivePath {
        dirname: "bibxml4".into(),
        basename: basename.into(),
        source: PathBuf::from(format!("archive/bibxml4/{basename}")),
        alias_of: None,
    }
}

fn outcome(resolution: Resolution, status: Option<u16>) -> ProbeOutcome {
    let failed = resolution.is_failure();
    ProbeOutcome {
        resolution,
        url: "http://api.test/bibxml4/x.xml".into(),
        status,
        body: (!failed).then(|| "<reference anchor=\"X\"/>".to_string()),
        body_sha256: (!failed).then(|| "deadbeef".to_string()),
        error: failed.then(|| "HTTP 404: not found".to_string()),
        methods_tried: Vec::new(),
        successful_method: None,
        reference: None,
        elapsed: Duration::from_millis(12),
    }
}

#[test]
fn stats_count_by_resolution() {
    let mut stats = RunStats::default();
    stats.record(Resolution::ResolvedPrimary);
    stats.record(Resolution::ResolvedAlias);
    stats.record(Resolution::NotFound);
    stats.record(Resolution::TransportError);

    assert_eq!(stats.processed, 4);
    assert_eq!(stats.resolved_primary, 1);
    assert_eq!(stats.resolved_alias, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.transport_error, 1);
    assert_eq!(stats.failed, 2);
}

#[test]
fn report_and_stats_are_written_per_entry() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = Config::default();

    let mut reporter =
        Reporter::create(&cfg, tmp.path(), "bibxml4", "http://api.test", None).expect("create");

    reporter
        .record(0, &sample_path("rfc1.xml"), &outcome(Resolution::ResolvedPrimary, Some(200)))
        .expect("record first");

    // Both artifacts are already valid mid-run, before finish().
    let (report_path, stats_path) = artifact_paths(&cfg, tmp.path(), "bibxml4");
    let midway = RunStats::load(&stats_path).expect("stats parse mid-run");
    assert_eq!(midway.processed, 1);
    assert_eq!(midway.failed, 0);

    reporter
        .record(1, &sample_path("rfc2.xml"), &outcome(Resolution::NotFound, Some(404)))
        .expect("record second");

    let stats = reporter.finish().expect("finish");
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.failed, 1);

    let html = fs::read_to_string(&report_path).expect("read report");
    assert!(html.contains("xml2rfc path report for bibxml4 directory"));
    assert!(html.contains("#0 bibxml4 / rfc1.xml"));
    assert!(html.contains("#1 bibxml4 / rfc2.xml"));
    assert!(html.contains("error ⚠️"));
    assert!(html.contains("<h2>Stats</h2>"));

    let final_stats = RunStats::load(&stats_path).expect("stats parse");
    assert_eq!(final_stats, stats);
}

#[test]
fn resume_seeds_stats_and_appends() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = Config::default();

    let mut reporter =
        Reporter::create(&cfg, tmp.path(), "bibxml4", "http://api.test", None).expect("create");
    reporter
        .record(0, &sample_path("rfc1.xml"), &outcome(Resolution::ResolvedPrimary, Some(200)))
        .expect("record");
    reporter.finish().expect("finish first run");

    let mut resumed = Reporter::resume(&cfg, tmp.path(), "bibxml4", 1).expect("resume");
    assert_eq!(resumed.stats().processed, 1);

    resumed
        .record(1, &sample_path("rfc2.xml"), &outcome(Resolution::NotFound, Some(404)))
        .expect("record resumed");
    let stats = resumed.finish().expect("finish resumed run");
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.failed, 1);

    let (report_path, _) = artifact_paths(&cfg, tmp.path(), "bibxml4");
    let html = fs::read_to_string(report_path).expect("read report");
    // The first run's entry survived the resume.
    assert!(html.contains("#0 bibxml4 / rfc1.xml"));
    assert!(html.contains("Resumed at index 1"));
    assert!(html.contains("#1 bibxml4 / rfc2.xml"));
}

#[test]
fn fresh_create_truncates_previous_artifacts() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = Config::default();

    let mut reporter =
        Reporter::create(&cfg, tmp.path(), "bibxml4", "http://api.test", None).expect("create");
    reporter
        .record(0, &sample_path("rfc1.xml"), &outcome(Resolution::ResolvedPrimary, Some(200)))
        .expect("record");
    reporter.finish().expect("finish");

    let reporter =
        Reporter::create(&cfg, tmp.path(), "bibxml4", "http://api.test", None).expect("recreate");
    let stats = reporter.finish().expect("finish empty");
    assert_eq!(stats.processed, 0);

    let (report_path, _) = artifact_paths(&cfg, tmp.path(), "bibxml4");
    let html = fs::read_to_string(report_path).expect("read report");
    assert!(!html.contains("rfc1.xml"));
}

#[test]
fn reference_root_appears_in_header() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = Config::default();

    let reporter = Reporter::create(
        &cfg,
        tmp.path(),
        "bibxml4",
        "http://api.test",
        Some("http://reference.test"),
    )
    .expect("create");
    reporter.finish().expect("finish");

    let (report_path, _) = artifact_paths(&cfg, tmp.path(), "bibxml4");
    let html = fs::read_to_string(report_path).expect("read report");
    assert!(html.contains("comparing with http://reference.test"));
}

use crate::{archive::ArchivePath, config::Config, util};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::time::{Duration, Instant};

/// How (or whether) a probed path resolved. Closed set so the report writer
/// can handle every case exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    ResolvedPrimary,
    ResolvedAlias,
    NotFound,
    TransportError,
}

impl Resolution {
    pub fn label(self) -> &'static str {
        match self {
            Resolution::ResolvedPrimary => "resolved-primary",
            Resolution::ResolvedAlias => "resolved-alias",
            Resolution::NotFound => "not-found",
            Resolution::TransportError => "transport-error",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Resolution::NotFound | Resolution::TransportError)
    }
}

/// One resolution method the service reported attempting, parsed from the
/// x-resolution-methods / x-resolution-outcomes response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub method: String,
    pub success: bool,
    pub config: Option<String>,
    pub error: Option<String>,
}

pub fn method_label(method: &str) -> &str {
    match method {
        "auto" => "Automatic resolution",
        "manual" => "Mapping by primary docid",
        "fallback" => "Fallback to bibxml data archive",
        other => other,
    }
}

/// Reference-endpoint comparison attached to a successful probe.
#[derive(Debug, Clone)]
pub struct ReferenceComparison {
    pub url: String,
    pub identical: bool,
    /// Unified diff, present only when the payloads differ.
    pub diff: Option<String>,
}

/// Outcome of probing one archive path. Consumed once by the report writer.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub resolution: Resolution,
    pub url: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub body_sha256: Option<String>,
    pub error: Option<String>,
    pub methods_tried: Vec<MethodOutcome>,
    pub successful_method: Option<MethodOutcome>,
    pub reference: Option<ReferenceComparison>,
    pub elapsed: Duration,
}

pub struct Prober {
    agent: ureq::Agent,
    api_root: String,
    reference_root: Option<String>,
    requested_with: String,
    max_error_body_chars: usize,
    diff_context_lines: usize,
}

impl Prober {
    pub fn new(cfg: &Config, api_root: &str, reference_root: Option<&str>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.http.timeout_seconds))
            .build();
        Self {
            agent,
            api_root: api_root.to_string(),
            reference_root: reference_root.map(str::to_string),
            requested_with: cfg.http.requested_with.clone(),
            max_error_body_chars: cfg.http.max_error_body_chars,
            diff_context_lines: cfg.report.diff_context_lines,
        }
    }

    /// Issues one request per configured endpoint (one or two total) and
    /// classifies the result. Failures become outcomes, never errors; a
    /// single failed attempt is final for the path in this run.
    pub fn probe(&self, path: &ArchivePath) -> ProbeOutcome {
        let url = join_url(&self.api_root, &path.subpath());
        let started = Instant::now();

        let mut outcome = match self
            .agent
            .get(&url)
            .set("X-Requested-With", &self.requested_with)
            .call()
        {
            Ok(resp) => {
                let status = resp.status();
                let (methods_tried, successful_method) = parse_methods_tried(
                    resp.header("x-resolution-methods"),
                    resp.header("x-resolution-outcomes"),
                );
                match resp.into_string() {
                    Ok(body) => {
                        let resolution = if path.is_alias() {
                            Resolution::ResolvedAlias
                        } else {
                            Resolution::ResolvedPrimary
                        };
                        ProbeOutcome {
                            resolution,
                            url: url.clone(),
                            status: Some(status),
                            body_sha256: Some(util::sha256_hex(body.as_bytes())),
                            body: Some(body),
                            error: None,
                            methods_tried,
                            successful_method,
                            reference: None,
                            elapsed: Duration::ZERO,
                        }
                    }
                    Err(err) => ProbeOutcome {
                        resolution: Resolution::TransportError,
                        url: url.clone(),
                        status: Some(status),
                        body: None,
                        body_sha256: None,
                        error: Some(format!("reading response body: {err}")),
                        methods_tried,
                        successful_method,
                        reference: None,
                        elapsed: Duration::ZERO,
                    },
                }
            }
            Err(ureq::Error::Status(code, resp)) => {
                let (methods_tried, successful_method) = parse_methods_tried(
                    resp.header("x-resolution-methods"),
                    resp.header("x-resolution-outcomes"),
                );
                let body = resp.into_string().unwrap_or_default();
                let body = util::truncate_chars(&body, self.max_error_body_chars);
                ProbeOutcome {
                    resolution: Resolution::NotFound,
                    url: url.clone(),
                    status: Some(code),
                    body: None,
                    body_sha256: None,
                    error: Some(format!("HTTP {code}: {body}")),
                    methods_tried,
                    successful_method,
                    reference: None,
                    elapsed: Duration::ZERO,
                }
            }
            Err(err) => ProbeOutcome {
                resolution: Resolution::TransportError,
                url: url.clone(),
                status: None,
                body: None,
                body_sha256: None,
                error: Some(err.to_string()),
                methods_tried: Vec::new(),
                successful_method: None,
                reference: None,
                elapsed: Duration::ZERO,
            },
        };

        if !outcome.resolution.is_failure() {
            let reference = self.compare_with_reference(path, &outcome);
            outcome.reference = reference;
        }

        outcome.elapsed = started.elapsed();
        outcome
    }

    /// Fetches the reference payload and diffs it against the primary one.
    /// A failing reference request is ignored: drift visibility only.
    fn compare_with_reference(
        &self,
        path: &ArchivePath,
        outcome: &ProbeOutcome,
    ) -> Option<ReferenceComparison> {
        let reference_root = self.reference_root.as_deref()?;
        let body = outcome.body.as_deref()?;

        let url = join_url(reference_root, &path.subpath());
        let resp = self.agent.get(&url).call().ok()?;
        let reference = resp.into_string().ok()?;

        if reference == body {
            return Some(ReferenceComparison {
                url,
                identical: true,
                diff: None,
            });
        }

        let diff = TextDiff::from_lines(reference.as_str(), body)
            .unified_diff()
            .context_radius(self.diff_context_lines)
            .header("reference", "obtained")
            .to_string();
        Some(ReferenceComparison {
            url,
            identical: false,
            diff: Some(diff),
        })
    }
}

/// Joins an endpoint root and a subpath with exactly one slash.
pub fn join_url(root: &str, subpath: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), subpath)
}

/// Parses the service's x-resolution-methods / x-resolution-outcomes header
/// pair. Both are `;`-separated and must align; each outcome is
/// `<config>,<error>` where an empty error marks the successful method.
pub fn parse_methods_tried(
    methods: Option<&str>,
    outcomes: Option<&str>,
) -> (Vec<MethodOutcome>, Option<MethodOutcome>) {
    let (Some(methods), Some(outcomes)) = (methods, outcomes) else {
        return (Vec::new(), None);
    };
    if !methods.contains(';') {
        return (Vec::new(), None);
    }

    let methods: Vec<&str> = methods.split(';').collect();
    let outcomes: Vec<&str> = outcomes.split(';').collect();
    if methods.len() != outcomes.len() {
        return (Vec::new(), None);
    }

    let mut tried = Vec::new();
    let mut successful = None;
    for (method, outcome) in methods.iter().zip(outcomes.iter()) {
        let Some((config, error)) = outcome.split_once(',') else {
            continue;
        };
        let parsed = MethodOutcome {
            method: method.to_string(),
            success: error.is_empty(),
            config: (!config.is_empty()).then(|| config.to_string()),
            error: (!error.is_empty()).then(|| error.to_string()),
        };
        if parsed.success {
            successful = Some(parsed.clone());
        }
        tried.push(parsed);
    }
    (tried, successful)
}

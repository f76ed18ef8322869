use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    /// Compat dirname -> alias dirnames, mirroring the service's alias table.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Known alias dirnames for `dirname`, or None if the dirname is not
    /// registered in the alias table at all.
    pub fn aliases_for(&self, dirname: &str) -> Option<&[String]> {
        self.aliases.get(dirname).map(|v| v.as_slice())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: Default::default(),
            aliases: default_aliases(),
            report: Default::default(),
            logging: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http {
    pub timeout_seconds: u64,
    /// Sent as X-Requested-With on primary probes.
    pub requested_with: String,
    /// Error response bodies are truncated to this many characters in reports.
    pub max_error_body_chars: usize,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            requested_with: "xml2rfcResolver".into(),
            max_error_body_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_suffix: String,
    pub stats_suffix: String,
    pub diff_context_lines: usize,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            report_suffix: "-report.html".into(),
            stats_suffix: "-stats.log".into(),
            diff_context_lines: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

fn default_aliases() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 10] = [
        ("bibxml", &["bibxml-rfcs"]),
        ("bibxml2", &["bibxml-misc"]),
        ("bibxml3", &["bibxml-ids"]),
        ("bibxml4", &["bibxml-w3c"]),
        ("bibxml5", &["bibxml-3gpp"]),
        ("bibxml6", &["bibxml-ieee"]),
        ("bibxml7", &["bibxml-doi"]),
        ("bibxml8", &["bibxml-iana"]),
        ("bibxml9", &["bibxml-rfcsubseries"]),
        ("bibxml-nist", &[]),
    ];
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|a| a.to_string()).collect()))
        .collect()
}

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Hand-authored path -> primary docid mapping. Blank or absent docids mark
/// unmapped paths; they are carried so callers can count them.
pub type Mapping = BTreeMap<String, Option<String>>;

pub fn load_mapping(path: &Path) -> Result<Mapping> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading mapping {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing YAML mapping {}", path.display()))
}

/// Entries with a usable docid, in path order.
pub fn mapped_entries(mapping: &Mapping) -> Vec<(&str, &str)> {
    mapping
        .iter()
        .filter_map(|(path, docid)| {
            let docid = docid.as_deref()?.trim();
            (!docid.is_empty()).then_some((path.as_str(), docid))
        })
        .collect()
}

/// One record of the JSON import format consumed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEntry {
    pub docid: String,
    pub path: String,
}

/// Converts a mapping into import entries, prefixing each path with the
/// dirname. The dirname must be a bare directory name.
pub fn to_import_entries(mapping: &Mapping, dirname: &str) -> Result<Vec<ImportEntry>> {
    if dirname.contains('/') {
        bail!("configuration error: dirname must not contain a slash");
    }
    Ok(mapped_entries(mapping)
        .into_iter()
        .map(|(path, docid)| ImportEntry {
            docid: docid.to_string(),
            path: format!("{dirname}/{path}"),
        })
        .collect())
}

/// The convert subcommand: YAML mapping in, JSON import format out.
pub fn run_convert(
    input: &Path,
    dirname: &str,
    out: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    if verbose {
        info!("reading {}", input.display());
    }

    let mapping = load_mapping(input)?;
    let entries = to_import_entries(&mapping, dirname)?;

    if verbose {
        info!(
            "{} paths total, {} mapped",
            mapping.len(),
            entries.len()
        );
    }
    if entries.is_empty() {
        warn!("nothing to do: {} contains no mapped paths", input.display());
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&entries)?;
    match out {
        Some(path) => {
            info!("writing JSON to {}", path.display());
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Normalizes a W3C docid to carry exactly one `W3C ` prefix.
pub fn w3c_docid(docid: &str) -> String {
    format!("W3C {}", docid.strip_prefix("W3C ").unwrap_or(docid))
}

/// The fix-w3c subcommand: drops unmapped entries and normalizes docid
/// prefixes. Idempotent.
pub fn run_fix_w3c(input: &Path, output: &Path) -> Result<()> {
    let mapping = load_mapping(input)?;

    let fixed: BTreeMap<&str, String> = mapped_entries(&mapping)
        .into_iter()
        .map(|(path, docid)| (path, w3c_docid(docid)))
        .collect();

    let yaml = serde_yaml::to_string(&fixed).with_context(|| "serializing fixed mapping")?;
    std::fs::write(output, yaml).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

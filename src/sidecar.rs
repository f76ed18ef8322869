use crate::mapping::{self, Mapping};
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sidecar metadata carried alongside an archive document. Keys the tools
/// do not understand are preserved on rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_docid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Rejects sidecar documents that parse but violate the schema.
pub fn validate_sidecar(meta: &SidecarMeta) -> Result<()> {
    if let Some(docid) = &meta.primary_docid {
        if docid.trim().is_empty() {
            bail!("invalid or missing primary docid mapping");
        }
    }
    Ok(())
}

pub fn load_sidecar(path: &Path) -> Result<SidecarMeta> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading sidecar {}", path.display()))?;
    let meta: SidecarMeta = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing sidecar {}", path.display()))?;
    validate_sidecar(&meta)?;
    Ok(meta)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub unchanged: u64,
    pub updated: u64,
    pub created: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateErrorStats {
    pub orphaned: u64,
    pub malformed: u64,
    pub nonexistent_mapped: u64,
}

/// The update-sidecars subcommand. Cleans up orphaned and malformed sidecar
/// files (deletion always carries a warning, never silent), then writes or
/// updates a sidecar for every mapped XML file in the data directory.
pub fn run_update(
    mapping_path: &Path,
    datadir: &Path,
    verbose: bool,
    show_progress: bool,
) -> Result<(UpdateStats, UpdateErrorStats)> {
    if !datadir.is_dir() {
        bail!("configuration error: not a directory: {}", datadir.display());
    }

    if verbose {
        info!("reading {}", mapping_path.display());
    }
    let mapping: Mapping = mapping::load_mapping(mapping_path)?;
    let mapped: BTreeMap<&str, &str> = mapping::mapped_entries(&mapping).into_iter().collect();

    if verbose {
        info!("given {} mapped path(s)", mapped.len());
        info!("target data directory: {}", datadir.display());
    }
    if mapped.is_empty() {
        warn!("nothing to do: {} contains no mapped paths", mapping_path.display());
        return Ok((UpdateStats::default(), UpdateErrorStats::default()));
    }

    let xml_files = files_with_extension(datadir, "xml")?;
    let sidecar_files = files_with_extension(datadir, "yaml")?;

    let mut errors = UpdateErrorStats::default();

    let xml_basenames: Vec<String> = xml_files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    for mapped_path in mapped.keys() {
        if !xml_basenames.iter().any(|b| b == mapped_path) {
            warn!("mapping references nonexistent file: {mapped_path}");
            errors.nonexistent_mapped += 1;
        }
    }

    // Integrity pass over existing sidecars, keyed by XML file stem.
    let mut sidecar_data: BTreeMap<String, SidecarMeta> = BTreeMap::new();
    let progress = progress_bar(show_progress, sidecar_files.len(), "Validating integrity");
    for sidecar_path in &sidecar_files {
        progress.inc(1);
        let Some(stem) = sidecar_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let xml_path = datadir.join(format!("{stem}.xml"));

        if !xml_path.is_file() {
            warn!("orphaned sidecar file: {}", sidecar_path.display());
            std::fs::remove_file(sidecar_path)
                .with_context(|| format!("removing {}", sidecar_path.display()))?;
            errors.orphaned += 1;
            continue;
        }

        match load_sidecar(sidecar_path) {
            Ok(meta) => {
                sidecar_data.insert(stem.to_string(), meta);
            }
            Err(err) => {
                warn!(
                    "removing malformed sidecar file: {} ({err:#})",
                    sidecar_path.display()
                );
                std::fs::remove_file(sidecar_path)
                    .with_context(|| format!("removing {}", sidecar_path.display()))?;
                errors.malformed += 1;
            }
        }
    }
    progress.finish_and_clear();

    // Write pass over the archive's XML files.
    let mut stats = UpdateStats::default();
    let progress = progress_bar(show_progress, xml_files.len(), "Writing sidecar data");
    for xml_path in &xml_files {
        progress.inc(1);
        let Some(basename) = xml_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = xml_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(docid) = mapped.get(basename) else {
            continue;
        };

        let mut meta = sidecar_data.remove(stem).unwrap_or_default();
        match meta.primary_docid.as_deref() {
            Some(existing) if existing == *docid => {
                stats.unchanged += 1;
                continue;
            }
            Some(existing) => {
                warn!("changed mapping for {basename}: {existing} -> {docid}");
                stats.updated += 1;
            }
            None => stats.created += 1,
        }

        meta.primary_docid = Some(docid.to_string());
        let sidecar_path = datadir.join(format!("{stem}.yaml"));
        let yaml = serde_yaml::to_string(&meta)
            .with_context(|| format!("serializing sidecar for {basename}"))?;
        std::fs::write(&sidecar_path, yaml)
            .with_context(|| format!("writing {}", sidecar_path.display()))?;
    }
    progress.finish_and_clear();

    Ok((stats, errors))
}

/// Sorted files directly under `dir` with the given extension.
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(ext)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn progress_bar(show: bool, len: usize, message: &'static str) -> ProgressBar {
    if show {
        ProgressBar::new(len as u64).with_message(message)
    } else {
        ProgressBar::hidden()
    }
}

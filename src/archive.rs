use crate::config::Config;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// One document discovered under a sub-archive. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePath {
    /// Dirname used in the probe URL. For alias variants this is the alias.
    pub dirname: String,
    /// File name including the .xml extension.
    pub basename: String,
    /// On-disk location the path was discovered at.
    pub source: PathBuf,
    /// Base dirname when this entry is an alias variant of another path.
    pub alias_of: Option<String>,
}

impl ArchivePath {
    pub fn subpath(&self) -> String {
        format!("{}/{}", self.dirname, self.basename)
    }

    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }
}

/// Sorted names of all sub-archive directories under the archive root.
pub fn list_dirnames(archive_root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(archive_root)
        .with_context(|| format!("reading archive root {}", archive_root.display()))?;

    let mut dirnames = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirnames.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirnames.sort();
    Ok(dirnames)
}

/// Lists `*.xml` directly under `<archive_root>/<dirname>`, sorted by file
/// name so two enumerations of an unchanged tree yield the same sequence.
pub fn enumerate(archive_root: &Path, dirname: &str) -> Result<Vec<ArchivePath>> {
    let dir = archive_root.join(dirname);
    if !dir.is_dir() {
        bail!(
            "configuration error: sub-archive {} does not exist under {}",
            dirname,
            archive_root.display()
        );
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let source = entry.path();
        if source.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let basename = entry.file_name().to_string_lossy().into_owned();
        paths.push(ArchivePath {
            dirname: dirname.to_string(),
            basename,
            source,
            alias_of: None,
        });
    }
    paths.sort_by(|a, b| a.basename.cmp(&b.basename));
    Ok(paths)
}

/// Alias dirnames registered for `dirname`. Unknown dirnames are a
/// configuration error, matching the service's closed alias table.
pub fn aliases_for<'a>(cfg: &'a Config, dirname: &str) -> Result<&'a [String]> {
    match cfg.aliases_for(dirname) {
        Some(aliases) => Ok(aliases),
        None => bail!("configuration error: unknown xml2rfc directory {dirname}"),
    }
}

/// Expands each base path into itself plus one alias variant per registered
/// alias, path-major: base entry first, then its aliases in table order.
pub fn expand_aliases(cfg: &Config, dirname: &str, paths: Vec<ArchivePath>) -> Result<Vec<ArchivePath>> {
    let aliases = aliases_for(cfg, dirname)?;

    let mut expanded = Vec::with_capacity(paths.len() * (aliases.len() + 1));
    for path in paths {
        let variants: Vec<ArchivePath> = aliases
            .iter()
            .map(|alias| ArchivePath {
                dirname: alias.clone(),
                basename: path.basename.clone(),
                source: path.source.clone(),
                alias_of: Some(path.dirname.clone()),
            })
            .collect();
        expanded.push(path);
        expanded.extend(variants);
    }
    Ok(expanded)
}

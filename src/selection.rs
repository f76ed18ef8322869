use crate::archive::ArchivePath;
use anyhow::{Result, bail};
use rand::seq::SliceRandom;

/// Rejects flag combinations that would break index-based resumption.
/// Called before any probing or file writes.
pub fn check_resume_compatibility(
    continue_at: Option<usize>,
    dirname_count: usize,
    check_aliases: bool,
    randomize: bool,
) -> Result<()> {
    if continue_at.is_none() {
        return Ok(());
    }
    if randomize {
        bail!("configuration error: --continue-at cannot be combined with --randomize");
    }
    if check_aliases {
        bail!("configuration error: --continue-at cannot be combined with --check-aliases");
    }
    if dirname_count != 1 {
        bail!("configuration error: --continue-at requires exactly one --dirname");
    }
    Ok(())
}

/// Applies run options to the enumerated sequence: shuffle for randomized
/// runs, or drop the first `continue_at` entries for resumed ones.
pub fn apply(
    mut paths: Vec<ArchivePath>,
    randomize: bool,
    continue_at: Option<usize>,
) -> Vec<ArchivePath> {
    if randomize {
        paths.shuffle(&mut rand::thread_rng());
        return paths;
    }
    if let Some(start) = continue_at {
        if start >= paths.len() {
            return Vec::new();
        }
        return paths.split_off(start);
    }
    paths
}

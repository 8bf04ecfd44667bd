use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;

use crate::error::Result;

/// Mask files directly inside `dir` with one of `extensions`, sorted.
pub fn discover_masks(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut found = BTreeSet::new();

    for extension in extensions {
        let pattern = format!("{base}/*.{extension}");
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(std::io::Error::from)?;
            if path.is_file() {
                found.insert(path);
            }
        }
    }

    debug!(dir = ?dir, count = found.len(), "discovered mask files");
    Ok(found.into_iter().collect())
}

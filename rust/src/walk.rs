use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for [`find_by_suffix`].
#[derive(Debug, Clone, Default)]
pub struct WalkOptions<'a> {
    /// Entries whose name ends with one of these are skipped, directories
    /// together with everything beneath them.
    pub prune: &'a [String],
    pub follow_links: bool,
}

fn file_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}

fn is_pruned(entry: &DirEntry, prune: &[String]) -> bool {
    // never prune the walk root itself
    if entry.depth() == 0 {
        return false;
    }
    let name = file_name(entry);
    prune.iter().any(|p| !p.is_empty() && name.ends_with(p.as_str()))
}

/// Every file beneath `root` whose name ends with one of `suffixes`, bucketed
/// by suffix. A file matching several suffixes lands in each bucket. Buckets
/// exist for every requested suffix and are sorted by path.
pub fn find_by_suffix(
    root: &Path,
    suffixes: &[String],
    options: &WalkOptions<'_>,
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut buckets: BTreeMap<String, Vec<PathBuf>> =
        suffixes.iter().map(|s| (s.clone(), Vec::new())).collect();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, options.prune));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("Walk error: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = file_name(&entry);
        for suffix in suffixes {
            if name.ends_with(suffix.as_str()) {
                if let Some(bucket) = buckets.get_mut(suffix) {
                    bucket.push(entry.path().to_path_buf());
                }
            }
        }
    }

    let found: usize = buckets.values().map(Vec::len).sum();
    tracing::debug!(
        "found {} paths under {} for suffixes {:?}",
        found,
        root.display(),
        suffixes
    );
    buckets
}

/// Canonical form of `path`, falling back to the path as given when it
/// cannot be resolved.
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// `file_name` with `suffix` stripped; the whole file name when stripping
/// would leave nothing.
pub fn strip_suffix(path: &Path, suffix: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

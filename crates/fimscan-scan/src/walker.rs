//! Ordered directory traversal with exclusion and recursion policy.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use fimscan_core::ExcludeMatcher;

/// Decision returned by a visitor for each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep going, descending into the entry if policy allows.
    Continue,
    /// Do not descend into this entry. Ignored for non-directories.
    SkipSubtree,
    /// Stop walking this root immediately.
    Abort,
}

/// How the walk of a root ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    Aborted,
}

/// A visited, non-excluded entry.
#[derive(Debug)]
pub struct Entry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// lstat result; links are never followed.
    pub metadata: Metadata,
    /// Depth below the root (the root is 0).
    pub depth: usize,
}

/// Resolve symbolic links in a configured root to its canonical path.
pub fn resolve_root(path: &Path) -> io::Result<PathBuf> {
    std::fs::canonicalize(path)
}

/// Walks one resolved root at a time.
///
/// Entries are visited in file-name order. Entries that cannot be
/// inspected are skipped (with a warning unless they vanished), excluded
/// entries are skipped along with their subtree, and symbolic links are
/// reported but never followed.
pub struct Walker<'a> {
    recursive: bool,
    exclude: &'a ExcludeMatcher,
}

impl<'a> Walker<'a> {
    /// Create a walker with the given recursion flag and exclusions.
    pub fn new(recursive: bool, exclude: &'a ExcludeMatcher) -> Self {
        Self { recursive, exclude }
    }

    /// Walk `root`, calling `visit` exactly once per non-excluded entry.
    pub fn walk<F>(&self, root: &Path, mut visit: F) -> WalkOutcome
    where
        F: FnMut(Entry) -> Visit,
    {
        let mut entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            let dent = match next {
                Ok(dent) => dent,
                Err(err) => {
                    report_skip(err.path().unwrap_or(root), &err, err.io_error());
                    continue;
                }
            };

            // Only real directories are ever opened; links report as links.
            let is_dir = dent.file_type().is_dir();

            let metadata = match dent.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    report_skip(dent.path(), &err, err.io_error());
                    if is_dir {
                        entries.skip_current_dir();
                    }
                    continue;
                }
            };

            if self.exclude.is_match(dent.path()) {
                if is_dir {
                    entries.skip_current_dir();
                }
                continue;
            }

            let depth = dent.depth();
            let entry = Entry {
                path: dent.into_path(),
                metadata,
                depth,
            };

            match visit(entry) {
                Visit::Abort => return WalkOutcome::Aborted,
                Visit::SkipSubtree => {
                    if is_dir {
                        entries.skip_current_dir();
                    }
                    continue;
                }
                Visit::Continue => {}
            }

            // Always traverse the root; below it only when recursive.
            if is_dir && depth > 0 && !self.recursive {
                entries.skip_current_dir();
            }
        }

        WalkOutcome::Completed
    }
}

fn report_skip(path: &Path, err: &dyn std::fmt::Display, io_err: Option<&io::Error>) {
    // Entries removed mid-scan are expected.
    if io_err.is_some_and(|e| e.kind() == io::ErrorKind::NotFound) {
        return;
    }
    warn!(
        file_path = %path.display(),
        error = %err,
        "Scanner is skipping a path because of an error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("f1"), vec![0u8; 10]).unwrap();
        fs::write(root.join("f2"), vec![0u8; 20]).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b/f3"), vec![0u8; 5]).unwrap();

        temp
    }

    fn collect(walker: &Walker<'_>, root: &Path) -> Vec<PathBuf> {
        let mut seen = Vec::new();
        let outcome = walker.walk(root, |entry| {
            seen.push(entry.path);
            Visit::Continue
        });
        assert_eq!(outcome, WalkOutcome::Completed);
        seen
    }

    #[test]
    fn test_recursive_walk_in_name_order() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::empty();

        let seen = collect(&Walker::new(true, &exclude), &root);
        assert_eq!(
            seen,
            vec![
                root.clone(),
                root.join("b"),
                root.join("b/f3"),
                root.join("f1"),
                root.join("f2"),
            ]
        );
    }

    #[test]
    fn test_non_recursive_visits_direct_children_only() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::empty();

        let seen = collect(&Walker::new(false, &exclude), &root);
        assert_eq!(
            seen,
            vec![root.clone(), root.join("b"), root.join("f1"), root.join("f2")]
        );
    }

    #[test]
    fn test_excluded_directory_skips_subtree() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::new(&["**/b"]).unwrap();

        let seen = collect(&Walker::new(true, &exclude), &root);
        assert_eq!(seen, vec![root.clone(), root.join("f1"), root.join("f2")]);
    }

    #[test]
    fn test_skip_subtree_from_visitor() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::empty();

        let mut seen = Vec::new();
        Walker::new(true, &exclude).walk(&root, |entry| {
            let skip = entry.path.ends_with("b");
            seen.push(entry.path);
            if skip { Visit::SkipSubtree } else { Visit::Continue }
        });
        assert!(seen.contains(&root.join("b")));
        assert!(!seen.contains(&root.join("b/f3")));
        assert!(seen.contains(&root.join("f2")));
    }

    #[test]
    fn test_skip_subtree_on_file_is_ignored() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::empty();

        let mut count = 0;
        Walker::new(true, &exclude).walk(&root, |entry| {
            count += 1;
            if entry.metadata.is_dir() { Visit::Continue } else { Visit::SkipSubtree }
        });
        assert_eq!(count, 5);
    }

    #[test]
    fn test_abort_stops_immediately() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        let exclude = ExcludeMatcher::empty();

        let mut count = 0;
        let outcome = Walker::new(true, &exclude).walk(&root, |_| {
            count += 1;
            if count == 2 { Visit::Abort } else { Visit::Continue }
        });
        assert_eq!(outcome, WalkOutcome::Aborted);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_missing_root_visits_nothing() {
        let temp = TempDir::new().unwrap();
        let exclude = ExcludeMatcher::empty();

        let seen = collect(&Walker::new(true, &exclude), &temp.path().join("gone"));
        assert!(seen.is_empty());
        assert!(resolve_root(&temp.path().join("gone")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_reported_not_entered() {
        let temp = create_test_tree();
        let root = resolve_root(temp.path()).unwrap();
        std::os::unix::fs::symlink(root.join("b"), root.join("link")).unwrap();
        let exclude = ExcludeMatcher::empty();

        let seen = collect(&Walker::new(true, &exclude), &root);
        assert!(seen.contains(&root.join("link")));
        assert!(!seen.contains(&root.join("link/f3")));
        assert_eq!(seen.len(), 6);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_resolves_to_target() {
        let temp = create_test_tree();
        let real = resolve_root(temp.path()).unwrap();
        let other = TempDir::new().unwrap();
        let link = other.path().join("alias");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(resolve_root(&link).unwrap(), real);
    }
}

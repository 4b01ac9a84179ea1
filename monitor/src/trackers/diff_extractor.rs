//! Line-level change extraction for edited files.
//!
//! The extractor answers one question for a file path: how many lines were
//! added and removed, and what were they?
//!
//! # Primary Path
//!
//! The file is diffed against its last committed state with
//! `git diff HEAD -- <file>`. Each line of the unified diff is classified
//! independently:
//!
//! - `+text` (but not a `+++` header) is an added line
//! - `-text` (but not a `---` header) is a removed line
//! - everything else (hunk headers, context, `\ No newline`) is ignored
//!
//! There is no move detection: text added in one hunk and removed in
//! another is counted in both buckets.
//!
//! # Fallback Path
//!
//! When the diff invocation fails (no git, not a repository, untracked
//! file), the current line count is compared with the count cached on the
//! previous observation of the same path:
//!
//! - `lines_added = max(0, new - old)`
//! - `lines_removed = max(0, old - new)`
//!
//! Edits that keep the line count unchanged report zero on this path.
//!
//! # Example
//!
//! ```
//! use codetrack_monitor::trackers::diff_extractor::parse_unified_diff;
//!
//! let diff = "\
//! --- a/src/lib.rs
//! +++ b/src/lib.rs
//! @@ -1,2 +1,2 @@
//!  fn main() {
//! -    old();
//! +    new();
//! ";
//! let result = parse_unified_diff(diff);
//! assert_eq!(result.lines_added, 1);
//! assert_eq!(result.lines_removed, 1);
//! assert_eq!(result.added_content, vec!["new();"]);
//! ```

use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use lru::LruCache;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Default number of files whose line counts are remembered by the fallback.
pub const DEFAULT_LINE_CACHE_SIZE: usize = 4096;

/// Errors from the version-control diff invocation.
///
/// These never reach the extractor's callers; any of them switches the
/// extractor to its line-count fallback.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The `git` process could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// `git` exited unsuccessfully.
    #[error("git exited with {status}: {stderr}")]
    Failed {
        /// Exit status of the git process.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The file is not tracked, so there is no committed state to diff against.
    #[error("file is not tracked: {0}")]
    Untracked(PathBuf),

    /// The path has no parent directory or file name to run git with.
    #[error("invalid file path: {0}")]
    InvalidPath(PathBuf),
}

/// Classification of one line of unified-diff output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    /// An added line, marker stripped and trimmed.
    Added(&'a str),
    /// A removed line, marker stripped and trimmed.
    Removed(&'a str),
    /// Headers, hunk markers, context lines.
    Ignored,
}

/// Classifies a single diff line.
///
/// # Examples
///
/// ```
/// use codetrack_monitor::trackers::diff_extractor::{classify_line, DiffLine};
///
/// assert_eq!(classify_line("+  let x = 1;"), DiffLine::Added("let x = 1;"));
/// assert_eq!(classify_line("-}"), DiffLine::Removed("}"));
/// assert_eq!(classify_line("+++ b/main.rs"), DiffLine::Ignored);
/// assert_eq!(classify_line(" context"), DiffLine::Ignored);
/// ```
#[must_use]
pub fn classify_line(line: &str) -> DiffLine<'_> {
    if line.starts_with("+++") || line.starts_with("---") {
        return DiffLine::Ignored;
    }
    if let Some(rest) = line.strip_prefix('+') {
        DiffLine::Added(rest.trim())
    } else if let Some(rest) = line.strip_prefix('-') {
        DiffLine::Removed(rest.trim())
    } else {
        DiffLine::Ignored
    }
}

/// Line delta for one observed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Number of lines added.
    pub lines_added: u32,

    /// Number of lines removed.
    pub lines_removed: u32,

    /// Added line contents in diff order (empty on the fallback path).
    pub added_content: Vec<String>,

    /// Removed line contents in diff order (empty on the fallback path).
    pub removed_content: Vec<String>,
}

impl DiffResult {
    /// Builds a count-only result from two line counts.
    #[must_use]
    pub fn from_line_counts(old_count: usize, new_count: usize) -> Self {
        Self {
            lines_added: saturating_u32(new_count.saturating_sub(old_count)),
            lines_removed: saturating_u32(old_count.saturating_sub(new_count)),
            added_content: Vec::new(),
            removed_content: Vec::new(),
        }
    }

    /// Returns the total number of changed lines (added + removed).
    #[must_use]
    pub fn total_changes(&self) -> u32 {
        self.lines_added + self.lines_removed
    }

    /// Returns true if there are no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines_added == 0 && self.lines_removed == 0
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Parses unified-diff text into a [`DiffResult`].
#[must_use]
pub fn parse_unified_diff(diff: &str) -> DiffResult {
    let mut result = DiffResult::default();

    for line in diff.lines() {
        match classify_line(line) {
            DiffLine::Added(text) => result.added_content.push(text.to_string()),
            DiffLine::Removed(text) => result.removed_content.push(text.to_string()),
            DiffLine::Ignored => {}
        }
    }

    result.lines_added = saturating_u32(result.added_content.len());
    result.lines_removed = saturating_u32(result.removed_content.len());
    result
}

/// Counts the lines of a file's content.
///
/// A trailing newline does not start an extra line.
#[must_use]
pub fn count_lines(content: &str) -> usize {
    content.lines().count()
}

/// Source of unified diffs against the last committed state of a file.
pub trait VcsDiff: Send + Sync {
    /// Returns the unified diff of `path` against its committed state.
    ///
    /// # Errors
    ///
    /// Returns a [`DiffError`] when the diff cannot be produced; the
    /// extractor then falls back to line counting.
    fn diff_file(&self, path: &Path) -> impl Future<Output = Result<String, DiffError>> + Send;
}

/// Live diff source that shells out to the `git` CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    async fn run(dir: &Path, args: &[&str], file_name: &std::ffi::OsStr) -> Result<std::process::Output, DiffError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .arg("--")
            .arg(file_name)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }
}

impl VcsDiff for GitCli {
    async fn diff_file(&self, path: &Path) -> Result<String, DiffError> {
        let invalid = || DiffError::InvalidPath(path.to_path_buf());
        let dir = path.parent().ok_or_else(invalid)?;
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let file_name = path.file_name().ok_or_else(invalid)?;

        let output = Self::run(dir, &["diff", "HEAD", "--no-color", "--no-ext-diff"], file_name).await?;
        if !output.status.success() {
            return Err(DiffError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let diff = String::from_utf8_lossy(&output.stdout).into_owned();
        if diff.trim().is_empty() {
            // An empty diff is also what git prints for untracked files.
            let tracked = Self::run(dir, &["ls-files", "--error-unmatch"], file_name).await?;
            if !tracked.status.success() {
                return Err(DiffError::Untracked(path.to_path_buf()));
            }
        }

        Ok(diff)
    }
}

/// Diff source for workspaces outside version control.
///
/// Always fails, so every observation uses the line-count fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCountOnly;

impl VcsDiff for LineCountOnly {
    async fn diff_file(&self, path: &Path) -> Result<String, DiffError> {
        Err(DiffError::Untracked(path.to_path_buf()))
    }
}

/// Extracts line deltas for files, with a line-count fallback.
///
/// The fallback cache is the only mutable state. It is locked for the
/// cache update only, never across the diff invocation or file read, so
/// extractions for different files can interleave freely.
#[derive(Debug)]
pub struct DiffExtractor<D> {
    vcs: D,
    line_counts: Mutex<LruCache<PathBuf, usize>>,
}

impl<D: VcsDiff> DiffExtractor<D> {
    /// Creates an extractor with the default fallback cache size.
    #[must_use]
    pub fn new(vcs: D) -> Self {
        Self::with_cache_size(vcs, DEFAULT_LINE_CACHE_SIZE)
    }

    /// Creates an extractor remembering at most `capacity` files.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_cache_size(vcs: D, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            vcs,
            line_counts: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the line delta of `path`.
    ///
    /// Never fails: an unreadable file yields an empty result and a log entry.
    pub async fn extract_change(&self, path: &Path) -> DiffResult {
        match self.vcs.diff_file(path).await {
            Ok(diff) => {
                let result = parse_unified_diff(&diff);
                trace!(
                    path = %path.display(),
                    lines_added = result.lines_added,
                    lines_removed = result.lines_removed,
                    "Parsed version-control diff"
                );
                result
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Diff unavailable, counting lines");
                self.fallback(path).await
            }
        }
    }

    /// Drops the cached line count for a removed file.
    pub async fn forget(&self, path: &Path) {
        self.line_counts.lock().await.pop(path);
    }

    /// Returns the cached line count for `path`, if any.
    pub async fn cached_line_count(&self, path: &Path) -> Option<usize> {
        self.line_counts.lock().await.peek(path).copied()
    }

    async fn fallback(&self, path: &Path) -> DiffResult {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to read file for line count");
                return DiffResult::default();
            }
        };

        let new_count = count_lines(&content);
        let old_count = self
            .line_counts
            .lock()
            .await
            .put(path.to_path_buf(), new_count)
            .unwrap_or(0);

        DiffResult::from_line_counts(old_count, new_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct FixedDiff(&'static str);

    impl VcsDiff for FixedDiff {
        async fn diff_file(&self, _path: &Path) -> Result<String, DiffError> {
            Ok(self.0.to_string())
        }
    }

    fn lines(n: usize) -> String {
        (0..n).map(|i| format!("line {i}\n")).collect()
    }

    // =========================================================================
    // Line classification
    // =========================================================================

    #[test]
    fn classify_strips_marker_and_trims() {
        assert_eq!(classify_line("+\tlet a = 1;  "), DiffLine::Added("let a = 1;"));
        assert_eq!(classify_line("-    return;"), DiffLine::Removed("return;"));
    }

    #[test]
    fn classify_ignores_headers_and_context() {
        assert_eq!(classify_line("--- a/file.rs"), DiffLine::Ignored);
        assert_eq!(classify_line("+++ b/file.rs"), DiffLine::Ignored);
        assert_eq!(classify_line("@@ -1,3 +1,4 @@"), DiffLine::Ignored);
        assert_eq!(classify_line("diff --git a/x b/x"), DiffLine::Ignored);
        assert_eq!(classify_line("\\ No newline at end of file"), DiffLine::Ignored);
        assert_eq!(classify_line(""), DiffLine::Ignored);
    }

    #[test]
    fn classify_bare_markers_are_empty_lines() {
        assert_eq!(classify_line("+"), DiffLine::Added(""));
        assert_eq!(classify_line("-"), DiffLine::Removed(""));
    }

    #[test]
    fn parse_counts_each_bucket_independently() {
        let diff = "\
diff --git a/a.ts b/a.ts
index 83db48f..bf269f4 100644
--- a/a.ts
+++ b/a.ts
@@ -1,3 +1,3 @@
-const x = 1;
+const y = 2;
 unchanged
@@ -10,2 +10,3 @@
+const x = 1;
-old();
+new();
";
        let result = parse_unified_diff(diff);

        assert_eq!(result.lines_added, 3);
        assert_eq!(result.lines_removed, 2);
        assert_eq!(result.added_content, vec!["const y = 2;", "const x = 1;", "new();"]);
        assert_eq!(result.removed_content, vec!["const x = 1;", "old();"]);
    }

    #[test]
    fn parse_empty_diff_is_empty() {
        let result = parse_unified_diff("");
        assert!(result.is_empty());
        assert_eq!(result.total_changes(), 0);
    }

    #[test]
    fn from_line_counts_never_goes_negative() {
        assert_eq!(DiffResult::from_line_counts(10, 15).lines_added, 5);
        assert_eq!(DiffResult::from_line_counts(10, 15).lines_removed, 0);
        assert_eq!(DiffResult::from_line_counts(15, 10).lines_added, 0);
        assert_eq!(DiffResult::from_line_counts(15, 10).lines_removed, 5);
        assert!(DiffResult::from_line_counts(7, 7).is_empty());
    }

    #[test]
    fn count_lines_ignores_trailing_newline() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\nb\n"), 2);
    }

    // =========================================================================
    // Extractor
    // =========================================================================

    #[tokio::test]
    async fn primary_path_uses_diff_and_leaves_cache_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, lines(3)).unwrap();

        let extractor = DiffExtractor::new(FixedDiff("+added\n-removed\n"));
        let result = extractor.extract_change(&path).await;

        assert_eq!(result.lines_added, 1);
        assert_eq!(result.lines_removed, 1);
        assert_eq!(extractor.cached_line_count(&path).await, None);
    }

    #[tokio::test]
    async fn fallback_reports_growth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        let extractor = DiffExtractor::new(LineCountOnly);

        fs::write(&path, lines(10)).unwrap();
        extractor.extract_change(&path).await;

        fs::write(&path, lines(15)).unwrap();
        let result = extractor.extract_change(&path).await;

        assert_eq!(result.lines_added, 5);
        assert_eq!(result.lines_removed, 0);
        assert!(result.added_content.is_empty());
    }

    #[tokio::test]
    async fn fallback_reports_shrink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        let extractor = DiffExtractor::new(LineCountOnly);

        fs::write(&path, lines(15)).unwrap();
        extractor.extract_change(&path).await;

        fs::write(&path, lines(10)).unwrap();
        let result = extractor.extract_change(&path).await;

        assert_eq!(result.lines_added, 0);
        assert_eq!(result.lines_removed, 5);
        assert_eq!(extractor.cached_line_count(&path).await, Some(10));
    }

    #[tokio::test]
    async fn fallback_misses_same_length_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        let extractor = DiffExtractor::new(LineCountOnly);

        fs::write(&path, "a\nb\nc\nkeep\n").unwrap();
        extractor.extract_change(&path).await;

        fs::write(&path, "x\ny\nz\nkeep\n").unwrap();
        let result = extractor.extract_change(&path).await;

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn fallback_first_sight_counts_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        fs::write(&path, lines(4)).unwrap();

        let extractor = DiffExtractor::new(LineCountOnly);
        let result = extractor.extract_change(&path).await;

        assert_eq!(result.lines_added, 4);
    }

    #[tokio::test]
    async fn unreadable_file_reports_zero() {
        let dir = TempDir::new().unwrap();
        let extractor = DiffExtractor::new(LineCountOnly);

        let result = extractor.extract_change(&dir.path().join("missing.rs")).await;

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn forget_clears_cached_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, lines(2)).unwrap();

        let extractor = DiffExtractor::new(LineCountOnly);
        extractor.extract_change(&path).await;
        assert_eq!(extractor.cached_line_count(&path).await, Some(2));

        extractor.forget(&path).await;
        assert_eq!(extractor.cached_line_count(&path).await, None);
    }

    #[tokio::test]
    async fn cache_evicts_least_recently_seen_file() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, lines(1)).unwrap();
        fs::write(&second, lines(1)).unwrap();

        let extractor = DiffExtractor::with_cache_size(LineCountOnly, 1);
        extractor.extract_change(&first).await;
        extractor.extract_change(&second).await;

        assert_eq!(extractor.cached_line_count(&first).await, None);
        assert_eq!(extractor.cached_line_count(&second).await, Some(1));
    }

    #[test]
    fn diff_error_display_messages() {
        let err = DiffError::Untracked(PathBuf::from("/w/new.rs"));
        assert_eq!(err.to_string(), "file is not tracked: /w/new.rs");

        let err = DiffError::InvalidPath(PathBuf::from("/"));
        assert!(err.to_string().contains("invalid file path"));
    }
}

//! Path classification helpers for observed files.

use std::path::Path;

/// Project name used when none can be derived from a path.
pub const UNKNOWN_PROJECT: &str = "unknown";

/// Directory names whose contents are never observed.
pub const IGNORED_COMPONENTS: &[&str] = &[".git", "target", "node_modules"];

/// Returns true if `path` looks like a documentation file.
///
/// A file counts as documentation when its name contains `readme` or ends
/// with `.md`, ignoring case.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use codetrack_monitor::utils::paths::is_documentation;
///
/// assert!(is_documentation(Path::new("/w/README")));
/// assert!(is_documentation(Path::new("/w/docs/Guide.MD")));
/// assert!(!is_documentation(Path::new("/w/src/main.rs")));
/// ```
#[must_use]
pub fn is_documentation(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    name.contains("readme") || name.ends_with(".md")
}

/// Returns the extension of `path` with its leading dot, or an empty string.
#[must_use]
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Resolves the project a file belongs to.
///
/// A configured workspace name wins; otherwise the name of the file's
/// parent directory is used, falling back to [`UNKNOWN_PROJECT`].
#[must_use]
pub fn project_name_for(path: &Path, configured: Option<&str>) -> String {
    if let Some(name) = configured.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_PROJECT.to_string())
}

/// Returns true if changes to `path` must not be observed.
///
/// Anything under `store_root` is ignored so that snapshot writes never
/// trigger observations, as is anything inside an [`IGNORED_COMPONENTS`]
/// directory.
#[must_use]
pub fn is_ignored(path: &Path, store_root: Option<&Path>) -> bool {
    if store_root.is_some_and(|root| path.starts_with(root)) {
        return true;
    }
    path.components().any(|c| {
        let c = c.as_os_str();
        IGNORED_COMPONENTS.iter().any(|ignored| c == *ignored)
    })
}

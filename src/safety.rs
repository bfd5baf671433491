//! Path safety checks consulted before anything on disk is mutated.
//!
//! Every check works on a lexically normalized absolute path. `is_protected_path`
//! additionally resolves the parent directory on disk so a symlinked ancestor
//! cannot smuggle a protected location past the textual check.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Roots that stay mutable even though a deny-list entry is a textual ancestor.
/// Consulted before `PROTECTED_ROOTS`.
pub const SAFE_ROOTS: &[&str] = &[
    "/tmp",
    "/private/tmp",
    "/var/tmp",
    "/private/var/tmp",
    "/var/folders",
    "/private/var/folders",
];

/// OS-critical roots that are never modified.
pub const PROTECTED_ROOTS: &[&str] = &[
    "/System",
    "/bin",
    "/sbin",
    "/usr",
    "/etc",
    "/var",
    "/private/etc",
    "/private/var",
    "/cores",
    "/dev",
    "/boot",
    "/proc",
    "/sys",
    "/lib",
    "/lib64",
    "/Library/Apple",
    "/Library/Extensions",
    "/Library/Keychains",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SafetyError {
    #[error("path traversal detected: {}", .0.display())]
    Traversal(PathBuf),
    #[error("protected system path: {}", .0.display())]
    Protected(PathBuf),
    #[error("refusing to operate on the filesystem root")]
    RootDirectory,
    #[error("refusing to operate on the home directory itself")]
    HomeDirectory,
    #[error("empty path")]
    Empty,
}

/// Resolves `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

fn absolute_normalized(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize(&absolute)
}

fn is_root(path: &Path) -> bool {
    path.has_root() && path.parent().is_none()
}

/// Cheap syntactic check for `..` segments, used before any resolution.
/// Names that merely contain dots (`app..`) are not segments.
pub fn has_traversal_pattern(path: &Path) -> bool {
    path.components().any(|c| c == Component::ParentDir)
}

/// Resolves symlinks in the longest existing prefix of `path` and re-attaches
/// the components that do not exist yet.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(real) = fs::canonicalize(existing) {
            return missing.iter().rev().fold(real, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn within_any(path: &Path, roots: &[&str]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

fn matches_protected(path: &Path) -> bool {
    if within_any(path, SAFE_ROOTS) {
        return false;
    }
    within_any(path, PROTECTED_ROOTS)
}

/// True when `path` is, or lives under, a protected root and no safe root
/// carves it out.
pub fn is_protected_path(path: &Path) -> bool {
    let normalized = absolute_normalized(path);
    if matches_protected(&normalized) {
        return true;
    }

    // The lexical path may hide a protected location behind a symlinked
    // ancestor. The entry itself is not followed: removing a link is harmless.
    if let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name())
        && let Ok(real_parent) = fs::canonicalize(parent)
    {
        return matches_protected(&real_parent.join(name));
    }
    false
}

/// Path checks bound to one user's home directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    home: PathBuf,
}

impl PathGuard {
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self {
            home: absolute_normalized(home.as_ref()),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Expands a leading `~` and normalizes the result.
    ///
    /// Home-relative input must stay inside home unless `allow_outside_home`.
    pub fn expand_path(
        &self,
        path: impl AsRef<Path>,
        allow_outside_home: bool,
    ) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SafetyError::Empty);
        }

        let (expanded, home_relative) = match path.strip_prefix("~") {
            Ok(rest) => (self.home.join(rest), true),
            Err(_) => (path.to_path_buf(), false),
        };
        let resolved = absolute_normalized(&expanded);

        if home_relative && !allow_outside_home && !resolved.starts_with(&self.home) {
            return Err(SafetyError::Traversal(path.to_path_buf()));
        }
        Ok(resolved)
    }

    /// `None` when the path may be mutated, otherwise the reason it may not.
    pub fn validate_path_safety(&self, path: &Path) -> Option<SafetyError> {
        let normalized = absolute_normalized(path);
        if is_root(&normalized) {
            return Some(SafetyError::RootDirectory);
        }
        if normalized == self.home {
            return Some(SafetyError::HomeDirectory);
        }
        if is_protected_path(&normalized) {
            return Some(SafetyError::Protected(normalized));
        }
        None
    }

    /// Full check applied to every removal target.
    pub fn check_removable(&self, path: &Path) -> Result<(), SafetyError> {
        if path.as_os_str().is_empty() {
            return Err(SafetyError::Empty);
        }
        if !path.is_absolute() || has_traversal_pattern(path) {
            return Err(SafetyError::Traversal(path.to_path_buf()));
        }
        self.validate_path_safety(path).map_or(Ok(()), Err)
    }

    /// Full check applied to every restore target: it must land strictly
    /// inside home and pass `validate_path_safety`.
    pub fn check_restore_target(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        if has_traversal_pattern(path) {
            return Err(SafetyError::Traversal(path.to_path_buf()));
        }
        let normalized = absolute_normalized(path);
        if normalized == self.home {
            return Err(SafetyError::HomeDirectory);
        }
        if !normalized.starts_with(&self.home) {
            return Err(SafetyError::Traversal(path.to_path_buf()));
        }
        // A symlinked directory inside home may point anywhere.
        let real_home = fs::canonicalize(&self.home).unwrap_or_else(|_| self.home.clone());
        let real = resolve_existing_prefix(&normalized);
        if real == real_home || !real.starts_with(&real_home) {
            return Err(SafetyError::Traversal(path.to_path_buf()));
        }
        match self.validate_path_safety(&normalized) {
            Some(err) => Err(err),
            None => Ok(normalized),
        }
    }
}

use crate::backup::BackupManager;
use crate::model::{CleanResult, CleanableItem, ScanResult};
use crate::safety::{PathGuard, SafetyError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Called with the 1-based index and total before each item is processed.
pub type ItemProgress<'a> = &'a dyn Fn(usize, usize, &CleanableItem);

#[derive(Debug, thiserror::Error)]
pub enum RemoveError {
    #[error("rejected {}: {source}", path.display())]
    Rejected {
        path: PathBuf,
        #[source]
        source: SafetyError,
    },
    #[error("failed to remove {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RemoveError {
    /// Permission and not-found failures are routine on shared cache folders.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. }
                if matches!(source.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// A symbolic link was unlinked; its target was left alone.
    Unlinked,
    /// A regular file or directory tree was removed.
    Removed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub success: usize,
    pub failed: usize,
    pub freed: u64,
    pub errors: Vec<String>,
}

/// Validates `path` again and removes it, never following a symlink.
pub fn try_remove(guard: &PathGuard, path: &Path) -> Result<Removal, RemoveError> {
    guard
        .check_removable(path)
        .map_err(|source| RemoveError::Rejected {
            path: path.to_path_buf(),
            source,
        })?;

    let io_err = |source| RemoveError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Re-stat right before acting: the entry may have been swapped for a link
    // since it was scanned.
    let metadata = fs::symlink_metadata(path).map_err(io_err)?;
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        fs::remove_file(path).map_err(io_err)?;
        Ok(Removal::Unlinked)
    } else if file_type.is_dir() {
        fs::remove_dir_all(path).map_err(io_err)?;
        Ok(Removal::Removed)
    } else {
        fs::remove_file(path).map_err(io_err)?;
        Ok(Removal::Removed)
    }
}

pub(crate) fn log_failure(err: &RemoveError) {
    match err {
        RemoveError::Rejected { .. } => warn!("{err}"),
        RemoveError::Io { .. } if err.is_expected() => debug!("{err}"),
        RemoveError::Io { .. } => warn!("{err}"),
    }
}

/// Removes a single path. A dry run succeeds without touching the disk.
pub fn remove_item(guard: &PathGuard, path: &Path, dry_run: bool) -> bool {
    if dry_run {
        debug!("dry run: would remove {}", path.display());
        return true;
    }
    match try_remove(guard, path) {
        Ok(_) => true,
        Err(err) => {
            log_failure(&err);
            false
        }
    }
}

/// Removes items one at a time, in order.
pub fn remove_items(
    guard: &PathGuard,
    items: &[CleanableItem],
    dry_run: bool,
    on_progress: Option<ItemProgress<'_>>,
) -> RemovalSummary {
    let mut summary = RemovalSummary::default();
    let total = items.len();

    for (index, item) in items.iter().enumerate() {
        if let Some(cb) = on_progress {
            cb(index + 1, total, item);
        }

        let outcome = if dry_run {
            debug!("dry run: would remove {}", item.path.display());
            Ok(Removal::Removed)
        } else {
            try_remove(guard, &item.path)
        };

        match outcome {
            Ok(_) => {
                summary.success += 1;
                summary.freed += item.size;
            }
            Err(err) => {
                log_failure(&err);
                summary.failed += 1;
                summary.errors.push(err.to_string());
            }
        }
    }

    summary
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions<'a> {
    pub dry_run: bool,
    /// When set, items are moved into a backup session instead of deleted.
    pub backup: Option<&'a BackupManager>,
}

/// Cleans every item of the given scan results, one category at a time.
pub fn clean_results(
    guard: &PathGuard,
    results: &[ScanResult],
    options: CleanOptions<'_>,
    on_progress: Option<ItemProgress<'_>>,
) -> Vec<CleanResult> {
    let mut cleaned = Vec::with_capacity(results.len());

    for result in results {
        let summary = match options.backup {
            Some(manager) if !options.dry_run => {
                match manager.backup_items(&result.items, on_progress) {
                    Ok(outcome) => {
                        info!(
                            "{}: backed up {} item(s) to {}",
                            result.category,
                            outcome.success,
                            outcome.session.display()
                        );
                        RemovalSummary {
                            success: outcome.success,
                            failed: outcome.failed,
                            freed: outcome.freed,
                            errors: outcome.errors,
                        }
                    }
                    Err(err) => {
                        warn!("{}: backup unavailable: {err}", result.category);
                        RemovalSummary {
                            success: 0,
                            failed: result.items.len(),
                            freed: 0,
                            errors: vec![err.to_string()],
                        }
                    }
                }
            }
            _ => remove_items(guard, &result.items, options.dry_run, on_progress),
        };

        info!(
            "{}: cleaned {} item(s), {} failed",
            result.category, summary.success, summary.failed
        );
        cleaned.push(CleanResult {
            category: Some(result.category),
            cleaned_items: summary.success,
            freed_space: summary.freed,
            errors: summary.errors,
        });
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryId;
    use crate::paths;
    use anyhow::Result;
    use std::cell::RefCell;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn item(path: &Path, size: u64) -> CleanableItem {
        CleanableItem {
            path: path.to_path_buf(),
            size,
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            is_directory: path.is_dir(),
            modified: None,
        }
    }

    #[test]
    fn dry_run_leaves_disk_untouched() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());
        let file_path = dir.path().join("keep.txt");
        fs::write(&file_path, b"data")?;

        for _ in 0..3 {
            assert!(remove_item(&guard, &file_path, true));
        }
        assert_eq!(fs::read(&file_path)?, b"data");

        let summary = remove_items(&guard, &[item(&file_path, 4)], true, None);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.freed, 4);
        assert!(file_path.exists());
        Ok(())
    }

    #[test]
    fn removes_files_and_directories() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());

        let file_path = dir.path().join("file.log");
        File::create(&file_path)?.write_all(&[0u8; 10])?;
        let tree = dir.path().join("Cache");
        fs::create_dir_all(tree.join("nested"))?;
        fs::write(tree.join("nested/blob"), [1u8; 20])?;

        assert_eq!(try_remove(&guard, &file_path)?, Removal::Removed);
        assert_eq!(try_remove(&guard, &tree)?, Removal::Removed);
        assert!(!file_path.exists());
        assert!(!tree.exists());
        Ok(())
    }

    #[test]
    fn refuses_home_and_protected_paths() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());

        assert!(!remove_item(&guard, dir.path(), false));
        assert!(dir.path().exists());
        assert!(!remove_item(&guard, Path::new("/"), false));
        assert!(!remove_item(&guard, Path::new("/etc/hosts"), false));
        assert!(matches!(
            try_remove(&guard, Path::new("/usr/bin")),
            Err(RemoveError::Rejected { .. })
        ));
        Ok(())
    }

    #[test]
    fn missing_path_is_an_expected_failure() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());
        let err = try_remove(&guard, &dir.path().join("gone")).unwrap_err();
        assert!(err.is_expected());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn removing_symlink_keeps_target() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());

        let target = dir.path().join("important.txt");
        fs::write(&target, b"precious bytes")?;
        let target_dir = dir.path().join("important-dir");
        fs::create_dir(&target_dir)?;
        fs::write(target_dir.join("inner"), b"inner bytes")?;

        let file_link = dir.path().join("file-link");
        let dir_link = dir.path().join("dir-link");
        std::os::unix::fs::symlink(&target, &file_link)?;
        std::os::unix::fs::symlink(&target_dir, &dir_link)?;

        assert_eq!(try_remove(&guard, &file_link)?, Removal::Unlinked);
        assert_eq!(try_remove(&guard, &dir_link)?, Removal::Unlinked);

        assert!(fs::symlink_metadata(&file_link).is_err());
        assert!(fs::symlink_metadata(&dir_link).is_err());
        assert_eq!(fs::read(&target)?, b"precious bytes");
        assert_eq!(fs::read(target_dir.join("inner"))?, b"inner bytes");
        Ok(())
    }

    #[test]
    fn remove_items_accumulates_and_reports_progress() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());

        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, [0u8; 5])?;
        fs::write(&b, [0u8; 7])?;
        let missing = dir.path().join("missing");

        let seen = RefCell::new(Vec::new());
        let cb = |index: usize, total: usize, _: &CleanableItem| {
            seen.borrow_mut().push((index, total));
        };
        let items = [item(&a, 5), item(&missing, 100), item(&b, 7)];
        let summary = remove_items(&guard, &items, false, Some(&cb));

        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.freed, 12);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
        Ok(())
    }

    #[test]
    fn clean_results_reports_per_category() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());
        let file_path = dir.path().join("old.log");
        fs::write(&file_path, [0u8; 3])?;

        let results = [ScanResult::new(CategoryId::SystemLogs, vec![item(&file_path, 3)])];
        let cleaned = clean_results(&guard, &results, CleanOptions::default(), None);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].category, Some(CategoryId::SystemLogs));
        assert_eq!(cleaned[0].cleaned_items, 1);
        assert_eq!(cleaned[0].freed_space, 3);
        assert!(cleaned[0].errors.is_empty());
        assert!(!file_path.exists());
        Ok(())
    }

    fn cached_blob(home: &Path) -> Result<PathBuf> {
        let cache = home.join("Library/Caches/app");
        fs::create_dir_all(&cache)?;
        fs::write(cache.join("blob"), [7u8; 9])?;
        Ok(cache)
    }

    #[test]
    fn clean_results_moves_items_into_backup_session() -> Result<()> {
        let home = tempdir()?;
        let guard = PathGuard::new(home.path());
        let manager = BackupManager::new(home.path(), 7);
        let cache = cached_blob(home.path())?;

        let results = [ScanResult::new(CategoryId::SystemCache, vec![item(&cache, 9)])];
        let options = CleanOptions {
            dry_run: false,
            backup: Some(&manager),
        };
        let cleaned = clean_results(&guard, &results, options, None);

        assert_eq!(cleaned[0].cleaned_items, 1);
        assert_eq!(cleaned[0].freed_space, 9);
        assert!(cleaned[0].errors.is_empty());
        assert!(!cache.exists());

        let sessions = manager.list_backups();
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            fs::read(sessions[0].path.join("HOME/Library/Caches/app/blob"))?,
            [7u8; 9]
        );
        Ok(())
    }

    #[test]
    fn dry_run_with_backup_touches_nothing() -> Result<()> {
        let home = tempdir()?;
        let guard = PathGuard::new(home.path());
        let manager = BackupManager::new(home.path(), 7);
        let cache = cached_blob(home.path())?;

        let results = [ScanResult::new(CategoryId::SystemCache, vec![item(&cache, 9)])];
        let options = CleanOptions {
            dry_run: true,
            backup: Some(&manager),
        };
        let cleaned = clean_results(&guard, &results, options, None);

        assert_eq!(cleaned[0].cleaned_items, 1);
        assert_eq!(cleaned[0].freed_space, 9);
        assert!(cache.join("blob").exists());
        assert!(!manager.root().exists());
        Ok(())
    }

    #[test]
    fn unusable_backup_root_fails_every_item() -> Result<()> {
        let home = tempdir()?;
        let guard = PathGuard::new(home.path());
        let manager = BackupManager::new(home.path(), 7);
        let cache = cached_blob(home.path())?;
        let other = home.path().join("old.log");
        fs::write(&other, b"log")?;
        // a plain file where the tool directory should be
        fs::write(paths::tool_home(home.path()), b"")?;

        let results = [ScanResult::new(
            CategoryId::SystemCache,
            vec![item(&cache, 9), item(&other, 3)],
        )];
        let options = CleanOptions {
            dry_run: false,
            backup: Some(&manager),
        };
        let cleaned = clean_results(&guard, &results, options, None);

        assert_eq!(cleaned[0].cleaned_items, 0);
        assert_eq!(cleaned[0].freed_space, 0);
        assert_eq!(cleaned[0].errors.len(), 1);
        assert!(cache.exists());
        assert!(other.exists());
        Ok(())
    }

    #[test]
    fn names_ending_in_dots_are_removable() -> Result<()> {
        let dir = tempdir()?;
        let guard = PathGuard::new(dir.path());
        let odd = dir.path().join("app..");
        fs::create_dir(&odd)?;
        fs::write(odd.join("f"), b"x")?;

        assert_eq!(try_remove(&guard, &odd.join("f"))?, Removal::Removed);
        assert_eq!(try_remove(&guard, &odd)?, Removal::Removed);
        assert!(!odd.exists());
        Ok(())
    }
}

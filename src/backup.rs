//! Backup sessions: items are moved (not copied) under
//! `~/.mac-cleaner/backup/<timestamp>/HOME/...` so a session mirrors the
//! home-relative layout of what it holds and can be moved back later.

use crate::cleaner::ItemProgress;
use crate::model::CleanableItem;
use crate::paths;
use crate::safety::{PathGuard, SafetyError, normalize};
use crate::scanner::utils::calculate_item_stats;
use chrono::Local;
use jwalk::WalkDir;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Top-level segment standing in for the user's home directory.
pub const HOME_PLACEHOLDER: &str = "HOME";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const MAX_SESSION_ATTEMPTS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("cannot create backup session under {}: {source}", root.display())]
    Session {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is outside the home directory", .0.display())]
    OutsideHome(PathBuf),
    #[error(transparent)]
    Rejected(#[from] SafetyError),
    #[error("destination already exists: {}", .0.display())]
    Occupied(PathBuf),
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub session: PathBuf,
    pub success: usize,
    pub failed: usize,
    pub freed: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl RestoreReport {
    fn rejected(message: String) -> Self {
        Self {
            failed: 1,
            errors: vec![message],
            ..Self::default()
        }
    }

    fn fail(&mut self, message: String) {
        debug!("restore: {message}");
        self.failed += 1;
        self.errors.push(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub size: u64,
    #[serde(skip)]
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    guard: PathGuard,
    root: PathBuf,
    retention: Duration,
}

impl BackupManager {
    pub fn new(home: &Path, retention_days: u32) -> Self {
        let guard = PathGuard::new(home);
        let root = paths::backup_root(guard.home());
        Self {
            guard,
            root,
            retention: Duration::from_secs(u64::from(retention_days) * SECONDS_PER_DAY),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh session directory named after the current local time.
    pub fn ensure_backup_dir(&self) -> Result<PathBuf, BackupError> {
        let session_err = |source| BackupError::Session {
            root: self.root.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(session_err)?;

        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S-%3f").to_string();
        for attempt in 0..MAX_SESSION_ATTEMPTS {
            let name = if attempt == 0 {
                stamp.clone()
            } else {
                format!("{stamp}-{attempt}")
            };
            let dir = self.root.join(name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(session_err(e)),
            }
        }
        Err(session_err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free session name",
        )))
    }

    /// Where `original` lands inside `session`.
    pub fn session_path(&self, original: &Path, session: &Path) -> Result<PathBuf, BackupError> {
        let normalized = normalize(original);
        match normalized.strip_prefix(self.guard.home()) {
            Ok(rel) if !rel.as_os_str().is_empty() => {
                Ok(session.join(HOME_PLACEHOLDER).join(rel))
            }
            _ => Err(BackupError::OutsideHome(original.to_path_buf())),
        }
    }

    pub fn try_backup_item(
        &self,
        item: &CleanableItem,
        session: &Path,
    ) -> Result<PathBuf, BackupError> {
        self.guard.check_removable(&item.path)?;
        let target = self.session_path(&item.path, session)?;

        if fs::symlink_metadata(&target).is_ok() {
            return Err(BackupError::Occupied(target));
        }
        let move_err = |source| BackupError::Move {
            from: item.path.clone(),
            to: target.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(move_err)?;
        }
        move_entry(&item.path, &target).map_err(move_err)?;
        Ok(target)
    }

    /// Moves one item into `session`. Returns false instead of erroring.
    pub fn backup_item(&self, item: &CleanableItem, session: &Path) -> bool {
        match self.try_backup_item(item, session) {
            Ok(_) => true,
            Err(err) => {
                debug!("backup of {} failed: {err}", item.path.display());
                false
            }
        }
    }

    /// Moves items into a new session, one at a time, in order.
    pub fn backup_items(
        &self,
        items: &[CleanableItem],
        on_progress: Option<ItemProgress<'_>>,
    ) -> Result<BackupOutcome, BackupError> {
        let session = self.ensure_backup_dir()?;
        let mut outcome = BackupOutcome {
            session,
            success: 0,
            failed: 0,
            freed: 0,
            errors: Vec::new(),
        };
        let total = items.len();

        for (index, item) in items.iter().enumerate() {
            if let Some(cb) = on_progress {
                cb(index + 1, total, item);
            }
            match self.try_backup_item(item, &outcome.session) {
                Ok(_) => {
                    outcome.success += 1;
                    outcome.freed += item.size;
                }
                Err(err) => {
                    warn!("backup failed: {err}");
                    outcome.failed += 1;
                    outcome.errors.push(err.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// Canonical session path, if it sits strictly below the backup root.
    fn resolve_session(&self, session: &Path) -> Option<PathBuf> {
        let root = fs::canonicalize(&self.root).ok()?;
        let resolved = fs::canonicalize(session).ok()?;
        (resolved != root && resolved.starts_with(&root) && resolved.is_dir()).then_some(resolved)
    }

    /// Moves every entry of `session` back to where it came from.
    ///
    /// Bad entries are recorded and skipped; the walk always runs to the end.
    pub fn restore_backup(&self, session: &Path) -> RestoreReport {
        let Some(session) = self.resolve_session(session) else {
            return RestoreReport::rejected(format!(
                "Invalid backup directory: {} is not a session under {}",
                session.display(),
                self.root.display()
            ));
        };

        let mut report = RestoreReport::default();
        let mut entries = Vec::new();
        for entry in WalkDir::new(&session)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::Serial)
        {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {}
                Ok(entry) => entries.push(entry.path()),
                Err(err) => report.fail(format!("unreadable backup entry: {err}")),
            }
        }

        for entry in entries {
            let Ok(rel) = entry.strip_prefix(&session) else {
                report.fail(format!("{}: outside expected structure", entry.display()));
                continue;
            };

            let mut components = rel.components();
            let target = match components.next() {
                Some(Component::Normal(first)) if first == HOME_PLACEHOLDER => {
                    let sub = components.as_path();
                    if sub.as_os_str().is_empty() {
                        debug!("restore: skipping bare {HOME_PLACEHOLDER} entry");
                        report.skipped += 1;
                        continue;
                    }
                    self.guard.home().join(sub)
                }
                _ => {
                    report.fail(format!("{}: outside expected structure", rel.display()));
                    continue;
                }
            };

            let target = match self.guard.check_restore_target(&target) {
                Ok(target) => target,
                Err(err) => {
                    report.fail(format!("{}: {err}", rel.display()));
                    continue;
                }
            };
            if fs::symlink_metadata(&target).is_ok() {
                report.fail(format!("{}: already exists", target.display()));
                continue;
            }

            if let Some(parent) = target.parent()
                && let Err(err) = fs::create_dir_all(parent)
            {
                report.fail(format!("{}: {err}", target.display()));
                continue;
            }
            // parents may have been replaced by links while they were created
            if let Err(err) = self.guard.check_restore_target(&target) {
                report.fail(format!("{}: {err}", rel.display()));
                continue;
            }
            match move_entry(&entry, &target) {
                Ok(()) => report.success += 1,
                Err(err) => report.fail(format!("{}: {err}", target.display())),
            }
        }

        if report.failed == 0
            && report.skipped == 0
            && let Err(err) = fs::remove_dir_all(&session)
        {
            debug!("could not remove restored session {}: {err}", session.display());
        }
        info!(
            "restored {} item(s) from {}, {} failed",
            report.success,
            session.display(),
            report.failed
        );
        report
    }

    /// Removes sessions older than the retention window. Never fails.
    pub fn clean_old_backups(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries.flatten() {
            let Ok(metadata) = fs::symlink_metadata(entry.path()) else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > self.retention {
                match fs::remove_dir_all(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(err) => debug!("could not expire {}: {err}", entry.path().display()),
                }
            }
        }

        if removed > 0 {
            info!("expired {removed} backup session(s)");
        }
        removed
    }

    /// Sessions with their total size, newest first.
    pub fn list_backups(&self) -> Vec<BackupInfo> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut sessions: Vec<BackupInfo> = entries
            .flatten()
            .filter_map(|entry| {
                let metadata = fs::symlink_metadata(entry.path()).ok()?;
                if !metadata.is_dir() {
                    return None;
                }
                let path = entry.path();
                let size = calculate_item_stats(&path).size;
                Some(BackupInfo {
                    path,
                    size,
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                })
            })
            .collect();

        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        sessions
    }
}

/// Renames `from` to `to`, falling back to copy-and-delete across volumes.
fn move_entry(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => move_across_devices(from, to),
        other => other,
    }
}

fn move_across_devices(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(from)?.file_type().is_symlink() {
        return relink(from, to);
    }

    // move_items keeps the source name, which always matches `to` here
    let parent = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    let options = fs_extra::dir::CopyOptions::new();
    fs_extra::move_items(&[from], parent, &options)
        .map(|_| ())
        .map_err(|e| io::Error::other(e.to_string()))
}

#[cfg(unix)]
fn relink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)?;
    fs::remove_file(from)
}

#[cfg(not(unix))]
fn relink(from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot move link {} across volumes", from.display()),
    ))
}

use crate::config::Config;
use crate::constants::{
    DESKTOP_DIR, DOCUMENTS_DIR, DOWNLOADS_DIR, IOS_BACKUPS, LEGACY_MAIL_DOWNLOADS,
    MAIL_DOWNLOADS, MAX_SEARCH_DEPTH, MOVIES_DIR,
};
use crate::model::{CategoryId, ScanResult};
use crate::scanner::utils::{days, find_large_files};
use crate::scanner::{PathScanner, ScanContext, Scanner};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Downloads untouched for `downloadsAgeDays`.
pub fn downloads_scanner(home: &Path, config: &Config) -> PathScanner {
    PathScanner {
        min_age: Some(days(config.downloads_age_days)),
        ..PathScanner::new(CategoryId::Downloads, vec![home.join(DOWNLOADS_DIR)])
    }
}

pub fn ios_backups_scanner(home: &Path) -> PathScanner {
    PathScanner::new(CategoryId::IosBackups, vec![home.join(IOS_BACKUPS)])
}

pub fn mail_attachments_scanner(home: &Path) -> PathScanner {
    PathScanner::new(
        CategoryId::MailAttachments,
        vec![home.join(MAIL_DOWNLOADS), home.join(LEGACY_MAIL_DOWNLOADS)],
    )
}

/// Individual files above `largeFileThresholdMb` in the usual user folders.
#[derive(Debug, Clone)]
pub struct LargeFilesScanner {
    roots: Vec<PathBuf>,
    min_size: u64,
}

impl LargeFilesScanner {
    pub fn new(home: &Path, config: &Config) -> Self {
        let mut roots: Vec<PathBuf> = [DOWNLOADS_DIR, DOCUMENTS_DIR, DESKTOP_DIR, MOVIES_DIR]
            .iter()
            .map(|rel| home.join(rel))
            .collect();
        roots.extend(config.extra_paths.projects.iter().cloned());
        Self {
            roots,
            min_size: config.large_file_threshold_bytes(),
        }
    }
}

impl Scanner for LargeFilesScanner {
    fn category(&self) -> CategoryId {
        CategoryId::LargeFiles
    }

    fn scan(&self, ctx: &ScanContext) -> Result<ScanResult> {
        let mut items: Vec<_> = self
            .roots
            .iter()
            .filter(|root| root.exists())
            .flat_map(|root| find_large_files(root, self.min_size, MAX_SEARCH_DEPTH, &ctx.ignore))
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items.dedup_by(|a, b| a.path == b.path);
        items.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(ScanResult::new(CategoryId::LargeFiles, items))
    }
}

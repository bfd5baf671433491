use crate::constants::{
    ARC_CACHE, BRAVE_CACHE, DOCKER_CACHE, EDGE_CACHE, FIREFOX_CACHE, GOOGLE_CHROME_CACHE,
    GO_BUILD_CACHE, HOMEBREW_CACHE, LIBRARY_CACHES, LIBRARY_LOGS, PIP_CACHE, SAFARI_CACHE,
    SYSTEM_LIBRARY_CACHES, SYSTEM_LIBRARY_LOGS, TEMP_MIN_AGE_DAYS, YARN_CACHE,
};
use crate::model::CategoryId;
use crate::scanner::PathScanner;
use crate::scanner::utils::days;
use std::path::{Path, PathBuf};

/// `~/Library/Caches` and `/Library/Caches`, minus the caches other
/// categories report.
pub fn system_cache_scanner(home: &Path) -> PathScanner {
    let exclude = [
        GOOGLE_CHROME_CACHE,
        SAFARI_CACHE,
        FIREFOX_CACHE,
        EDGE_CACHE,
        BRAVE_CACHE,
        ARC_CACHE,
        HOMEBREW_CACHE,
        YARN_CACHE,
        PIP_CACHE,
        GO_BUILD_CACHE,
        DOCKER_CACHE,
    ]
    .iter()
    .map(|rel| home.join(rel))
    .collect();

    PathScanner {
        exclude,
        ..PathScanner::new(
            CategoryId::SystemCache,
            vec![home.join(LIBRARY_CACHES), PathBuf::from(SYSTEM_LIBRARY_CACHES)],
        )
    }
}

/// `/private/var/log` is protected and deliberately absent.
pub fn system_logs_scanner(home: &Path) -> PathScanner {
    PathScanner::new(
        CategoryId::SystemLogs,
        vec![home.join(LIBRARY_LOGS), PathBuf::from(SYSTEM_LIBRARY_LOGS)],
    )
}

pub fn temp_files_scanner(temp_dir: PathBuf) -> PathScanner {
    PathScanner {
        min_age: Some(days(TEMP_MIN_AGE_DAYS)),
        ..PathScanner::new(CategoryId::TempFiles, vec![temp_dir])
    }
}

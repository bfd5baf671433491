pub mod browsers;
pub mod dev;
pub mod docker;
pub mod language;
pub mod system;
pub mod trash;
pub mod user;
pub mod utils;

use crate::config::Config;
use crate::ignore::IgnoreList;
use crate::model::{CategoryId, ScanResult};
use crate::scanner::utils::{older_than, scan_path};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Read-only inputs shared by every scanner during one run.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub home: PathBuf,
    pub config: Arc<Config>,
    pub ignore: IgnoreList,
}

impl ScanContext {
    pub fn new(home: &Path, config: Arc<Config>) -> Self {
        let ignore = IgnoreList::load(home, &config);
        Self {
            home: home.to_path_buf(),
            config,
            ignore,
        }
    }
}

/// One category's enumeration. Implementations hold no mutable state, so any
/// number of them can run at once in any order.
pub trait Scanner: Send + Sync {
    fn category(&self) -> CategoryId;
    fn scan(&self, ctx: &ScanContext) -> Result<ScanResult>;
}

/// Lists the children of a fixed set of directories.
#[derive(Debug, Clone)]
pub struct PathScanner {
    pub category: CategoryId,
    pub paths: Vec<PathBuf>,
    /// Children reported by another category.
    pub exclude: Vec<PathBuf>,
    /// Only report items untouched for at least this long.
    pub min_age: Option<Duration>,
}

impl PathScanner {
    pub fn new(category: CategoryId, paths: Vec<PathBuf>) -> Self {
        Self {
            category,
            paths,
            exclude: Vec::new(),
            min_age: None,
        }
    }
}

impl Scanner for PathScanner {
    fn category(&self) -> CategoryId {
        self.category
    }

    fn scan(&self, ctx: &ScanContext) -> Result<ScanResult> {
        let mut all_items = Vec::new();

        for path in &self.paths {
            let (_, mut items) = scan_path(path, &ctx.ignore);
            all_items.append(&mut items);
        }

        all_items.retain(|item| !self.exclude.iter().any(|ex| item.path.starts_with(ex)));
        if let Some(min_age) = self.min_age {
            all_items = older_than(all_items, min_age);
        }

        Ok(ScanResult::new(self.category, all_items))
    }
}

/// Every scanner enabled by `config`, in registry order.
///
/// `duplicates` has no scanner: content comparison is out of scope.
pub fn get_all_scanners(home: &Path, config: &Config) -> Vec<Box<dyn Scanner>> {
    config
        .enabled_categories()
        .into_iter()
        .filter_map(|category| scanner_for(category, home, config))
        .collect()
}

pub fn scanner_for(category: CategoryId, home: &Path, config: &Config) -> Option<Box<dyn Scanner>> {
    let scanner: Box<dyn Scanner> = match category {
        CategoryId::SystemCache => Box::new(system::system_cache_scanner(home)),
        CategoryId::SystemLogs => Box::new(system::system_logs_scanner(home)),
        CategoryId::TempFiles => Box::new(system::temp_files_scanner(std::env::temp_dir())),
        CategoryId::BrowserCache => Box::new(browsers::browser_cache_scanner(home)),
        CategoryId::DevCache => Box::new(dev::developer_caches_scanner(home)),
        CategoryId::NodeModules => Box::new(dev::NodeModulesScanner::new(home, config)),
        CategoryId::Homebrew => Box::new(dev::homebrew_scanner(home)),
        CategoryId::Docker => Box::new(docker::docker_scanner(home)),
        CategoryId::Downloads => Box::new(user::downloads_scanner(home, config)),
        CategoryId::Trash => Box::new(trash::trash_scanner(home)),
        CategoryId::IosBackups => Box::new(user::ios_backups_scanner(home)),
        CategoryId::MailAttachments => Box::new(user::mail_attachments_scanner(home)),
        CategoryId::LargeFiles => Box::new(user::LargeFilesScanner::new(home, config)),
        CategoryId::LanguageFiles => Box::new(language::LanguageFilesScanner::from_env()),
        CategoryId::Duplicates => return None,
    };
    Some(scanner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn registry_skips_duplicates_and_excluded() {
        let home = Path::new("/Users/test");
        let all = get_all_scanners(home, &Config::default());
        assert_eq!(all.len(), CategoryId::ALL.len() - 1);
        assert!(all.iter().all(|s| s.category() != CategoryId::Duplicates));

        let config = Config {
            exclude_categories: vec![CategoryId::Trash, CategoryId::Docker],
            ..Config::default()
        };
        let some = get_all_scanners(home, &config);
        assert_eq!(some.len(), CategoryId::ALL.len() - 3);
        assert!(some.iter().all(|s| s.category() != CategoryId::Trash));
    }

    #[test]
    fn path_scanner_applies_exclusions() -> anyhow::Result<()> {
        let home = tempdir()?;
        let caches = home.path().join("Library/Caches");
        fs::create_dir_all(caches.join("Homebrew"))?;
        fs::create_dir_all(caches.join("com.example.app"))?;
        fs::write(caches.join("com.example.app/data"), [0u8; 8])?;

        let scanner = PathScanner {
            exclude: vec![caches.join("Homebrew")],
            ..PathScanner::new(CategoryId::SystemCache, vec![caches.clone()])
        };
        let ctx = ScanContext::new(home.path(), Arc::new(Config::default()));
        let result = scanner.scan(&ctx)?;

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].name, "com.example.app");
        assert_eq!(result.total_size, 8);
        Ok(())
    }
}

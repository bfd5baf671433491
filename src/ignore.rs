use crate::config::{Config, validate_extra_path};
use crate::paths;
use crate::safety::PathGuard;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const IGNORE_FILE: &str = "ignore.txt";

/// Paths the user never wants reported by a scan.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    rules: Vec<PathBuf>,
}

impl IgnoreList {
    pub fn new(rules: Vec<PathBuf>) -> Self {
        Self { rules }
    }

    /// Merges `ignorePaths` from the config with `~/.mac-cleaner/ignore.txt`.
    /// A missing or unreadable file contributes nothing.
    pub fn load(home: &Path, config: &Config) -> Self {
        let guard = PathGuard::new(home);
        let mut rules = config.ignore_paths.clone();

        let ignore_path = paths::tool_home(guard.home()).join(IGNORE_FILE);
        if let Ok(file) = fs::File::open(&ignore_path) {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(Result::ok) {
                let trimmed = line.trim();
                // Skip empty lines and comments
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                match validate_extra_path(&guard, trimmed) {
                    Some(rule) => rules.push(rule),
                    None => warn!("{}: dropping disallowed rule {trimmed}", ignore_path.display()),
                }
            }
        }

        Self { rules }
    }

    /// True for a rule itself and anything below it.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.rules.iter().any(|rule| path.starts_with(rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn is_ignored_matches_whole_components() {
        let ignore = IgnoreList::new(vec![
            PathBuf::from("/Users/test/Secret"),
            PathBuf::from("/Users/test/Projects/Keep"),
        ]);

        assert!(ignore.is_ignored(Path::new("/Users/test/Secret")));
        assert!(ignore.is_ignored(Path::new("/Users/test/Secret/file.txt")));
        assert!(ignore.is_ignored(Path::new("/Users/test/Projects/Keep")));

        assert!(!ignore.is_ignored(Path::new("/Users/test/SecretSauce")));
        assert!(!ignore.is_ignored(Path::new("/Users/test/Projects/DeleteMe")));
        assert!(!ignore.is_ignored(Path::new("/Users/test/Public")));
    }

    #[test]
    fn load_merges_file_and_config() -> Result<()> {
        let home = tempdir()?;
        let dir = paths::tool_home(home.path());
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join(IGNORE_FILE),
            "# comment\n\n~/Downloads/keep\n/etc\n",
        )?;

        let config = Config {
            ignore_paths: vec![home.path().join("Library/Caches/app")],
            ..Config::default()
        };
        let ignore = IgnoreList::load(home.path(), &config);

        assert!(ignore.is_ignored(&home.path().join("Downloads/keep/a.zip")));
        assert!(ignore.is_ignored(&home.path().join("Library/Caches/app")));
        assert!(!ignore.is_ignored(Path::new("/etc/hosts")));
        assert!(!ignore.is_ignored(&home.path().join("Downloads/other")));
        Ok(())
    }
}

use std::path::{Path, PathBuf};

/// Name of the per-user directory holding backups and configuration.
pub const TOOL_DIR: &str = ".mac-cleaner";
pub const BACKUP_DIR: &str = "backup";
pub const CONFIG_FILE: &str = "config.json";
pub const XDG_CONFIG_DIR: &str = ".config/mac-cleaner";

/// Resolves the home directory of the invoking user.
///
/// Under `sudo` the process home is root's, so `SUDO_USER` wins.
pub fn resolve_home() -> Option<PathBuf> {
    if let Ok(sudo_user) = std::env::var("SUDO_USER")
        && !sudo_user.is_empty()
        && !sudo_user.contains('/')
    {
        return Some(PathBuf::from("/Users").join(sudo_user));
    }
    dirs::home_dir()
}

/// `~/.mac-cleaner`
pub fn tool_home(home: &Path) -> PathBuf {
    home.join(TOOL_DIR)
}

/// `~/.mac-cleaner/backup`
pub fn backup_root(home: &Path) -> PathBuf {
    tool_home(home).join(BACKUP_DIR)
}

/// Directories a configuration file is allowed to live in.
pub fn config_dirs(home: &Path) -> [PathBuf; 2] {
    [tool_home(home), home.join(XDG_CONFIG_DIR)]
}

/// Candidate configuration files, in lookup order.
pub fn config_candidates(home: &Path) -> Vec<PathBuf> {
    config_dirs(home)
        .into_iter()
        .map(|dir| dir.join(CONFIG_FILE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_locations_hang_off_home() {
        let home = Path::new("/Users/test");
        assert_eq!(
            backup_root(home),
            PathBuf::from("/Users/test/.mac-cleaner/backup")
        );
        assert_eq!(
            config_candidates(home),
            vec![
                PathBuf::from("/Users/test/.mac-cleaner/config.json"),
                PathBuf::from("/Users/test/.config/mac-cleaner/config.json"),
            ]
        );
    }
}

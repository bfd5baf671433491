use crate::constants::{APPLICATIONS_DIR, KEEP_LPROJ};
use crate::ignore::IgnoreList;
use crate::model::{CategoryId, CleanableItem, ScanResult};
use crate::scanner::utils::calculate_item_stats;
use crate::scanner::{ScanContext, Scanner};
use anyhow::Result;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// `.lproj` bundles inside installed apps for languages the user does not use.
#[derive(Debug, Clone)]
pub struct LanguageFilesScanner {
    apps_dir: PathBuf,
    keep: Vec<String>,
}

impl LanguageFilesScanner {
    pub fn new(apps_dir: PathBuf, user_languages: &[String]) -> Self {
        let mut keep: Vec<String> = KEEP_LPROJ.iter().map(ToString::to_string).collect();
        keep.extend(user_languages.iter().cloned());
        Self { apps_dir, keep }
    }

    /// Keeps the languages named by `LANG` (`ja_JP.UTF-8` keeps `ja` and `ja_JP`).
    pub fn from_env() -> Self {
        let languages = std::env::var("LANG")
            .map(|lang| locale_languages(&lang))
            .unwrap_or_default();
        Self::new(PathBuf::from(APPLICATIONS_DIR), &languages)
    }

    fn is_kept(&self, lproj: &Path) -> bool {
        let Some(stem) = lproj.file_stem().map(|s| s.to_string_lossy()) else {
            return true;
        };
        self.keep
            .iter()
            .any(|lang| stem.eq_ignore_ascii_case(lang) || stem.replace('-', "_") == *lang)
    }

    fn unused_lproj(&self, app: &Path, ignore: &IgnoreList) -> Vec<CleanableItem> {
        let resources = app.join("Contents/Resources");
        let Ok(entries) = fs::read_dir(&resources) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "lproj"))
            .filter(|p| !self.is_kept(p) && !ignore.is_ignored(p))
            .map(|p| calculate_item_stats(&p))
            .collect()
    }
}

fn locale_languages(lang: &str) -> Vec<String> {
    let locale = lang.split('.').next().unwrap_or_default();
    if locale.is_empty() || locale == "C" || locale == "POSIX" {
        return Vec::new();
    }
    let mut out = vec![locale.to_string()];
    if let Some((language, _)) = locale.split_once('_') {
        out.push(language.to_string());
    }
    out
}

impl Scanner for LanguageFilesScanner {
    fn category(&self) -> CategoryId {
        CategoryId::LanguageFiles
    }

    fn scan(&self, ctx: &ScanContext) -> Result<ScanResult> {
        let apps: Vec<PathBuf> = match fs::read_dir(&self.apps_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "app"))
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut items: Vec<CleanableItem> = apps
            .par_iter()
            .flat_map_iter(|app| self.unused_lproj(app, &ctx.ignore))
            .collect();
        items.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(ScanResult::new(CategoryId::LanguageFiles, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn locale_languages_parse_lang() {
        assert_eq!(locale_languages("ja_JP.UTF-8"), vec!["ja_JP", "ja"]);
        assert_eq!(locale_languages("fr"), vec!["fr"]);
        assert!(locale_languages("C").is_empty());
    }

    #[test]
    fn reports_only_unused_localizations() -> Result<()> {
        let home = tempdir()?;
        let apps = tempdir()?;
        let resources = apps.path().join("Editor.app/Contents/Resources");
        for lproj in ["Base", "en", "de", "ja", "pt-BR"] {
            let dir = resources.join(format!("{lproj}.lproj"));
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("Localizable.strings"), [0u8; 10])?;
        }
        fs::write(resources.join("icon.icns"), [0u8; 99])?;

        let scanner = LanguageFilesScanner::new(apps.path().to_path_buf(), &["ja".to_string()]);
        let ctx = ScanContext::new(home.path(), Arc::new(Config::default()));
        let result = scanner.scan(&ctx)?;

        let mut names: Vec<_> = result.items.iter().map(|i| i.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["de.lproj", "pt-BR.lproj"]);
        assert_eq!(result.total_size, 20);
        Ok(())
    }
}

use crate::config::Config;
use crate::constants::{
    BUN_CACHE, CARGO_REGISTRY_CACHE, CORE_SIMULATOR_CACHES, GO_BUILD_CACHE, GRADLE_CACHE,
    HOMEBREW_CACHE, MAX_SEARCH_DEPTH, NODE_MODULES, NPM_CACHE, PIP_CACHE, PNPM_STORE,
    PROJECTS_DIR, XCODE_DERIVED_DATA, YARN_CACHE,
};
use crate::model::{CategoryId, ScanResult};
use crate::scanner::utils::scan_recursive_for_target;
use crate::scanner::{PathScanner, ScanContext, Scanner};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Caches for npm, bun, pnpm, yarn, pip, go, cargo, gradle and Xcode.
pub fn developer_caches_scanner(home: &Path) -> PathScanner {
    let paths = [
        NPM_CACHE,
        BUN_CACHE,
        PNPM_STORE,
        YARN_CACHE,
        PIP_CACHE,
        GO_BUILD_CACHE,
        CARGO_REGISTRY_CACHE,
        GRADLE_CACHE,
        XCODE_DERIVED_DATA,
        CORE_SIMULATOR_CACHES,
    ]
    .iter()
    .map(|rel| home.join(rel))
    .collect();

    PathScanner::new(CategoryId::DevCache, paths)
}

pub fn homebrew_scanner(home: &Path) -> PathScanner {
    PathScanner::new(CategoryId::Homebrew, vec![home.join(HOMEBREW_CACHE)])
}

/// `node_modules` directories found below `~/Projects` and any configured roots.
#[derive(Debug, Clone)]
pub struct NodeModulesScanner {
    roots: Vec<PathBuf>,
}

impl NodeModulesScanner {
    pub fn new(home: &Path, config: &Config) -> Self {
        let mut roots = vec![home.join(PROJECTS_DIR)];
        for extra in config
            .extra_paths
            .projects
            .iter()
            .chain(&config.extra_paths.node_modules)
        {
            if !roots.iter().any(|root| extra.starts_with(root)) {
                roots.push(extra.clone());
            }
        }
        Self { roots }
    }
}

impl Scanner for NodeModulesScanner {
    fn category(&self) -> CategoryId {
        CategoryId::NodeModules
    }

    fn scan(&self, ctx: &ScanContext) -> Result<ScanResult> {
        let mut items: Vec<_> = self
            .roots
            .iter()
            .filter(|root| root.exists())
            .flat_map(|root| {
                scan_recursive_for_target(root, NODE_MODULES, MAX_SEARCH_DEPTH, &ctx.ignore)
            })
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items.dedup_by(|a, b| a.path == b.path);
        items.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(ScanResult::new(CategoryId::NodeModules, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtraPaths;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn node_modules_scanner_searches_extra_roots() -> Result<()> {
        let home = tempdir()?;
        let projects = home.path().join(PROJECTS_DIR);
        fs::create_dir_all(projects.join("web/node_modules"))?;
        fs::write(projects.join("web/node_modules/a.js"), [0u8; 30])?;

        let code = home.path().join("Code");
        fs::create_dir_all(code.join("api/node_modules"))?;
        fs::write(code.join("api/node_modules/b.js"), [0u8; 70])?;

        let config = Config {
            extra_paths: ExtraPaths {
                projects: vec![code, projects.join("web")],
                node_modules: Vec::new(),
            },
            ..Config::default()
        };
        let scanner = NodeModulesScanner::new(home.path(), &config);
        assert_eq!(scanner.roots.len(), 2);

        let ctx = ScanContext::new(home.path(), Arc::new(config));
        let result = scanner.scan(&ctx)?;
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.total_size, 100);
        assert_eq!(result.items[0].size, 70);
        Ok(())
    }
}

use crate::constants::{
    ARC_CACHE, BRAVE_CACHE, EDGE_CACHE, FIREFOX_CACHE, GOOGLE_CHROME_CACHE, SAFARI_CACHE,
};
use crate::model::CategoryId;
use crate::scanner::PathScanner;
use std::path::Path;

pub fn browser_cache_scanner(home: &Path) -> PathScanner {
    let paths = [
        GOOGLE_CHROME_CACHE,
        SAFARI_CACHE,
        FIREFOX_CACHE,
        EDGE_CACHE,
        BRAVE_CACHE,
        ARC_CACHE,
    ]
    .iter()
    .map(|rel| home.join(rel))
    .filter(|path| path.exists())
    .collect();

    PathScanner::new(CategoryId::BrowserCache, paths)
}

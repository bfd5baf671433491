use crate::constants::TRASH_DIR;
use crate::model::CategoryId;
use crate::scanner::PathScanner;
use std::path::Path;

pub fn trash_scanner(home: &Path) -> PathScanner {
    PathScanner::new(CategoryId::Trash, vec![home.join(TRASH_DIR)])
}

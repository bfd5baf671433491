use crate::ignore::IgnoreList;
use crate::model::CleanableItem;
use crate::safety::normalize;
use jwalk::WalkDir;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub fn days(n: u32) -> Duration {
    Duration::from_secs(u64::from(n) * SECONDS_PER_DAY)
}

/// Lists the direct children of `target_path` as items, largest first.
pub fn scan_path(target_path: &Path, ignore: &IgnoreList) -> (u64, Vec<CleanableItem>) {
    let entries: Vec<PathBuf> = match fs::read_dir(target_path) {
        Ok(read_dir) => read_dir.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(err) => {
            debug!("skipping {}: {err}", target_path.display());
            return (0, vec![]);
        }
    };

    let mut items: Vec<CleanableItem> = entries
        .par_iter()
        .filter(|path| !ignore.is_ignored(path))
        .map(|path| calculate_item_stats(path))
        .collect();

    let total_size: u64 = items.iter().map(|i| i.size).sum();
    items.sort_by(|a, b| b.size.cmp(&a.size));
    (total_size, items)
}

/// Recursively searches for directories named `target_name` (e.g. "`node_modules`").
/// Matches are not descended into.
pub fn scan_recursive_for_target(
    root_path: &Path,
    target_name: &str,
    max_depth: usize,
    ignore: &IgnoreList,
) -> Vec<CleanableItem> {
    let target = target_name.to_string();
    let walker = WalkDir::new(root_path)
        .skip_hidden(true)
        .follow_links(false)
        .max_depth(max_depth)
        .process_read_dir(move |_depth, _path, _state, children| {
            for entry in children.iter_mut().flatten() {
                if entry.file_name().to_string_lossy() == target {
                    entry.read_children_path = None;
                }
            }
        });

    let found_paths: Vec<PathBuf> = walker
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_dir() && e.file_name().to_string_lossy() == target_name)
        .map(|e| e.path())
        .filter(|p| !ignore.is_ignored(p))
        .collect();

    let mut items: Vec<CleanableItem> = found_paths
        .par_iter()
        .map(|path| calculate_item_stats(path))
        .collect();

    items.sort_by(|a, b| b.size.cmp(&a.size));
    items
}

/// Regular files of at least `min_size` bytes anywhere below `root_path`.
pub fn find_large_files(
    root_path: &Path,
    min_size: u64,
    max_depth: usize,
    ignore: &IgnoreList,
) -> Vec<CleanableItem> {
    let mut items: Vec<CleanableItem> = WalkDir::new(root_path)
        .skip_hidden(true)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let metadata = e.metadata().ok()?;
            let path = e.path();
            (metadata.len() >= min_size && !ignore.is_ignored(&path)).then(|| CleanableItem {
                name: display_name(&path),
                path: normalize(&path),
                size: metadata.len(),
                is_directory: false,
                modified: metadata.modified().ok(),
            })
        })
        .collect();

    items.sort_by(|a, b| b.size.cmp(&a.size));
    items
}

/// Keeps only items whose newest modification is older than `min_age`.
/// Items without a known modification time are dropped.
pub fn older_than(items: Vec<CleanableItem>, min_age: Duration) -> Vec<CleanableItem> {
    let now = SystemTime::now();
    items
        .into_iter()
        .filter(|item| {
            item.modified
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age >= min_age)
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |n| n.to_string_lossy().into_owned(),
    )
}

/// Stats `path` without following a symlink at the top; directories are
/// sized by summing the regular files below them.
pub fn calculate_item_stats(path: &Path) -> CleanableItem {
    let mut item = CleanableItem {
        path: normalize(path),
        size: 0,
        name: display_name(path),
        is_directory: false,
        modified: None,
    };

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return item;
    };
    item.modified = metadata.modified().ok();
    if metadata.file_type().is_symlink() {
        return item;
    }
    if metadata.is_file() {
        item.size = metadata.len();
        return item;
    }
    item.is_directory = metadata.is_dir();

    let mut size = 0;
    let mut modified = item.modified.unwrap_or(SystemTime::UNIX_EPOCH);
    // Use serial execution for individual item size calculation to avoid resource exhaustion
    for entry in WalkDir::new(path)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .into_iter()
        .flatten()
    {
        if let Ok(metadata) = entry.metadata() {
            if metadata.is_file() {
                size += metadata.len();
            }
            if let Ok(m) = metadata.modified()
                && m > modified
            {
                modified = m;
            }
        }
    }

    item.size = size;
    item.modified = Some(modified);
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn scan_path_structure() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();

        let folder_a = root.join("FolderA");
        fs::create_dir(&folder_a)?;
        let mut f1 = File::create(folder_a.join("file1.txt"))?;
        f1.write_all(&[0u8; 100])?;

        let folder_b = root.join("FolderB");
        fs::create_dir(&folder_b)?;
        let mut f2 = File::create(folder_b.join("file2.txt"))?;
        f2.write_all(&[0u8; 200])?;

        let (total_size, items) = scan_path(root, &IgnoreList::default());

        assert_eq!(total_size, 300);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "FolderB");
        assert!(items[0].is_directory);
        assert!(items.iter().all(|i| i.path.is_absolute()));
        Ok(())
    }

    #[test]
    fn scan_path_honours_ignore_list() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("keep"), [0u8; 10])?;
        fs::write(dir.path().join("drop"), [0u8; 10])?;

        let ignore = IgnoreList::new(vec![dir.path().join("keep")]);
        let (total_size, items) = scan_path(dir.path(), &ignore);
        assert_eq!(total_size, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "drop");
        Ok(())
    }

    #[test]
    fn scan_non_existent_path() {
        let path = PathBuf::from("/path/to/non/existent/directory/mac_cleaner_test_random_12345");
        let (total_size, items) = scan_path(&path, &IgnoreList::default());
        assert_eq!(total_size, 0);
        assert!(items.is_empty());
    }

    #[test]
    fn scan_recursive_for_target_test() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();

        let nm1 = root.join("Project1/node_modules");
        fs::create_dir_all(nm1.join("dep/node_modules"))?;
        fs::write(nm1.join("lib.js"), [0u8; 100])?;
        fs::write(nm1.join("dep/node_modules/inner.js"), [0u8; 50])?;

        let nm2 = root.join("Project2/node_modules");
        fs::create_dir_all(&nm2)?;
        fs::write(nm2.join("index.js"), [0u8; 200])?;

        let found_items =
            scan_recursive_for_target(root, "node_modules", 5, &IgnoreList::default());

        // nested node_modules are counted inside their parent, not reported twice
        assert_eq!(found_items.len(), 2);
        assert_eq!(found_items[0].size, 200);
        assert_eq!(found_items[1].size, 150);
        Ok(())
    }

    #[test]
    fn find_large_files_filters_by_size() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("a/b"))?;
        fs::write(dir.path().join("a/b/big.iso"), [0u8; 4096])?;
        fs::write(dir.path().join("small.txt"), [0u8; 16])?;

        let items = find_large_files(dir.path(), 1024, 6, &IgnoreList::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "big.iso");
        assert_eq!(items[0].size, 4096);
        Ok(())
    }

    #[test]
    fn older_than_uses_modification_time() -> Result<()> {
        let dir = tempdir()?;
        let old = dir.path().join("old.dmg");
        let new = dir.path().join("new.dmg");
        fs::write(&old, b"o")?;
        fs::write(&new, b"n")?;
        File::options()
            .write(true)
            .open(&old)?
            .set_modified(SystemTime::now() - days(40))?;

        let (_, items) = scan_path(dir.path(), &IgnoreList::default());
        let stale = older_than(items, days(30));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].name, "old.dmg");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed_for_size() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("target");
        fs::create_dir(&target)?;
        fs::write(target.join("payload"), [0u8; 500])?;
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link)?;

        let item = calculate_item_stats(&link);
        assert_eq!(item.size, 0);
        assert!(!item.is_directory);
        Ok(())
    }
}

//! User configuration.
//!
//! The file is untrusted input: each key is validated on its own and any bad
//! value falls back to its default with a warning. Loading never fails.

use crate::model::{CategoryId, SafetyLevel};
use crate::paths;
use crate::safety::PathGuard;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Upper bound on the size of a configuration file.
pub const MAX_CONFIG_BYTES: u64 = 64 * 1024;

/// Roots (besides home) that extra scan paths may point into.
const EXTRA_PATH_ROOTS: &[&str] = &["/Users", "/Volumes"];

struct IntBounds {
    key: &'static str,
    min: i64,
    max: i64,
    default: i64,
}

const DOWNLOADS_AGE_DAYS: IntBounds = IntBounds {
    key: "downloadsAgeDays",
    min: 1,
    max: 3650,
    default: 30,
};
const LARGE_FILE_THRESHOLD_MB: IntBounds = IntBounds {
    key: "largeFileThresholdMb",
    min: 1,
    max: 1_048_576,
    default: 500,
};
const BACKUP_RETENTION_DAYS: IntBounds = IntBounds {
    key: "backupRetentionDays",
    min: 1,
    max: 365,
    default: 7,
};
const CONCURRENCY: IntBounds = IntBounds {
    key: "concurrency",
    min: 1,
    max: 16,
    default: 4,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is outside the allowed configuration directories", .0.display())]
    Disallowed(PathBuf),
    #[error("{} exceeds {MAX_CONFIG_BYTES} bytes", .0.display())]
    TooLarge(PathBuf),
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("configuration root must be an object")]
    NotAnObject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraPaths {
    pub node_modules: Vec<PathBuf>,
    pub projects: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub downloads_age_days: u32,
    pub large_file_threshold_mb: u64,
    pub backup_enabled: bool,
    pub backup_retention_days: u32,
    pub parallel_scans: bool,
    pub concurrency: usize,
    pub default_categories: Vec<CategoryId>,
    pub exclude_categories: Vec<CategoryId>,
    pub extra_paths: ExtraPaths,
    pub ignore_paths: Vec<PathBuf>,
    pub per_item_confirmation: Vec<SafetyLevel>,
}

impl Default for Config {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn default() -> Self {
        Self {
            downloads_age_days: DOWNLOADS_AGE_DAYS.default as u32,
            large_file_threshold_mb: LARGE_FILE_THRESHOLD_MB.default as u64,
            backup_enabled: false,
            backup_retention_days: BACKUP_RETENTION_DAYS.default as u32,
            parallel_scans: true,
            concurrency: CONCURRENCY.default as usize,
            default_categories: CategoryId::ALL.to_vec(),
            exclude_categories: Vec::new(),
            extra_paths: ExtraPaths::default(),
            ignore_paths: Vec::new(),
            per_item_confirmation: vec![SafetyLevel::Risky],
        }
    }
}

impl Config {
    /// Categories to scan: the default set minus exclusions, registry order.
    pub fn enabled_categories(&self) -> Vec<CategoryId> {
        CategoryId::ALL
            .into_iter()
            .filter(|id| self.default_categories.contains(id))
            .filter(|id| !self.exclude_categories.contains(id))
            .collect()
    }

    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.large_file_threshold_mb.saturating_mul(1024 * 1024)
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            per_item: self.per_item_confirmation.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    PerItem,
    WholeCategory,
}

/// Which safety levels ask for confirmation item by item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    per_item: Vec<SafetyLevel>,
}

impl ConfirmationPolicy {
    pub fn mode(&self, category: CategoryId) -> ConfirmMode {
        if self.per_item.contains(&category.safety()) {
            ConfirmMode::PerItem
        } else {
            ConfirmMode::WholeCategory
        }
    }
}

/// Integral JSON number, whether written as `30` or `30.0`.
#[allow(clippy::cast_possible_truncation)]
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0)
            .map(|f| f as i64)
    })
}

fn int_field(record: &Map<String, Value>, bounds: &IntBounds) -> i64 {
    let Some(value) = record.get(bounds.key) else {
        return bounds.default;
    };
    match as_integer(value) {
        Some(n) if (bounds.min..=bounds.max).contains(&n) => n,
        _ => {
            warn!(
                "config: {} must be an integer in [{}, {}], got {value}; using {}",
                bounds.key, bounds.min, bounds.max, bounds.default
            );
            bounds.default
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn bool_field(record: &Map<String, Value>, key: &str, default: bool) -> bool {
    record.get(key).map_or(default, truthy)
}

fn array_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    let value = record.get(key)?;
    let array = value.as_array();
    if array.is_none() {
        warn!("config: {key} must be an array; using default");
    }
    array
}

fn category_list(record: &Map<String, Value>, key: &str) -> Option<Vec<CategoryId>> {
    let entries = array_field(record, key)?;
    let ids = entries
        .iter()
        .filter_map(|entry| match entry.as_str().map(str::parse::<CategoryId>) {
            Some(Ok(id)) => Some(id),
            _ => {
                warn!("config: dropping unknown category {entry} from {key}");
                None
            }
        })
        .collect();
    Some(ids)
}

fn safety_list(record: &Map<String, Value>, key: &str) -> Option<Vec<SafetyLevel>> {
    let entries = array_field(record, key)?;
    let levels = entries
        .iter()
        .filter_map(|entry| match entry.as_str().map(str::parse::<SafetyLevel>) {
            Some(Ok(level)) => Some(level),
            _ => {
                warn!("config: dropping unknown safety level {entry} from {key}");
                None
            }
        })
        .collect();
    Some(levels)
}

/// Expands `raw` and accepts it only if it lands under home, `/Users` or
/// `/Volumes`.
pub fn validate_extra_path(guard: &PathGuard, raw: &str) -> Option<PathBuf> {
    let expanded = guard.expand_path(raw, true).ok()?;
    let allowed = expanded.starts_with(guard.home())
        || EXTRA_PATH_ROOTS
            .iter()
            .any(|root| expanded.starts_with(root) && expanded != Path::new(root));
    allowed.then_some(expanded)
}

fn path_list(guard: &PathGuard, entries: &[Value], key: &str) -> Vec<PathBuf> {
    entries
        .iter()
        .filter_map(|entry| {
            let path = entry.as_str().and_then(|raw| validate_extra_path(guard, raw));
            if path.is_none() {
                warn!("config: dropping disallowed path {entry} from {key}");
            }
            path
        })
        .collect()
}

/// Builds a `Config` from an untrusted JSON value, field by field.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn validate_config(raw: &Value, guard: &PathGuard) -> Config {
    let defaults = Config::default();
    let Some(record) = raw.as_object() else {
        warn!("config: root is not an object; using defaults");
        return defaults;
    };

    let extra_paths = match record.get("extraPaths") {
        None => ExtraPaths::default(),
        Some(Value::Object(extra)) => ExtraPaths {
            node_modules: array_field(extra, "nodeModules")
                .map(|v| path_list(guard, v, "extraPaths.nodeModules"))
                .unwrap_or_default(),
            projects: array_field(extra, "projects")
                .map(|v| path_list(guard, v, "extraPaths.projects"))
                .unwrap_or_default(),
        },
        Some(_) => {
            warn!("config: extraPaths must be an object; ignoring");
            ExtraPaths::default()
        }
    };

    Config {
        downloads_age_days: int_field(record, &DOWNLOADS_AGE_DAYS) as u32,
        large_file_threshold_mb: int_field(record, &LARGE_FILE_THRESHOLD_MB) as u64,
        backup_enabled: bool_field(record, "backupEnabled", defaults.backup_enabled),
        backup_retention_days: int_field(record, &BACKUP_RETENTION_DAYS) as u32,
        parallel_scans: bool_field(record, "parallelScans", defaults.parallel_scans),
        concurrency: int_field(record, &CONCURRENCY) as usize,
        default_categories: category_list(record, "defaultCategories")
            .unwrap_or(defaults.default_categories),
        exclude_categories: category_list(record, "excludeCategories")
            .unwrap_or(defaults.exclude_categories),
        extra_paths,
        ignore_paths: array_field(record, "ignorePaths")
            .map(|v| path_list(guard, v, "ignorePaths"))
            .unwrap_or_default(),
        per_item_confirmation: safety_list(record, "perItemConfirmation")
            .unwrap_or(defaults.per_item_confirmation),
    }
}

/// Reads and parses a config file that must live in one of `allowed_dirs`.
pub fn read_config_file(path: &Path, allowed_dirs: &[PathBuf]) -> Result<Value, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let real = fs::canonicalize(path).map_err(io_err)?;
    let inside = allowed_dirs
        .iter()
        .filter_map(|dir| fs::canonicalize(dir).ok())
        .any(|dir| real.starts_with(dir));
    if !inside {
        return Err(ConfigError::Disallowed(path.to_path_buf()));
    }

    let file = fs::File::open(&real).map_err(io_err)?;
    if file.metadata().map_err(io_err)?.len() > MAX_CONFIG_BYTES {
        return Err(ConfigError::TooLarge(path.to_path_buf()));
    }
    // the file may grow between stat and read
    let mut contents = String::new();
    file.take(MAX_CONFIG_BYTES + 1)
        .read_to_string(&mut contents)
        .map_err(io_err)?;
    if contents.len() as u64 > MAX_CONFIG_BYTES {
        return Err(ConfigError::TooLarge(path.to_path_buf()));
    }

    let value: Value = serde_json::from_str(&contents)?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject);
    }
    Ok(value)
}

/// Loads the first existing candidate config under `home`, or defaults.
pub fn load_config(home: &Path) -> Config {
    let guard = PathGuard::new(home);
    let allowed = paths::config_dirs(guard.home());

    for candidate in paths::config_candidates(guard.home()) {
        if fs::symlink_metadata(&candidate).is_err() {
            continue;
        }
        return match read_config_file(&candidate, &allowed) {
            Ok(raw) => {
                debug!("loaded config from {}", candidate.display());
                validate_config(&raw, &guard)
            }
            Err(err) => {
                warn!("ignoring config {}: {err}", candidate.display());
                Config::default()
            }
        };
    }
    Config::default()
}

/// Lazily loaded configuration shared by everything in one process.
#[derive(Debug)]
pub struct ConfigStore {
    home: PathBuf,
    cached: Mutex<Option<Arc<Config>>>,
}

impl ConfigStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cached: Mutex::new(None),
        }
    }

    /// Loads on first use; later calls return the cached value.
    pub fn get(&self) -> Arc<Config> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cached.get_or_insert_with(|| Arc::new(load_config(&self.home))))
    }

    /// Drops the cached value so the next `get` re-reads the file.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

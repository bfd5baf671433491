// Home-relative locations
pub const TRASH_DIR: &str = ".Trash";
pub const LIBRARY_LOGS: &str = "Library/Logs";
pub const LIBRARY_CACHES: &str = "Library/Caches";

// System-wide locations
pub const SYSTEM_LIBRARY_LOGS: &str = "/Library/Logs";
pub const SYSTEM_LIBRARY_CACHES: &str = "/Library/Caches";
pub const APPLICATIONS_DIR: &str = "/Applications";

pub const GOOGLE_CHROME_CACHE: &str = "Library/Caches/Google/Chrome";
pub const SAFARI_CACHE: &str = "Library/Caches/com.apple.Safari";
pub const FIREFOX_CACHE: &str = "Library/Caches/Firefox";
pub const EDGE_CACHE: &str = "Library/Caches/Microsoft Edge";
pub const BRAVE_CACHE: &str = "Library/Caches/BraveSoftware";
pub const ARC_CACHE: &str = "Library/Caches/company.thebrowser.Browser";
pub const HOMEBREW_CACHE: &str = "Library/Caches/Homebrew";

pub const DOWNLOADS_DIR: &str = "Downloads";
pub const DOCUMENTS_DIR: &str = "Documents";
pub const DESKTOP_DIR: &str = "Desktop";
pub const MOVIES_DIR: &str = "Movies";
pub const PROJECTS_DIR: &str = "Projects";

pub const XCODE_DERIVED_DATA: &str = "Library/Developer/Xcode/DerivedData";
pub const CORE_SIMULATOR_CACHES: &str = "Library/Developer/CoreSimulator/Caches";

pub const NPM_CACHE: &str = ".npm/_cacache";
pub const BUN_CACHE: &str = ".bun/install/cache";
pub const PNPM_STORE: &str = ".pnpm-store";
pub const YARN_CACHE: &str = "Library/Caches/Yarn";
pub const PIP_CACHE: &str = "Library/Caches/pip";
pub const GO_BUILD_CACHE: &str = "Library/Caches/go-build";
pub const CARGO_REGISTRY_CACHE: &str = ".cargo/registry/cache";
pub const GRADLE_CACHE: &str = ".gradle/caches";

pub const DOCKER_LOGS: &str = "Library/Containers/com.docker.docker/Data/log";
pub const DOCKER_CACHE: &str = "Library/Caches/com.docker.docker";
pub const DOCKER_BUILDX_CACHE: &str = ".docker/buildx/cache";

pub const IOS_BACKUPS: &str = "Library/Application Support/MobileSync/Backup";
pub const MAIL_DOWNLOADS: &str = "Library/Containers/com.apple.mail/Data/Library/Mail Downloads";
pub const LEGACY_MAIL_DOWNLOADS: &str = "Library/Mail Downloads";

pub const NODE_MODULES: &str = "node_modules";

/// Localizations kept regardless of the user's locale.
pub const KEEP_LPROJ: &[&str] = &["Base", "en", "English"];

/// Files in the temp directory younger than this are likely still in use.
pub const TEMP_MIN_AGE_DAYS: u32 = 1;
/// Depth limit for recursive searches under project roots.
pub const MAX_SEARCH_DEPTH: usize = 6;

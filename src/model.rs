use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryId {
    SystemCache,
    SystemLogs,
    BrowserCache,
    DevCache,
    NodeModules,
    Downloads,
    Trash,
    TempFiles,
    IosBackups,
    MailAttachments,
    LargeFiles,
    Duplicates,
    Docker,
    Homebrew,
    LanguageFiles,
}

impl CategoryId {
    pub const ALL: [Self; 15] = [
        Self::SystemCache,
        Self::SystemLogs,
        Self::BrowserCache,
        Self::DevCache,
        Self::NodeModules,
        Self::Downloads,
        Self::Trash,
        Self::TempFiles,
        Self::IosBackups,
        Self::MailAttachments,
        Self::LargeFiles,
        Self::Duplicates,
        Self::Docker,
        Self::Homebrew,
        Self::LanguageFiles,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemCache => "system-cache",
            Self::SystemLogs => "system-logs",
            Self::BrowserCache => "browser-cache",
            Self::DevCache => "dev-cache",
            Self::NodeModules => "node-modules",
            Self::Downloads => "downloads",
            Self::Trash => "trash",
            Self::TempFiles => "temp-files",
            Self::IosBackups => "ios-backups",
            Self::MailAttachments => "mail-attachments",
            Self::LargeFiles => "large-files",
            Self::Duplicates => "duplicates",
            Self::Docker => "docker",
            Self::Homebrew => "homebrew",
            Self::LanguageFiles => "language-files",
        }
    }

    /// The registry entry for this id. `CATEGORIES` is laid out in variant order.
    pub fn descriptor(self) -> &'static CategoryDescriptor {
        &CATEGORIES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn safety(self) -> SafetyLevel {
        self.descriptor().safety
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category id: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for CategoryId {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Moderate,
    Risky,
}

impl SafetyLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Moderate => "moderate",
            Self::Risky => "risky",
        }
    }
}

impl FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Self::Safe),
            "moderate" => Ok(Self::Moderate),
            "risky" => Ok(Self::Risky),
            other => Err(format!("unknown safety level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryGroup {
    System,
    Browsers,
    Development,
    Storage,
    Apps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryDescriptor {
    pub id: CategoryId,
    pub name: &'static str,
    pub group: CategoryGroup,
    pub safety: SafetyLevel,
    pub note: Option<&'static str>,
}

pub static CATEGORIES: [CategoryDescriptor; 15] = [
    CategoryDescriptor {
        id: CategoryId::SystemCache,
        name: "System Cache Files",
        group: CategoryGroup::System,
        safety: SafetyLevel::Safe,
        note: None,
    },
    CategoryDescriptor {
        id: CategoryId::SystemLogs,
        name: "System Log Files",
        group: CategoryGroup::System,
        safety: SafetyLevel::Safe,
        note: None,
    },
    CategoryDescriptor {
        id: CategoryId::BrowserCache,
        name: "Browser Cache",
        group: CategoryGroup::Browsers,
        safety: SafetyLevel::Safe,
        note: Some("Browsers may be slower on first launch while caches rebuild."),
    },
    CategoryDescriptor {
        id: CategoryId::DevCache,
        name: "Developer Caches",
        group: CategoryGroup::Development,
        safety: SafetyLevel::Moderate,
        note: Some("Package managers will re-download dependencies on next build."),
    },
    CategoryDescriptor {
        id: CategoryId::NodeModules,
        name: "Node Modules",
        group: CategoryGroup::Development,
        safety: SafetyLevel::Moderate,
        note: Some("Run your package manager's install command to restore."),
    },
    CategoryDescriptor {
        id: CategoryId::Downloads,
        name: "Old Downloads",
        group: CategoryGroup::Storage,
        safety: SafetyLevel::Risky,
        note: Some("Downloaded files are user data and cannot be re-fetched automatically."),
    },
    CategoryDescriptor {
        id: CategoryId::Trash,
        name: "Trash",
        group: CategoryGroup::Storage,
        safety: SafetyLevel::Safe,
        note: None,
    },
    CategoryDescriptor {
        id: CategoryId::TempFiles,
        name: "Temporary Files",
        group: CategoryGroup::System,
        safety: SafetyLevel::Safe,
        note: None,
    },
    CategoryDescriptor {
        id: CategoryId::IosBackups,
        name: "iOS Device Backups",
        group: CategoryGroup::Storage,
        safety: SafetyLevel::Risky,
        note: Some("Device backups may be the only copy of data on a lost device."),
    },
    CategoryDescriptor {
        id: CategoryId::MailAttachments,
        name: "Mail Attachments",
        group: CategoryGroup::Apps,
        safety: SafetyLevel::Moderate,
        note: Some("Mail re-downloads attachments from the server when opened."),
    },
    CategoryDescriptor {
        id: CategoryId::LargeFiles,
        name: "Large Files",
        group: CategoryGroup::Storage,
        safety: SafetyLevel::Risky,
        note: Some("Review each file before removing it."),
    },
    CategoryDescriptor {
        id: CategoryId::Duplicates,
        name: "Duplicate Files",
        group: CategoryGroup::Storage,
        safety: SafetyLevel::Risky,
        note: Some("Not scanned automatically."),
    },
    CategoryDescriptor {
        id: CategoryId::Docker,
        name: "Docker Data",
        group: CategoryGroup::Development,
        safety: SafetyLevel::Moderate,
        note: Some("Quit Docker Desktop before cleaning."),
    },
    CategoryDescriptor {
        id: CategoryId::Homebrew,
        name: "Homebrew Cache",
        group: CategoryGroup::Development,
        safety: SafetyLevel::Safe,
        note: None,
    },
    CategoryDescriptor {
        id: CategoryId::LanguageFiles,
        name: "Unused Language Files",
        group: CategoryGroup::Apps,
        safety: SafetyLevel::Risky,
        note: Some("Removing localizations from signed apps can break code signatures."),
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanableItem {
    pub path: PathBuf,
    pub size: u64,
    pub name: String,
    pub is_directory: bool,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub category: CategoryId,
    pub total_size: u64,
    pub items: Vec<CleanableItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn new(category: CategoryId, items: Vec<CleanableItem>) -> Self {
        let total_size = items.iter().map(|i| i.size).sum();
        Self {
            category,
            total_size,
            items,
            error: None,
        }
    }

    pub fn failed(category: CategoryId, error: impl Into<String>) -> Self {
        Self {
            category,
            total_size: 0,
            items: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanResult {
    pub category: Option<CategoryId>,
    pub cleaned_items: usize,
    pub freed_space: u64,
    pub errors: Vec<String>,
}

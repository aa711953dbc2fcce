use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{InstallerError, InstallerResult};

pub const APP_DIR_NAME: &str = "Syntax";
const SETTINGS_FILE: &str = "installer_settings.json";

pub const REPO_NAME: &str = "MojaveMF/syntax";
pub const SETUP_HOST: &str = "setup.syntax.eco";
pub const BASE_HOST: &str = "www.syntax.eco";

#[cfg(debug_assertions)]
pub const TARGET_BRANCH: &str = "main";

#[cfg(not(debug_assertions))]
pub const TARGET_BRANCH: &str = "release";

/// User-tunable installer settings, persisted as JSON in the data dir.
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    /// GitHub repository holding the client catalog (`owner/name`).
    pub repo: String,
    pub branch: String,
    /// Host serving the client archives.
    pub setup_host: String,
    /// Host written into AppSettings.xml.
    pub base_host: String,
    /// Emit progress events.
    pub verbose: bool,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            repo: REPO_NAME.to_string(),
            branch: TARGET_BRANCH.to_string(),
            setup_host: SETUP_HOST.to_string(),
            base_host: BASE_HOST.to_string(),
            verbose: true,
        }
    }
}

impl InstallerSettings {
    /// Load settings from `data_dir`, or defaults when the file is missing
    /// or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring corrupt settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> InstallerResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|source| InstallerError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|source| InstallerError::Io { path, source })
    }

    /// Raw URL of a file in the catalog repository.
    pub fn repo_file_url(&self, file: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            self.repo, self.branch, file
        )
    }

    /// URL of a downloadable archive on the setup host.
    pub fn archive_url(&self, name: &str) -> String {
        format!("https://{}/{}", self.setup_host, name)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

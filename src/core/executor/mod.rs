// ─── Command boundary ───
// Every side effect of an install goes through a named command with JSON
// arguments. The orchestration code only sees `CommandExecutor`; the
// `LocalExecutor` performs the commands natively on this machine.

pub mod local;
#[cfg(test)]
pub mod mock;
pub mod remote;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::error::InstallerResult;

pub use local::LocalExecutor;
pub use remote::Remote;

/// Named calls understood by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ValidClients,
    ClientManifest,
    LatestVersion,
    ClientFolder,
    DownloadZip,
    ExtractZip,
    PrepareClient,
    AvailableStudios,
    InstallStudio,
    StudioInstalled,
    CreateDirectories,
    GenerateAppSettings,
    DownloadTarget,
    ExtractTarget,
    Targets,
    IsInstalled,
}

impl Command {
    pub const ALL: [Command; 16] = [
        Command::ValidClients,
        Command::ClientManifest,
        Command::LatestVersion,
        Command::ClientFolder,
        Command::DownloadZip,
        Command::ExtractZip,
        Command::PrepareClient,
        Command::AvailableStudios,
        Command::InstallStudio,
        Command::StudioInstalled,
        Command::CreateDirectories,
        Command::GenerateAppSettings,
        Command::DownloadTarget,
        Command::ExtractTarget,
        Command::Targets,
        Command::IsInstalled,
    ];

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ValidClients => "get_valid_clients",
            Command::ClientManifest => "get_client_manifest",
            Command::LatestVersion => "get_latest_version",
            Command::ClientFolder => "get_client_folder",
            Command::DownloadZip => "download_zip",
            Command::ExtractZip => "extract_zip",
            Command::PrepareClient => "prepare_client",
            Command::AvailableStudios => "get_available_studio",
            Command::InstallStudio => "install_studio",
            Command::StudioInstalled => "studio_installed",
            Command::CreateDirectories => "create_directories",
            Command::GenerateAppSettings => "generate_app_settings",
            Command::DownloadTarget => "download_to_zip",
            Command::ExtractTarget => "extract_target",
            Command::Targets => "get_targets",
            Command::IsInstalled => "is_installed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executes named commands with loosely-typed JSON arguments.
///
/// Implementations report their own failures as errors; callers validate
/// the returned value before use.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn invoke(&self, command: Command, args: Value) -> InstallerResult<Value>;
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Command, CommandExecutor};
use crate::core::catalog::Manifest;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::studio::StudioIndex;

/// Typed front for a [`CommandExecutor`].
///
/// One method per command. Responses are validated here, so callers never
/// see an unchecked `Value`.
#[derive(Clone)]
pub struct Remote {
    executor: Arc<dyn CommandExecutor>,
}

impl Remote {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn call(&self, command: Command, args: Value) -> InstallerResult<Value> {
        debug!("invoke {} {}", command, args);
        self.executor.invoke(command, args).await
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        command: Command,
        args: Value,
    ) -> InstallerResult<T> {
        let value = self.call(command, args).await?;
        serde_json::from_value(value)
            .map_err(|e| InstallerError::validation(command.name(), e.to_string()))
    }

    // ── Catalog lookups ─────────────────────────────────

    pub async fn valid_clients(&self) -> InstallerResult<Vec<String>> {
        self.call_as(Command::ValidClients, Value::Null).await
    }

    pub async fn client_manifest(&self, year: &str) -> InstallerResult<Manifest> {
        let command = Command::ClientManifest;
        let value = self.call(command, json!({ "year": year })).await?;
        Manifest::from_value(command.name(), value)
    }

    pub async fn latest_version(&self) -> InstallerResult<String> {
        self.call_as(Command::LatestVersion, Value::Null).await
    }

    pub async fn client_folder(&self, year: &str, version: &str) -> InstallerResult<PathBuf> {
        let folder: String = self
            .call_as(
                Command::ClientFolder,
                json!({ "year": year, "version": version }),
            )
            .await?;
        Ok(PathBuf::from(folder))
    }

    pub async fn targets(&self) -> InstallerResult<Vec<String>> {
        self.call_as(Command::Targets, Value::Null).await
    }

    // ── Whole-manifest install ──────────────────────────

    pub async fn prepare_client(
        &self,
        year: &str,
        version: &str,
        manifest: &Manifest,
    ) -> InstallerResult<()> {
        self.call(
            Command::PrepareClient,
            json!({ "year": year, "version": version, "manifest": manifest }),
        )
        .await?;
        Ok(())
    }

    pub async fn download_zip(&self, name: &str) -> InstallerResult<()> {
        self.call(Command::DownloadZip, json!({ "name": name }))
            .await?;
        Ok(())
    }

    pub async fn extract_zip(&self, name: &str, destination: &Path) -> InstallerResult<()> {
        self.call(
            Command::ExtractZip,
            json!({ "name": name, "destination": destination.to_string_lossy() }),
        )
        .await?;
        Ok(())
    }

    // ── Target install ──────────────────────────────────

    pub async fn create_directories(&self, version: &str) -> InstallerResult<()> {
        self.call(Command::CreateDirectories, json!({ "version": version }))
            .await?;
        Ok(())
    }

    pub async fn generate_app_settings(&self, version: &str) -> InstallerResult<()> {
        self.call(Command::GenerateAppSettings, json!({ "version": version }))
            .await?;
        Ok(())
    }

    pub async fn download_target(&self, version: &str, name: &str) -> InstallerResult<()> {
        self.call(
            Command::DownloadTarget,
            json!({ "version": version, "name": name }),
        )
        .await?;
        Ok(())
    }

    pub async fn extract_target(&self, version: &str, name: &str) -> InstallerResult<()> {
        self.call(
            Command::ExtractTarget,
            json!({ "version": version, "name": name }),
        )
        .await?;
        Ok(())
    }

    /// Whether a client install is present. Any failure counts as "no".
    pub async fn is_installed(&self) -> bool {
        match self.call(Command::IsInstalled, Value::Null).await {
            Ok(Value::Bool(installed)) => installed,
            Ok(other) => {
                warn!("is_installed returned a non-boolean: {}", other);
                false
            }
            Err(e) => {
                warn!("is_installed failed: {}", e);
                false
            }
        }
    }

    // ── Studio ──────────────────────────────────────────

    pub async fn available_studios(&self) -> InstallerResult<StudioIndex> {
        let command = Command::AvailableStudios;
        let value = self.call(command, Value::Null).await?;
        StudioIndex::from_value(command.name(), value)
    }

    pub async fn install_studio(&self, year: &str, url: &str) -> InstallerResult<()> {
        self.call(Command::InstallStudio, json!({ "year": year, "url": url }))
            .await?;
        Ok(())
    }

    pub async fn studio_installed(&self, year: &str) -> InstallerResult<bool> {
        self.call_as(Command::StudioInstalled, json!({ "year": year }))
            .await
    }
}

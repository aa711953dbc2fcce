use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::info;

use super::manifest::Manifest;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::executor::Remote;

/// Memoizing front for the remote client catalog.
///
/// Each lookup is fetched at most once per catalog and then served from
/// memory. Concurrent first callers share the same in-flight fetch. A failed
/// fetch is not cached, so the next caller tries again. Nothing is ever
/// invalidated; a fresh catalog is needed to see remote changes.
pub struct RemoteCatalog {
    remote: Remote,
    valid_clients: OnceCell<Vec<String>>,
    latest_version: OnceCell<String>,
    manifests: Mutex<HashMap<String, Arc<OnceCell<Manifest>>>>,
}

impl RemoteCatalog {
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            valid_clients: OnceCell::new(),
            latest_version: OnceCell::new(),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Client years that can be installed.
    pub async fn valid_identifiers(&self) -> InstallerResult<&[String]> {
        let clients = self
            .valid_clients
            .get_or_try_init(|| async {
                let clients = self.remote.valid_clients().await?;
                info!("Loaded {} valid clients", clients.len());
                Ok::<_, InstallerError>(clients)
            })
            .await?;
        Ok(clients)
    }

    pub async fn is_valid(&self, year: &str) -> InstallerResult<bool> {
        Ok(self.valid_identifiers().await?.iter().any(|c| c == year))
    }

    /// Manifest for a client year. Unknown years fail before any manifest
    /// request is made.
    pub async fn manifest(&self, year: &str) -> InstallerResult<Manifest> {
        if !self.is_valid(year).await? {
            return Err(InstallerError::InvalidIdentifier(year.to_string()));
        }

        let cell = {
            let mut manifests = self
                .manifests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            manifests.entry(year.to_string()).or_default().clone()
        };

        let manifest = cell
            .get_or_try_init(|| async {
                let manifest = self.remote.client_manifest(year).await?;
                info!("Loaded manifest for {} ({} archives)", year, manifest.len());
                Ok::<_, InstallerError>(manifest)
            })
            .await?;
        Ok(manifest.clone())
    }

    pub async fn latest_version(&self) -> InstallerResult<&str> {
        let version = self
            .latest_version
            .get_or_try_init(|| async {
                let version = self.remote.latest_version().await?;
                info!("Latest client version is {}", version);
                Ok::<_, InstallerError>(version)
            })
            .await?;
        Ok(version)
    }
}

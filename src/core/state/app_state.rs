use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;

use super::settings::{default_data_dir, InstallerSettings};
use crate::core::catalog::RemoteCatalog;
use crate::core::error::InstallerResult;
use crate::core::executor::{CommandExecutor, LocalExecutor, Remote};
use crate::core::http::build_http_client;
use crate::core::installer::{InstallContext, InstallRequest, Installer};
use crate::core::progress::{Progress, ProgressSink};
use crate::core::studio::StudioCatalog;

/// Process-wide installer state. Holds the one catalog whose caches live
/// for the rest of the process.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: InstallerSettings,
    pub remote: Remote,
    pub catalog: Arc<RemoteCatalog>,
    pub studios: StudioCatalog,
}

impl AppState {
    /// State backed by the native executor, rooted at `data_dir` (or the
    /// platform data dir).
    pub fn new(data_dir: Option<PathBuf>) -> InstallerResult<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let settings = InstallerSettings::load(&data_dir);
        let http_client: Client = build_http_client()?;
        let executor = LocalExecutor::new(http_client, data_dir.clone(), settings.clone());

        Ok(Self::with_executor(data_dir, settings, Arc::new(executor)))
    }

    pub fn with_executor(
        data_dir: PathBuf,
        settings: InstallerSettings,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let remote = Remote::new(executor);
        let catalog = Arc::new(RemoteCatalog::new(remote.clone()));
        let studios = StudioCatalog::new(remote.clone());

        Self {
            data_dir,
            settings,
            remote,
            catalog,
            studios,
        }
    }

    /// Progress handle honouring the `verbose` setting.
    pub fn progress(&self, sink: Arc<dyn ProgressSink>) -> Progress {
        Progress::new(sink, self.settings.verbose)
    }

    pub fn installer(
        &self,
        request: InstallRequest,
        progress: Progress,
    ) -> InstallerResult<Installer> {
        let ctx = InstallContext::new(self.catalog.clone(), progress);
        Installer::new(ctx, request)
    }

    pub fn save_settings(&self) -> InstallerResult<()> {
        self.settings.save(&self.data_dir)
    }
}

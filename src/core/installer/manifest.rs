use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::catalog::{archive_name, Manifest};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::paths;

use super::context::InstallContext;
use super::dispatch::ArchiveInstaller;
use super::settle_all;

// Progress milestones of a whole-manifest install.
const MANIFEST_PERCENT: f64 = 0.0;
const PREPARED_PERCENT: f64 = 5.0;
const DOWNLOAD_START: f64 = 10.0;
const DOWNLOAD_STEP: f64 = 2.5;
const EXTRACT_START: f64 = 60.0;
const EXTRACT_STEP: f64 = 1.25;
const DONE_PERCENT: f64 = 100.0;

/// Where a whole-manifest install currently is. A failed run stays on the
/// phase that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Idle,
    FetchManifest,
    Prepare,
    Download,
    Extract,
    Done,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallPhase::Idle => write!(f, "idle"),
            InstallPhase::FetchManifest => write!(f, "fetch-manifest"),
            InstallPhase::Prepare => write!(f, "prepare"),
            InstallPhase::Download => write!(f, "download"),
            InstallPhase::Extract => write!(f, "extract"),
            InstallPhase::Done => write!(f, "done"),
        }
    }
}

/// Installs every archive listed in a client manifest.
///
/// Keeps no memory between runs: a retry downloads and extracts everything
/// again. Archives already on disk from a failed run are left in place.
pub struct ManifestInstaller {
    ctx: InstallContext,
    year: String,
    version: String,
    manifest: Option<Manifest>,
    phase: InstallPhase,
}

impl ManifestInstaller {
    pub fn new(ctx: InstallContext, year: String, version: String) -> Self {
        Self {
            ctx,
            year,
            version,
            manifest: None,
            phase: InstallPhase::Idle,
        }
    }

    pub fn phase(&self) -> InstallPhase {
        self.phase
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Fetch, prepare, download, extract. Each phase settles completely
    /// before the next one starts.
    pub async fn download(&mut self) -> InstallerResult<()> {
        info!("Installing client {} ({})", self.year, self.version);

        self.enter(InstallPhase::FetchManifest);
        self.report("Downloading client manifest", MANIFEST_PERCENT);
        self.manifest = Some(self.ctx.catalog.manifest(&self.year).await?);

        self.enter(InstallPhase::Prepare);
        self.report("Manifest downloaded. Preparing for download", PREPARED_PERCENT);
        self.prepare().await;

        self.enter(InstallPhase::Download);
        self.report("Preparations finished, downloading files", DOWNLOAD_START);
        self.download_files().await?;

        self.enter(InstallPhase::Extract);
        self.report("Downloads finished, extracting files", EXTRACT_START);
        self.extract_files().await?;

        self.enter(InstallPhase::Done);
        self.report("Download finished", DONE_PERCENT);
        info!("Client {} ({}) installed", self.year, self.version);
        Ok(())
    }

    fn enter(&mut self, phase: InstallPhase) {
        debug!("client {} install: {} -> {}", self.year, self.phase, phase);
        self.phase = phase;
    }

    fn report(&self, label: &str, percent: f64) {
        self.ctx.progress.report(label, percent);
    }

    fn loaded_manifest(&self) -> InstallerResult<&Manifest> {
        self.manifest
            .as_ref()
            .ok_or_else(|| InstallerError::Other("Manifest not loaded".into()))
    }

    /// Advisory: failures are logged and otherwise ignored.
    async fn prepare(&self) {
        let Some(manifest) = self.manifest.as_ref() else {
            return;
        };
        if let Err(e) = self
            .ctx
            .remote()
            .prepare_client(&self.year, &self.version, manifest)
            .await
        {
            warn!("Preparing client {} failed, continuing: {}", self.year, e);
        }
    }

    async fn download_files(&self) -> InstallerResult<()> {
        let manifest = self.loaded_manifest()?;
        let remote = self.ctx.remote();

        let mut percent = DOWNLOAD_START;
        let mut downloads = Vec::with_capacity(manifest.len());
        for key in manifest.keys() {
            percent = (percent + DOWNLOAD_STEP).min(EXTRACT_START);
            self.report(&format!("Downloading {key}"), percent);

            let name = archive_name(&self.version, key);
            downloads.push(async move { remote.download_zip(&name).await });
        }

        settle_all(downloads).await?;
        info!("Downloaded {} archives", manifest.len());
        Ok(())
    }

    async fn extract_files(&self) -> InstallerResult<()> {
        let manifest = self.loaded_manifest()?;
        let remote = self.ctx.remote();
        let folder = paths::client_folder(remote, &self.year, &self.version).await?;

        let mut percent = EXTRACT_START;
        let mut extractions = Vec::with_capacity(manifest.len());
        for (key, location) in manifest.entries() {
            percent = (percent + EXTRACT_STEP).min(DONE_PERCENT);
            self.report(&format!("Extracting {key}"), percent);

            let name = archive_name(&self.version, key);
            let destination = destination_in(&folder, location);
            extractions.push(async move { remote.extract_zip(&name, &destination).await });
        }

        settle_all(extractions).await?;
        info!("Extracted {} archives into {:?}", manifest.len(), folder);
        Ok(())
    }
}

#[async_trait]
impl ArchiveInstaller for ManifestInstaller {
    async fn install(&mut self) -> InstallerResult<()> {
        self.download().await
    }
}

/// Manifest destinations are relative to the client folder, even when the
/// remote sends a leading separator.
fn destination_in(folder: &Path, location: &str) -> PathBuf {
    folder.join(location.trim_start_matches(['/', '\\']))
}

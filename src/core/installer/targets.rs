use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::{InstallerError, InstallerResult};

use super::context::InstallContext;
use super::dispatch::ArchiveInstaller;
use super::settle_all;

const DOWNLOAD_STEP: f64 = 3.0;
const EXTRACT_STEP: f64 = 2.0;
const DOWNLOAD_START: f64 = 10.0;

/// Per-name completion markers of a [`TargetInstaller`].
///
/// `extracted` is always a subset of `downloaded`, and a name appears at
/// most once in each. `percent` only ever grows.
#[derive(Debug, Default)]
pub struct PipelineState {
    downloaded: Vec<String>,
    extracted: Vec<String>,
    percent: f64,
}

impl PipelineState {
    fn mark_downloaded(&mut self, name: &str) {
        if !self.is_downloaded(name) {
            self.downloaded.push(name.to_string());
        }
    }

    fn mark_extracted(&mut self, name: &str) {
        if self.is_downloaded(name) && !self.is_extracted(name) {
            self.extracted.push(name.to_string());
        }
    }

    fn is_downloaded(&self, name: &str) -> bool {
        self.downloaded.iter().any(|n| n == name)
    }

    fn is_extracted(&self, name: &str) -> bool {
        self.extracted.iter().any(|n| n == name)
    }

    fn advance(&mut self, step: f64) -> f64 {
        self.percent += step;
        self.percent
    }

    fn raise_to(&mut self, floor: f64) -> f64 {
        self.percent = self.percent.max(floor);
        self.percent
    }
}

/// Installs an explicit subset of a version's archives.
///
/// Repeated calls are cheap: names already downloaded or extracted are
/// skipped, so a failed install can be resumed on the same instance.
/// `install` must not run twice concurrently on one instance.
pub struct TargetInstaller {
    ctx: InstallContext,
    year: String,
    version: String,
    targets: Vec<String>,
    state: Mutex<PipelineState>,
}

impl TargetInstaller {
    pub fn new(
        ctx: InstallContext,
        year: String,
        version: String,
        targets: Vec<String>,
    ) -> InstallerResult<Self> {
        if targets.is_empty() {
            return Err(InstallerError::validation(
                "targets",
                "at least one target is required",
            ));
        }

        Ok(Self {
            ctx,
            year,
            version,
            targets,
            state: Mutex::new(PipelineState::default()),
        })
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.targets.iter().any(|target| target == name)
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.state().downloaded.clone()
    }

    pub fn extracted(&self) -> Vec<String> {
        self.state().extracted.clone()
    }

    pub fn percent(&self) -> f64 {
        self.state().percent
    }

    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn report(&self, label: &str, percent: f64) {
        self.ctx.progress.report(label, percent);
    }

    /// Download one target. No-op for names that are not targets or were
    /// already downloaded.
    pub async fn download_file(&self, name: &str) -> InstallerResult<()> {
        let percent = {
            let state = self.state();
            if state.is_downloaded(name) || !self.has_target(name) {
                debug!("skip download of {}", name);
                return Ok(());
            }
            state.percent
        };

        self.report(&format!("Downloading {name}"), percent);
        self.ctx.remote().download_target(&self.version, name).await?;

        let percent = {
            let mut state = self.state();
            state.mark_downloaded(name);
            state.advance(DOWNLOAD_STEP)
        };
        self.report(&format!("Downloaded {name}"), percent);
        Ok(())
    }

    /// Extract one downloaded target. No-op for names that are not targets,
    /// not downloaded yet, or already extracted.
    pub async fn extract_zip(&self, name: &str) -> InstallerResult<()> {
        let percent = {
            let state = self.state();
            if state.is_extracted(name) || !state.is_downloaded(name) || !self.has_target(name) {
                debug!("skip extraction of {}", name);
                return Ok(());
            }
            state.percent
        };

        self.report(&format!("Extracting {name}"), percent);
        self.ctx.remote().extract_target(&self.version, name).await?;

        let percent = {
            let mut state = self.state();
            state.mark_extracted(name);
            state.advance(EXTRACT_STEP)
        };
        self.report(&format!("Extracted {name}"), percent);
        Ok(())
    }

    /// Download every target concurrently.
    pub async fn download_files(&self) -> InstallerResult<()> {
        let futures: Vec<_> = self.targets.iter().map(|name| self.download_file(name)).collect();
        settle_all(futures).await?;
        Ok(())
    }

    /// Extract every name downloaded so far. Targets whose download failed
    /// or never ran are left out.
    pub async fn extract_files(&self) -> InstallerResult<()> {
        let downloaded = self.downloaded();
        let futures: Vec<_> = downloaded.iter().map(|name| self.extract_zip(name)).collect();
        settle_all(futures).await?;
        Ok(())
    }

    async fn run(&self) -> InstallerResult<()> {
        if !self.ctx.catalog.is_valid(&self.year).await? {
            return Err(InstallerError::InvalidIdentifier(self.year.clone()));
        }

        info!(
            "Installing {} targets of client {} ({})",
            self.targets.len(),
            self.year,
            self.version
        );
        let remote = self.ctx.remote();

        self.report("Creating directories", 0.0);
        remote.create_directories(&self.version).await?;

        self.report("Generating AppSettings.xml", 5.0);
        remote.generate_app_settings(&self.version).await?;

        let percent = self.state().raise_to(DOWNLOAD_START);
        self.report("Beginning downloads", percent);
        self.download_files().await?;

        let percent = self.percent();
        self.report("Extracting downloads", percent);
        self.extract_files().await?;

        self.report("Finished!", 100.0);
        info!("Version {} targets installed", self.version);
        Ok(())
    }
}

#[async_trait]
impl ArchiveInstaller for TargetInstaller {
    async fn install(&mut self) -> InstallerResult<()> {
        self.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::RemoteCatalog;
    use crate::core::executor::mock::ScriptedExecutor;
    use crate::core::executor::{Command, Remote};
    use crate::core::progress::{drain, ChannelSink, Progress};
    use serde_json::json;
    use std::sync::Arc;

    fn clients() -> ScriptedExecutor {
        ScriptedExecutor::new().respond(Command::ValidClients, json!(["2016"]))
    }

    fn installer(executor: &Arc<ScriptedExecutor>, targets: &[&str]) -> TargetInstaller {
        let catalog = RemoteCatalog::new(Remote::new(executor.clone()));
        let ctx = InstallContext::new(Arc::new(catalog), Progress::disabled());
        TargetInstaller::new(
            ctx,
            "2016".into(),
            "v1".into(),
            targets.iter().map(|t| t.to_string()).collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn repeated_download_is_idempotent() {
        let executor = Arc::new(ScriptedExecutor::new());
        let installer = installer(&executor, &["A.zip", "B.zip"]);

        installer.download_file("A.zip").await.unwrap();
        installer.download_file("A.zip").await.unwrap();

        assert_eq!(executor.count(Command::DownloadTarget), 1);
        assert_eq!(installer.downloaded(), vec!["A.zip"]);
        assert_eq!(installer.percent(), DOWNLOAD_STEP);
    }

    #[tokio::test]
    async fn non_targets_are_ignored() {
        let executor = Arc::new(ScriptedExecutor::new());
        let installer = installer(&executor, &["A.zip"]);

        installer.download_file("C.zip").await.unwrap();
        installer.extract_zip("C.zip").await.unwrap();

        assert!(executor.calls().is_empty());
        assert!(!installer.has_target("C.zip"));
        assert!(installer.has_target("A.zip"));
    }

    #[tokio::test]
    async fn extract_before_download_does_nothing() {
        let executor = Arc::new(ScriptedExecutor::new());
        let installer = installer(&executor, &["A.zip", "B.zip"]);

        installer.extract_files().await.unwrap();
        installer.extract_zip("A.zip").await.unwrap();

        assert_eq!(executor.count(Command::ExtractTarget), 0);
        assert!(installer.extracted().is_empty());
    }

    #[tokio::test]
    async fn install_runs_every_step_in_order() {
        let executor = Arc::new(clients());
        let catalog = RemoteCatalog::new(Remote::new(executor.clone()));
        let (sink, mut rx) = ChannelSink::channel();
        let ctx = InstallContext::new(Arc::new(catalog), Progress::new(Arc::new(sink), true));
        let mut installer = TargetInstaller::new(
            ctx,
            "2016".into(),
            "v1".into(),
            vec!["A.zip".into(), "B.zip".into()],
        )
        .unwrap();

        installer.install().await.unwrap();

        let commands: Vec<Command> = executor.calls().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            commands,
            vec![
                Command::ValidClients,
                Command::CreateDirectories,
                Command::GenerateAppSettings,
                Command::DownloadTarget,
                Command::DownloadTarget,
                Command::ExtractTarget,
                Command::ExtractTarget,
            ]
        );
        assert_eq!(
            executor.calls_to(Command::DownloadTarget)[0],
            json!({ "version": "v1", "name": "A.zip" })
        );
        assert_eq!(installer.extracted().len(), 2);
        assert_eq!(installer.percent(), 10.0 + 2.0 * DOWNLOAD_STEP + 2.0 * EXTRACT_STEP);

        let events = drain(&mut rx);
        assert_eq!(events.first().unwrap().label, "Creating directories");
        assert_eq!(events.last().unwrap().label, "Finished!");
        assert_eq!(events.last().unwrap().percent, 100.0);
    }

    #[tokio::test]
    async fn failed_download_is_resumable() {
        let executor = Arc::new(clients().fail_for(Command::DownloadTarget, "B.zip"));
        let mut installer = installer(&executor, &["A.zip", "B.zip"]);

        assert!(installer.install().await.is_err());
        assert_eq!(installer.downloaded(), vec!["A.zip"]);
        assert_eq!(executor.count(Command::ExtractTarget), 0);

        // Only what made it to disk is extracted.
        installer.extract_files().await.unwrap();
        assert_eq!(
            executor.calls_to(Command::ExtractTarget),
            vec![json!({ "version": "v1", "name": "A.zip" })]
        );

        // A second attempt skips A and retries only B.
        let before = executor.count(Command::DownloadTarget);
        assert!(installer.download_files().await.is_err());
        assert_eq!(executor.count(Command::DownloadTarget), before + 1);
    }

    #[tokio::test]
    async fn slow_sibling_still_counts_when_another_download_fails() {
        let executor = Arc::new(
            clients()
                .delay_for(Command::DownloadTarget, "A.zip", 5)
                .fail_for(Command::DownloadTarget, "B.zip"),
        );
        let installer = installer(&executor, &["A.zip", "B.zip"]);

        assert!(installer.download_files().await.is_err());

        assert_eq!(installer.downloaded(), vec!["A.zip"]);
        assert_eq!(executor.finished(Command::DownloadTarget), 1);

        // The retry only goes after B.
        assert!(installer.download_files().await.is_err());
        assert_eq!(
            executor.calls_to(Command::DownloadTarget)[2],
            json!({ "version": "v1", "name": "B.zip" })
        );
        assert_eq!(executor.count(Command::DownloadTarget), 3);
    }

    #[tokio::test]
    async fn slow_sibling_still_counts_when_another_extraction_fails() {
        let executor = Arc::new(
            clients()
                .delay_for(Command::ExtractTarget, "A.zip", 5)
                .fail_for(Command::ExtractTarget, "B.zip"),
        );
        let installer = installer(&executor, &["A.zip", "B.zip"]);

        installer.download_files().await.unwrap();
        assert!(installer.extract_files().await.is_err());

        assert_eq!(installer.extracted(), vec!["A.zip"]);
    }

    #[tokio::test]
    async fn unknown_year_is_rejected_before_any_work() {
        let executor = Arc::new(clients());
        let catalog = RemoteCatalog::new(Remote::new(executor.clone()));
        let ctx = InstallContext::new(Arc::new(catalog), Progress::disabled());
        let mut installer =
            TargetInstaller::new(ctx, "1999".into(), "v1".into(), vec!["A.zip".into()]).unwrap();

        let err = installer.install().await.unwrap_err();

        assert!(matches!(err, InstallerError::InvalidIdentifier(ref year) if year == "1999"));
        assert_eq!(
            executor.calls().into_iter().map(|(c, _)| c).collect::<Vec<_>>(),
            vec![Command::ValidClients]
        );
    }

    #[tokio::test]
    async fn percent_never_goes_backwards() {
        let executor = Arc::new(clients());
        let mut installer = installer(&executor, &["A.zip"]);

        installer.download_file("A.zip").await.unwrap();
        installer.install().await.unwrap();

        // Download already counted before install; raising to 10 keeps it.
        assert_eq!(installer.percent(), 10.0 + EXTRACT_STEP);
    }

    #[test]
    fn state_insertions_are_idempotent() {
        let mut state = PipelineState::default();
        state.mark_extracted("A.zip");
        assert!(state.extracted.is_empty());

        state.mark_downloaded("A.zip");
        state.mark_downloaded("A.zip");
        state.mark_extracted("A.zip");
        state.mark_extracted("A.zip");
        assert_eq!(state.downloaded, vec!["A.zip"]);
        assert_eq!(state.extracted, vec!["A.zip"]);

        assert_eq!(state.raise_to(10.0), 10.0);
        assert_eq!(state.advance(2.0), 12.0);
        assert_eq!(state.raise_to(10.0), 12.0);
    }
}

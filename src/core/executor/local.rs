use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{Command, CommandExecutor};
use crate::core::catalog::{archive_name, Manifest};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::state::InstallerSettings;

const APP_SETTINGS_FILE: &str = "AppSettings.xml";
const CONTENT_FOLDER: &str = "content";

#[derive(Deserialize)]
struct YearArgs {
    year: String,
}

#[derive(Deserialize)]
struct YearVersionArgs {
    year: String,
    version: String,
}

#[derive(Deserialize)]
struct VersionArgs {
    version: String,
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct ExtractArgs {
    name: String,
    destination: PathBuf,
}

#[derive(Deserialize)]
struct PrepareArgs {
    year: String,
    version: String,
    manifest: Manifest,
}

#[derive(Deserialize)]
struct StudioArgs {
    year: String,
    url: String,
}

#[derive(Deserialize)]
struct TargetArgs {
    version: String,
    name: String,
}

#[derive(Deserialize)]
struct LatestVersionFile {
    version: String,
}

#[derive(Serialize)]
#[serde(rename = "Settings")]
struct AppSettings<'a> {
    #[serde(rename = "ContentFolder")]
    content_folder: &'a str,
    #[serde(rename = "BaseUrl")]
    base_url: String,
}

/// Runs every command on this machine.
///
/// Layout under the data dir:
/// - `downloads/`                 — archives as downloaded
/// - `clients/<year>/<version>/`  — client installs
/// - `versions/<version>/`        — target installs + `AppSettings.xml`
/// - `studio/<year>/`             — studio installs
pub struct LocalExecutor {
    client: Client,
    data_dir: PathBuf,
    settings: InstallerSettings,
}

impl LocalExecutor {
    pub fn new(client: Client, data_dir: PathBuf, settings: InstallerSettings) -> Self {
        Self {
            client,
            data_dir,
            settings,
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    pub fn client_dir(&self, year: &str, version: &str) -> PathBuf {
        self.data_dir.join("clients").join(year).join(version)
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.data_dir.join("versions").join(version)
    }

    pub fn studio_dir(&self, year: &str) -> PathBuf {
        self.data_dir.join("studio").join(year)
    }

    // ── Network ─────────────────────────────────────────

    async fn fetch_bytes(&self, url: &str) -> InstallerResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_repo_json<T: DeserializeOwned>(&self, file: &str) -> InstallerResult<T> {
        let url = self.settings.repo_file_url(file);
        debug!("Fetching {}", url);
        let bytes = self.fetch_bytes(&url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn latest_version(&self) -> InstallerResult<String> {
        let file: LatestVersionFile = self.fetch_repo_json("data/version.json").await?;
        Ok(file.version)
    }

    /// Download `url` to `dest`, creating parent directories as needed.
    async fn download_to(&self, url: &str, dest: &Path) -> InstallerResult<()> {
        if let Some(parent) = dest.parent() {
            create_dir(parent).await?;
        }

        let bytes = self.fetch_bytes(url).await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| InstallerError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes.len());
        Ok(())
    }

    async fn download_archive(&self, command: Command, name: &str) -> InstallerResult<()> {
        let name = path_segment(command, name)?;
        let url = self.settings.archive_url(name);
        self.download_to(&url, &self.downloads_dir().join(name)).await
    }

    async fn extract_archive(
        &self,
        command: Command,
        name: &str,
        destination: PathBuf,
    ) -> InstallerResult<()> {
        let archive = self.downloads_dir().join(path_segment(command, name)?);
        extract_zip_file(archive, destination).await
    }

    // ── Commands ────────────────────────────────────────

    async fn prepare_client(&self, args: PrepareArgs) -> InstallerResult<()> {
        let command = Command::PrepareClient;
        let client_dir = self.client_dir(
            path_segment(command, &args.year)?,
            path_segment(command, &args.version)?,
        );
        create_dir(&client_dir).await?;
        create_dir(&self.downloads_dir()).await?;

        for (_, destination) in args.manifest.entries() {
            let relative = destination.trim_start_matches(['/', '\\']);
            if relative.split(['/', '\\']).any(|part| part == "..") {
                return Err(InstallerError::validation(
                    command.name(),
                    format!("destination {destination:?} leaves the client folder"),
                ));
            }
            create_dir(&client_dir.join(relative)).await?;
        }

        info!(
            "Prepared client {} ({}) with {} destinations",
            args.year,
            args.version,
            args.manifest.len()
        );
        Ok(())
    }

    async fn generate_app_settings(&self, version: &str) -> InstallerResult<()> {
        let version_dir = self.version_dir(version);
        create_dir(&version_dir).await?;

        let settings = AppSettings {
            content_folder: CONTENT_FOLDER,
            base_url: format!("http://{}", self.settings.base_host),
        };
        let body = quick_xml::se::to_string(&settings)
            .map_err(|e| InstallerError::Xml(e.to_string()))?;
        let xml = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n{body}");

        let path = version_dir.join(APP_SETTINGS_FILE);
        tokio::fs::write(&path, xml)
            .await
            .map_err(|source| InstallerError::Io { path, source })
    }

    async fn install_studio(&self, args: StudioArgs) -> InstallerResult<()> {
        let year = path_segment(Command::InstallStudio, &args.year)?;
        let archive = self.downloads_dir().join(format!("studio-{year}.zip"));

        self.download_to(&args.url, &archive).await?;
        extract_zip_file(archive, self.studio_dir(year)).await?;
        info!("Studio {} installed", year);
        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn invoke(&self, command: Command, args: Value) -> InstallerResult<Value> {
        match command {
            Command::ValidClients => self.fetch_repo_json("data/clients.json").await,
            Command::ClientManifest => {
                let args: YearArgs = parse_args(command, args)?;
                let year = path_segment(command, &args.year)?;
                self.fetch_repo_json(&format!("manifest/{year}.json")).await
            }
            Command::LatestVersion => Ok(Value::String(self.latest_version().await?)),
            Command::ClientFolder => {
                let args: YearVersionArgs = parse_args(command, args)?;
                let dir = self.client_dir(
                    path_segment(command, &args.year)?,
                    path_segment(command, &args.version)?,
                );
                create_dir(&dir).await?;
                Ok(json!(dir.to_string_lossy()))
            }
            Command::DownloadZip => {
                let args: NameArgs = parse_args(command, args)?;
                self.download_archive(command, &args.name).await?;
                Ok(Value::Null)
            }
            Command::ExtractZip => {
                let args: ExtractArgs = parse_args(command, args)?;
                self.extract_archive(command, &args.name, args.destination)
                    .await?;
                Ok(Value::Null)
            }
            Command::PrepareClient => {
                self.prepare_client(parse_args(command, args)?).await?;
                Ok(Value::Null)
            }
            Command::AvailableStudios => self.fetch_repo_json("data/studios.json").await,
            Command::InstallStudio => {
                self.install_studio(parse_args(command, args)?).await?;
                Ok(Value::Null)
            }
            Command::StudioInstalled => {
                let args: YearArgs = parse_args(command, args)?;
                let year = path_segment(command, &args.year)?;
                Ok(Value::Bool(self.studio_dir(year).exists()))
            }
            Command::CreateDirectories => {
                let args: VersionArgs = parse_args(command, args)?;
                let version = path_segment(command, &args.version)?;
                create_dir(&self.version_dir(version).join(CONTENT_FOLDER)).await?;
                Ok(Value::Null)
            }
            Command::GenerateAppSettings => {
                let args: VersionArgs = parse_args(command, args)?;
                self.generate_app_settings(path_segment(command, &args.version)?)
                    .await?;
                Ok(Value::Null)
            }
            Command::DownloadTarget => {
                let args: TargetArgs = parse_args(command, args)?;
                self.download_archive(command, &archive_name(&args.version, &args.name))
                    .await?;
                Ok(Value::Null)
            }
            Command::ExtractTarget => {
                let args: TargetArgs = parse_args(command, args)?;
                let destination = self.version_dir(path_segment(command, &args.version)?);
                self.extract_archive(
                    command,
                    &archive_name(&args.version, &args.name),
                    destination,
                )
                .await?;
                Ok(Value::Null)
            }
            Command::Targets => self.fetch_repo_json("data/targets.json").await,
            Command::IsInstalled => {
                let version = self.latest_version().await?;
                let version = path_segment(command, &version)?;
                let settings_file = self.version_dir(version).join(APP_SETTINGS_FILE);
                Ok(Value::Bool(settings_file.exists()))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(command: Command, args: Value) -> InstallerResult<T> {
    serde_json::from_value(args).map_err(|e| {
        InstallerError::validation(command.name(), format!("bad arguments: {e}"))
    })
}

/// Names and years end up as single path components.
fn path_segment(command: Command, value: &str) -> InstallerResult<&str> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(InstallerError::validation(
            command.name(),
            format!("{value:?} is not a valid file name"),
        ));
    }
    Ok(value)
}

async fn create_dir(path: &Path) -> InstallerResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Extract `archive` into `destination` on the blocking pool.
async fn extract_zip_file(archive: PathBuf, destination: PathBuf) -> InstallerResult<()> {
    tokio::task::spawn_blocking(move || -> InstallerResult<()> {
        let file = std::fs::File::open(&archive).map_err(|source| InstallerError::Io {
            path: archive.clone(),
            source,
        })?;
        let mut zip = zip::ZipArchive::new(file)?;
        std::fs::create_dir_all(&destination).map_err(|source| InstallerError::Io {
            path: destination.clone(),
            source,
        })?;
        zip.extract(&destination)?;
        debug!(
            "Extracted {:?} ({} entries) into {:?}",
            archive,
            zip.len(),
            destination
        );
        Ok(())
    })
    .await
    .map_err(|e| InstallerError::Other(format!("extraction task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn executor(dir: &TempDir) -> LocalExecutor {
        LocalExecutor::new(
            Client::new(),
            dir.path().to_path_buf(),
            InstallerSettings::default(),
        )
    }

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn client_folder_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);

        let folder = executor
            .invoke(
                Command::ClientFolder,
                json!({ "year": "2016", "version": "v1" }),
            )
            .await
            .unwrap();

        let expected = dir.path().join("clients").join("2016").join("v1");
        assert_eq!(folder, json!(expected.to_string_lossy()));
        assert!(expected.is_dir());
    }

    #[tokio::test]
    async fn extract_zip_unpacks_into_destination() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);
        write_zip(
            &executor.downloads_dir().join("v1-2016-x.zip"),
            &[("fonts/a.ttf", b"font"), ("readme.txt", b"hi")],
        );
        let destination = dir.path().join("out").join("Content");

        executor
            .invoke(
                Command::ExtractZip,
                json!({ "name": "v1-2016-x.zip", "destination": destination }),
            )
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(destination.join("fonts").join("a.ttf")).unwrap(),
            b"font"
        );
        assert!(destination.join("readme.txt").is_file());
    }

    #[tokio::test]
    async fn extract_target_unpacks_into_version_dir() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);
        write_zip(
            &executor.downloads_dir().join("v1-Libraries.zip"),
            &[("lib.dll", b"x")],
        );

        executor
            .invoke(
                Command::ExtractTarget,
                json!({ "version": "v1", "name": "Libraries.zip" }),
            )
            .await
            .unwrap();

        assert!(executor.version_dir("v1").join("lib.dll").is_file());
    }

    #[tokio::test]
    async fn missing_archive_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(&dir)
            .invoke(
                Command::ExtractZip,
                json!({ "name": "nope.zip", "destination": dir.path() }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::Io { .. }));
    }

    #[tokio::test]
    async fn prepare_creates_every_destination() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);

        executor
            .invoke(
                Command::PrepareClient,
                json!({
                    "year": "2016",
                    "version": "v1",
                    "manifest": { "2016-a.zip": "content/fonts", "2016-b.zip": "/PlatformContent" }
                }),
            )
            .await
            .unwrap();

        let client = executor.client_dir("2016", "v1");
        assert!(client.join("content").join("fonts").is_dir());
        assert!(client.join("PlatformContent").is_dir());
    }

    #[tokio::test]
    async fn prepare_rejects_escaping_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(&dir)
            .invoke(
                Command::PrepareClient,
                json!({ "year": "2016", "version": "v1", "manifest": { "a.zip": "../../etc" } }),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn app_settings_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);

        executor
            .invoke(Command::CreateDirectories, json!({ "version": "v1" }))
            .await
            .unwrap();
        executor
            .invoke(Command::GenerateAppSettings, json!({ "version": "v1" }))
            .await
            .unwrap();

        assert!(executor.version_dir("v1").join(CONTENT_FOLDER).is_dir());
        let xml =
            std::fs::read_to_string(executor.version_dir("v1").join(APP_SETTINGS_FILE)).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Settings><ContentFolder>content</ContentFolder>"));
        assert!(xml.contains("<BaseUrl>http://www.syntax.eco</BaseUrl></Settings>"));
    }

    #[tokio::test]
    async fn studio_installed_checks_folder() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);
        let args = json!({ "year": "2016" });

        let before = executor
            .invoke(Command::StudioInstalled, args.clone())
            .await
            .unwrap();
        std::fs::create_dir_all(executor.studio_dir("2016")).unwrap();
        let after = executor.invoke(Command::StudioInstalled, args).await.unwrap();

        assert_eq!(before, json!(false));
        assert_eq!(after, json!(true));
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);

        for args in [
            json!({ "name": "../evil.zip" }),
            json!({ "name": "a/b.zip" }),
            json!({ "name": ".." }),
        ] {
            let err = executor
                .invoke(Command::DownloadZip, args)
                .await
                .unwrap_err();
            assert!(err.is_validation());
        }
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(&dir)
            .invoke(Command::ClientFolder, json!({ "year": 2016 }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad arguments"));
    }
}

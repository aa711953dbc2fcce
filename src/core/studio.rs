// ─── Studio ───
// Studio builds are installed per year from a URL published in the studio
// index. The index is fetched once per catalog.

use std::collections::BTreeMap;

use reqwest::Url;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use crate::core::catalog::manifest::json_kind;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::executor::Remote;

/// Studio years are four characters, e.g. `"2016"`.
const STUDIO_YEAR_LEN: usize = 4;

/// Year → download URL of every published studio build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudioIndex(BTreeMap<String, String>);

impl StudioIndex {
    pub fn from_value(command: &str, value: Value) -> InstallerResult<Self> {
        let Value::Object(object) = value else {
            return Err(InstallerError::validation(
                command,
                format!("expected an object, got {}", json_kind(&value)),
            ));
        };

        let mut studios = BTreeMap::new();
        for (year, url) in object {
            if year.chars().count() != STUDIO_YEAR_LEN {
                return Err(InstallerError::validation(
                    command,
                    format!("studio year {year:?} is not {STUDIO_YEAR_LEN} characters"),
                ));
            }
            let Some(url) = url.as_str() else {
                return Err(InstallerError::validation(
                    command,
                    format!("url of studio {year} is not a string"),
                ));
            };
            Url::parse(url).map_err(|e| {
                InstallerError::validation(command, format!("bad url for studio {year}: {e}"))
            })?;
            studios.insert(year, url.to_string());
        }

        Ok(Self(studios))
    }

    pub fn url(&self, year: &str) -> Option<&str> {
        self.0.get(year).map(String::as_str)
    }

    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct StudioCatalog {
    remote: Remote,
    index: OnceCell<StudioIndex>,
}

impl StudioCatalog {
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            index: OnceCell::new(),
        }
    }

    pub async fn available(&self) -> InstallerResult<&StudioIndex> {
        self.index
            .get_or_try_init(|| async {
                let index = self.remote.available_studios().await?;
                info!("Loaded {} studio builds", index.len());
                Ok::<_, InstallerError>(index)
            })
            .await
    }

    pub async fn is_installed(&self, year: &str) -> InstallerResult<bool> {
        self.remote.studio_installed(year).await
    }

    /// Install the studio build for `year` unless it is already present.
    pub async fn install(&self, year: &str) -> InstallerResult<()> {
        if self.is_installed(year).await? {
            info!("Studio {} already installed", year);
            return Ok(());
        }

        let url = self
            .available()
            .await?
            .url(year)
            .ok_or_else(|| InstallerError::InvalidIdentifier(year.to_string()))?
            .to_string();

        info!("Installing studio {} from {}", year, url);
        self.remote.install_studio(year, &url).await
    }
}

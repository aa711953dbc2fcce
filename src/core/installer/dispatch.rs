use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::InstallerResult;

use super::{context::InstallContext, manifest::ManifestInstaller, targets::TargetInstaller};

/// What to install. With `targets` set only those archives are installed,
/// otherwise the whole client manifest for `year`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRequest {
    pub year: String,
    pub version: String,
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

/// Installs a set of named archives into their destinations, reporting
/// progress along the way.
#[async_trait]
pub trait ArchiveInstaller: Send {
    async fn install(&mut self) -> InstallerResult<()>;
}

/// Static dispatch over the two install strategies.
pub enum Installer {
    Manifest(ManifestInstaller),
    Targets(TargetInstaller),
}

impl Installer {
    pub fn new(ctx: InstallContext, request: InstallRequest) -> InstallerResult<Self> {
        match request.targets {
            Some(targets) => Ok(Self::Targets(TargetInstaller::new(
                ctx,
                request.year,
                request.version,
                targets,
            )?)),
            None => Ok(Self::Manifest(ManifestInstaller::new(
                ctx,
                request.year,
                request.version,
            ))),
        }
    }

    pub async fn install(&mut self) -> InstallerResult<()> {
        match self {
            Installer::Manifest(i) => i.install().await,
            Installer::Targets(i) => i.install().await,
        }
    }
}

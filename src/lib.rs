pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::catalog::{Manifest, RemoteCatalog};
pub use crate::core::error::{InstallerError, InstallerResult};
pub use crate::core::executor::{Command, CommandExecutor, LocalExecutor, Remote};
pub use crate::core::installer::{InstallRequest, Installer};
pub use crate::core::progress::{Progress, ProgressSink};
pub use crate::core::state::{AppState, InstallerSettings};

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,installer_lib=debug")),
        )
        .init();
}

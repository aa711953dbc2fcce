use std::path::PathBuf;

use tracing::debug;

use crate::core::error::InstallerResult;
use crate::core::executor::Remote;

/// Resolve the install folder for a client year and version.
///
/// Asks the executor on every call; the result is only stable for the
/// duration of one install run.
pub async fn client_folder(remote: &Remote, year: &str, version: &str) -> InstallerResult<PathBuf> {
    let folder = remote.client_folder(year, version).await?;
    debug!("Client folder for {} {}: {:?}", year, version, folder);
    Ok(folder)
}

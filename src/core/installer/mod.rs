use std::future::Future;

use futures_util::future::join_all;

use crate::core::error::InstallerResult;

pub mod context;
pub mod dispatch;
pub mod manifest;
pub mod targets;

pub use context::InstallContext;
pub use dispatch::{ArchiveInstaller, InstallRequest, Installer};
pub use manifest::{InstallPhase, ManifestInstaller};
pub use targets::{PipelineState, TargetInstaller};

/// Drive every future to completion, then return the first error, if any.
/// A failing item never cuts short a sibling that is still transferring.
pub(crate) async fn settle_all<I, T>(futures: I) -> InstallerResult<Vec<T>>
where
    I: IntoIterator,
    I::Item: Future<Output = InstallerResult<T>>,
{
    join_all(futures).await.into_iter().collect()
}

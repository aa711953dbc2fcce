use std::sync::Arc;

use crate::core::catalog::RemoteCatalog;
use crate::core::executor::Remote;
use crate::core::progress::Progress;

/// Everything an installer needs from the outside world.
#[derive(Clone)]
pub struct InstallContext {
    pub catalog: Arc<RemoteCatalog>,
    pub progress: Progress,
}

impl InstallContext {
    pub fn new(catalog: Arc<RemoteCatalog>, progress: Progress) -> Self {
        Self { catalog, progress }
    }

    pub fn remote(&self) -> &Remote {
        self.catalog.remote()
    }
}

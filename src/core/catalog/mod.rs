pub mod cache;
pub mod manifest;

pub use cache::RemoteCatalog;
pub use manifest::{archive_name, Manifest, ARCHIVE_SUFFIX};

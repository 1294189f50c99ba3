//! Cold-tier blob storage behind a key/line-set contract.

use std::sync::Arc;

use async_trait::async_trait;

mod directory;
mod s3;

pub use directory::DirectoryBacking;
pub use s3::{S3Backing, S3BackingSettings};

use crate::settings::BackingSettings;

/// Canonical extension appended to every block key.
pub const BLOCK_EXTENSION: &str = "json";

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Atomically materialises a cold block under `key`.
    async fn write_lines(&self, key: &str, lines: &[String]) -> Result<(), anyhow::Error>;
    /// Reads back the lines previously written under `key`, in order.
    async fn read_lines(&self, key: &str) -> Result<Vec<String>, anyhow::Error>;
    /// Stable URL of the object addressed by `key`.
    fn url(&self, key: &str) -> String;
}

pub async fn from_settings(
    settings: &BackingSettings,
) -> Result<Arc<dyn BlobStore>, anyhow::Error> {
    match settings {
        BackingSettings::Directory { directory } => Ok(Arc::new(DirectoryBacking::new(directory))),
        BackingSettings::S3(settings) => Ok(Arc::new(S3Backing::new(settings.clone()).await?)),
    }
}

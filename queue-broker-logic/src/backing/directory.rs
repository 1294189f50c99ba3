use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;

use super::{BlobStore, BLOCK_EXTENSION};

/// Filesystem backing: each block is a newline-delimited file under a
/// date-partitioned directory tree.
pub struct DirectoryBacking {
    root: PathBuf,
}

impl DirectoryBacking {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{BLOCK_EXTENSION}"))
    }
}

#[async_trait]
impl BlobStore for DirectoryBacking {
    async fn write_lines(&self, key: &str, lines: &[String]) -> Result<(), anyhow::Error> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&path, content)
            .await
            .with_context(|| format!("writing block {}", path.display()))
    }

    async fn read_lines(&self, key: &str) -> Result<Vec<String>, anyhow::Error> {
        let path = self.resolve(key);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading block {}", path.display()))?;
        Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn url(&self, key: &str) -> String {
        format!("file://{}", self.resolve(key).display())
    }
}

use super::ArchiveSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Archive stored on the local filesystem
pub struct LocalFileSource {
    path: PathBuf,
    display: String,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

#[async_trait]
impl ArchiveSource for LocalFileSource {
    async fn load(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("cannot read {}", self.display))
    }

    fn describe(&self) -> &str {
        &self.display
    }
}

mod fs;
mod http;
mod local;

pub use fs::{Filesystem, SecureDirectoryCreator, StdDirectoryCreator, StdFilesystem};
pub use http::HttpSource;
pub use local::LocalFileSource;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for sources that can deliver a whole archive into memory
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetch the complete archive contents
    async fn load(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, used in messages
    fn describe(&self) -> &str;
}

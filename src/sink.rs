use crate::fetch::{DocumentFetcher, FetchError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Filename used whenever a delivery has no usable name of its own.
pub const FALLBACK_FILENAME: &str = "download.pdf";

/// Payload handed to a sink: either assembled document bytes or the URL of
/// an original to pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Bytes(Vec<u8>),
    Url(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load {url}: {source}")]
    Load {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Final destination for produced downloads. The bundler only decides what
/// to hand over and under which name, never where it ends up.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, filename: &str, delivery: Delivery) -> Result<(), SinkError>;
}

/// Sink that saves every delivery into one directory, fetching URL
/// deliveries itself.
pub struct DirectorySink {
    dir: PathBuf,
    loader: Arc<dyn DocumentFetcher>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, loader: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            dir: dir.into(),
            loader,
        }
    }

    // Only the final path component of the requested filename is honored.
    fn target_path(&self, filename: &str) -> PathBuf {
        let normalized = filename.replace('\\', "/");
        let name = Path::new(&normalized)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_FILENAME);

        self.dir.join(name)
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, filename: &str, delivery: Delivery) -> Result<(), SinkError> {
        let data = match delivery {
            Delivery::Bytes(data) => data,
            Delivery::Url(url) => self
                .loader
                .fetch(&url)
                .await
                .map_err(|source| SinkError::Load { url, source })?,
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Write {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.target_path(filename);
        fs::write(&path, &data)
            .await
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}

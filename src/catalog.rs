use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// One downloadable document: a display name and a fetchable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub name: String,
    pub url: String,
}

/// A named group of documents, e.g. "Technical Specifications".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCategory {
    pub name: String,
    #[serde(default)]
    pub files: Vec<DocumentFile>,
}

/// Externally supplied set of document categories for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<DocumentCategory>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Catalog {
    /// Reads a catalog from a JSON file. A `null` document is treated as an
    /// empty catalog, not as an error.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read(path).await.map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: Option<Catalog> =
            serde_json::from_slice(&data).map_err(|source| CatalogError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(parsed.unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

//! # docbundle
//!
//! A CLI utility to fetch product documentation PDFs and bundle them into
//! combined downloads.
//!
//! ## Current Features
//!
//! - Category based selection of data sheet and conformity documents
//! - PDF concatenation with per-document failure tolerance
//! - Basic CLI interface
//!
//! ## Usage
//!
//! ```bash
//! docbundle fetch catalog.json --category dcChargingStation
//! ```

mod bundle;
mod catalog;
mod diag;
mod fetch;
mod merge;
mod resolver;
mod sink;

#[cfg(test)]
pub mod test_support;

pub use bundle::{BundleError, BundleOutcome, Bundler, MergeRequest};
pub use catalog::{Catalog, CatalogError, DocumentCategory, DocumentFile};
pub use diag::{Diagnostics, TracingDiagnostics};
pub use fetch::{DocumentFetcher, FetchError, HttpFetcher};
pub use merge::{MergeError, PdfMerger};
pub use resolver::{resolve, DocumentSet, ProductCategory, ResolvedDocuments};
pub use sink::{Delivery, DirectorySink, DownloadSink, FALLBACK_FILENAME, SinkError};

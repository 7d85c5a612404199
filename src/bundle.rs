use crate::catalog::DocumentFile;
use crate::diag::Diagnostics;
use crate::fetch::DocumentFetcher;
use crate::merge::{MergeError, PdfMerger};
use crate::sink::{Delivery, DownloadSink, FALLBACK_FILENAME, SinkError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One unit of work: which files to bundle and the base name of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub files: Vec<DocumentFile>,
    pub output_name: String,
}

/// How a bundling run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// The request named no files, nothing was produced.
    Nothing,
    /// A run for the same output name was still in flight.
    AlreadyRunning,
    /// A single document was passed through without merging.
    Single { filename: String },
    Merged {
        filename: String,
        pages: usize,
        merged_files: usize,
        skipped_files: usize,
    },
    /// Assembling or delivering the bundle failed and the first source
    /// document was handed over instead.
    Fallback { url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to deliver {filename}: {source}")]
    Deliver {
        filename: String,
        #[source]
        source: SinkError,
    },
    #[error("fallback delivery of {url} failed: {source}")]
    Fallback {
        url: String,
        #[source]
        source: SinkError,
    },
}

#[derive(Debug, thiserror::Error)]
enum MergeStepError {
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Deliver(#[from] SinkError),
}

/// Fetches the requested documents, concatenates them into one PDF and hands
/// the result to the sink. Per-document failures are skipped; only a failure
/// to assemble or deliver the combined result triggers the fallback.
pub struct Bundler {
    fetcher: Arc<dyn DocumentFetcher>,
    sink: Arc<dyn DownloadSink>,
    diag: Arc<dyn Diagnostics>,
    keep_parts: bool,
    in_flight: Mutex<HashSet<String>>,
}

impl Bundler {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        sink: Arc<dyn DownloadSink>,
        diag: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            diag,
            keep_parts: false,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Also delivers every successfully fetched document on its own, next to
    /// the combined bundle.
    pub fn keep_parts(mut self, keep: bool) -> Self {
        self.keep_parts = keep;
        self
    }

    pub async fn run(&self, request: MergeRequest) -> Result<BundleOutcome, BundleError> {
        let _slot = match self.claim(&request.output_name) {
            Some(slot) => slot,
            None => {
                self.diag.warn(&format!(
                    "Bundle {} is already being produced, skipping duplicate request",
                    request.output_name
                ));
                return Ok(BundleOutcome::AlreadyRunning);
            }
        };

        if request.files.is_empty() {
            self.diag.warn(&format!(
                "No documents to bundle for {}",
                request.output_name
            ));
            return Ok(BundleOutcome::Nothing);
        }

        if let [only] = request.files.as_slice() {
            return self.deliver_single(only).await;
        }

        match self.merge_and_deliver(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.diag.error(
                    &format!(
                        "Bundling {} failed, falling back to the first document",
                        request.output_name
                    ),
                    &err,
                );
                self.deliver_fallback(&request.files[0]).await
            }
        }
    }

    fn claim(&self, output_name: &str) -> Option<InFlightSlot<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(output_name.to_string()) {
            return None;
        }

        Some(InFlightSlot {
            bundler: self,
            output_name: output_name.to_string(),
        })
    }

    async fn deliver_single(&self, file: &DocumentFile) -> Result<BundleOutcome, BundleError> {
        let filename = single_filename(file);
        self.diag.info(&format!(
            "Only one document requested, passing {} through unmerged",
            file.url
        ));

        self.sink
            .deliver(&filename, Delivery::Url(file.url.clone()))
            .await
            .map_err(|source| BundleError::Deliver {
                filename: filename.clone(),
                source,
            })?;

        Ok(BundleOutcome::Single { filename })
    }

    async fn merge_and_deliver(
        &self,
        request: &MergeRequest,
    ) -> Result<BundleOutcome, MergeStepError> {
        let mut merger = PdfMerger::new();
        let mut skipped_files = 0;

        // Documents are fetched one at a time so pages always land in
        // request order.
        for file in &request.files {
            let data = match self.fetcher.fetch(&file.url).await {
                Ok(data) => data,
                Err(err) => {
                    self.diag.warn(&format!("Skipping {}: {}", file.url, err));
                    skipped_files += 1;
                    continue;
                }
            };

            let pages = match merger.add_pdf(&file.name, &data) {
                Ok(pages) => pages,
                Err(err) => {
                    self.diag.warn(&format!("Skipping {}: {}", file.url, err));
                    skipped_files += 1;
                    continue;
                }
            };
            self.diag
                .info(&format!("Added {} ({} pages)", file.name, pages));

            if self.keep_parts {
                self.deliver_part(file, data).await;
            }
        }

        let merged_files = merger.document_count();
        let pages = merger.page_count();
        let data = merger.finish()?;

        let filename = format!("{}.pdf", request.output_name);
        self.sink
            .deliver(&filename, Delivery::Bytes(data))
            .await?;

        self.diag.info(&format!(
            "Bundled {} of {} documents ({} pages) into {}",
            merged_files,
            request.files.len(),
            pages,
            filename
        ));

        Ok(BundleOutcome::Merged {
            filename,
            pages,
            merged_files,
            skipped_files,
        })
    }

    async fn deliver_part(&self, file: &DocumentFile, data: Vec<u8>) {
        let filename = single_filename(file);
        if let Err(err) = self.sink.deliver(&filename, Delivery::Bytes(data)).await {
            self.diag
                .warn(&format!("Failed to keep part {}: {}", filename, err));
        }
    }

    async fn deliver_fallback(&self, file: &DocumentFile) -> Result<BundleOutcome, BundleError> {
        let filename = single_filename(file);
        self.sink
            .deliver(&filename, Delivery::Url(file.url.clone()))
            .await
            .map_err(|source| BundleError::Fallback {
                url: file.url.clone(),
                source,
            })?;

        Ok(BundleOutcome::Fallback {
            url: file.url.clone(),
        })
    }
}

fn single_filename(file: &DocumentFile) -> String {
    let name = file.name.trim();
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

struct InFlightSlot<'a> {
    bundler: &'a Bundler,
    output_name: String,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.bundler.in_flight.lock() {
            in_flight.remove(&self.output_name);
        }
    }
}

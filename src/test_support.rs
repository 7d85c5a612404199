use crate::diag::Diagnostics;
use crate::fetch::{DocumentFetcher, FetchError, StatusCode};
use crate::sink::{Delivery, DownloadSink, SinkError};
use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

pub fn pdf_with_pages(pages: u32) -> Vec<u8> {
    pdf_with_page_widths(&vec![595; pages as usize])
}

/// Builds a minimal PDF with one page per entry, each page carrying its
/// entry as the MediaBox width. The widths make page order observable after
/// a merge.
pub fn pdf_with_page_widths(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let mut kids = Vec::new();

    let resources_id = doc.add_object(Object::Dictionary(dictionary! {
        "ProcSet" => Object::Array(vec![
            Object::Name(b"PDF".to_vec()),
            Object::Name(b"Text".to_vec()),
        ]),
    }));

    for &width in widths {
        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, vec![])));
        let page_id = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(842),
            ]),
            "Resources" => Object::Reference(resources_id),
            "Contents" => Object::Reference(content_id),
        }));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages_id = doc.add_object(Object::Dictionary(dictionary! {
        "Type" => Object::Name(b"Pages".to_vec()),
        "Kids" => Object::Array(kids),
        "Count" => Object::Integer(count),
    }));

    let catalog_id = doc.add_object(Object::Dictionary(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => Object::Reference(pages_id),
    }));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    for (_, page_id) in doc.get_pages() {
        if let Some(Object::Dictionary(page_dict)) = doc.objects.get_mut(&page_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }
    }

    doc.compress();
    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

/// Reads back the MediaBox widths of every page, in page order.
pub fn page_widths(data: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(data).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let page = doc
                .get_object(page_id)
                .and_then(|object| object.as_dict())
                .unwrap();
            let media_box = page
                .get(b"MediaBox")
                .and_then(|object| object.as_array())
                .unwrap();
            match &media_box[2] {
                Object::Integer(width) => *width,
                Object::Real(width) => *width as i64,
                other => panic!("unexpected MediaBox entry {other:?}"),
            }
        })
        .collect()
}

/// Fetcher serving canned bodies. Unknown URLs come back as 404 and every
/// call is recorded in order.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// Fetcher whose requests block until the gate is opened, for exercising
/// overlapping runs.
pub struct GatedFetcher {
    body: Vec<u8>,
    released: AtomicBool,
    in_fetch: AtomicUsize,
}

impl GatedFetcher {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            released: AtomicBool::new(false),
            in_fetch: AtomicUsize::new(0),
        }
    }

    /// Resolves once at least one fetch is waiting on the gate.
    pub async fn blocked(&self) {
        while self.in_fetch.load(Ordering::SeqCst) == 0 {
            sleep(Duration::from_millis(2)).await;
        }
    }

    pub fn open(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.in_fetch.fetch_add(1, Ordering::SeqCst);
        while !self.released.load(Ordering::SeqCst) {
            sleep(Duration::from_millis(2)).await;
        }
        self.in_fetch.fetch_sub(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Sink that records deliveries instead of writing them anywhere.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, Delivery)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(String, Delivery)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn deliver(&self, filename: &str, delivery: Delivery) -> Result<(), SinkError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((filename.to_string(), delivery));
        Ok(())
    }
}

/// Sink that fails byte deliveries, or everything, to force the fallback
/// paths. Accepted deliveries are recorded like with [`RecordingSink`].
pub struct RejectingSink {
    reject_urls: bool,
    deliveries: Mutex<Vec<(String, Delivery)>>,
}

impl RejectingSink {
    pub fn rejecting_bytes() -> Self {
        Self {
            reject_urls: false,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_everything() -> Self {
        Self {
            reject_urls: true,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn deliveries(&self) -> Vec<(String, Delivery)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadSink for RejectingSink {
    async fn deliver(&self, filename: &str, delivery: Delivery) -> Result<(), SinkError> {
        if matches!(delivery, Delivery::Bytes(_)) || self.reject_urls {
            return Err(SinkError::Write {
                path: filename.into(),
                source: std::io::Error::other("sink rejected the delivery"),
            });
        }

        self.deliveries
            .lock()
            .unwrap()
            .push((filename.to_string(), delivery));
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

/// Diagnostics captured in memory so tests can assert on what was reported.
#[derive(Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<(Level, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Level::Error)
    }

    fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event_level, _)| *event_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn push(&self, level: Level, message: String) {
        self.events.lock().unwrap().push((level, message));
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&self, message: &str) {
        self.push(Level::Info, message.to_string());
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message.to_string());
    }

    fn error(&self, message: &str, cause: &dyn fmt::Display) {
        self.push(Level::Error, format!("{message}: {cause}"));
    }
}

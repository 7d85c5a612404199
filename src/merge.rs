use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: lopdf::Error,
    },
    #[error("failed to serialize merged PDF: {0}")]
    Serialize(#[from] std::io::Error),
}

pub struct PdfMerger {
    documents: Vec<(String, Document)>,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    pub fn add_pdf(&mut self, name: &str, data: &[u8]) -> Result<usize, MergeError> {
        let document = Document::load_mem(data).map_err(|source| MergeError::Parse {
            name: name.to_string(),
            source,
        })?;

        let pages = document.get_pages().len();
        debug!("Loaded {} with {} pages", name, pages);
        self.documents.push((name.to_string(), document));

        Ok(pages)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn page_count(&self) -> usize {
        self.documents
            .iter()
            .map(|(_, document)| document.get_pages().len())
            .sum()
    }

    /// Concatenates all added documents, pages in insertion order, and
    /// serializes the result. An empty merger yields a valid zero-page PDF.
    pub fn finish(self) -> Result<Vec<u8>, MergeError> {
        let mut merged = Document::with_version("1.5");
        let mut page_ids: Vec<ObjectId> = Vec::new();

        for (name, mut document) in self.documents {
            // Renumber objects to avoid id collisions with what is already merged
            document.renumber_objects_with(merged.max_id + 1);
            merged.max_id = document.max_id;

            let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
            debug!("Appending {} pages from {}", pages.len(), name);

            page_ids.extend(pages);
            merged.objects.extend(document.objects);
        }

        // Build a fresh page tree referencing every collected page
        let kids: Vec<Object> = page_ids.iter().copied().map(Object::Reference).collect();
        let pages_dict = dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(page_ids.len() as i64),
        };
        let pages_id = merged.add_object(Object::Dictionary(pages_dict));

        for page_id in page_ids {
            if let Some(Object::Dictionary(page_dict)) = merged.objects.get_mut(&page_id) {
                page_dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let catalog_dict = dictionary! {
            "Type" => Object::Name(b"Catalog".to_vec()),
            "Pages" => Object::Reference(pages_id),
        };
        let catalog_id = merged.add_object(Object::Dictionary(catalog_dict));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        merged.renumber_objects();
        merged.compress();

        let mut data = Vec::new();
        merged.save_to(&mut data)?;

        Ok(data)
    }
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

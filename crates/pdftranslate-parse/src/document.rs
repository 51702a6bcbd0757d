//! A loaded PDF: page lookup, scanning, editing and saving.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use pdftranslate_core::PdfError;

use crate::editor::PageEditor;
use crate::error::BackendError;
use crate::interpreter::scan_content;
use crate::objects::{inherited, number, resolve, stream_data};
use crate::scan::PageScan;

/// US Letter, used when a page tree declares no `/MediaBox` at all.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A PDF document opened for translation.
pub struct PdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
    /// Font objects already added to this document, by resource name.
    embedded_fonts: HashMap<String, ObjectId>,
}

impl PdfDocument {
    /// Parse a PDF from memory.
    ///
    /// # Errors
    ///
    /// [`BackendError::Parse`] when the bytes are not a readable PDF, and
    /// [`PdfError::PasswordRequired`] (wrapped in [`BackendError::Core`]) for
    /// encrypted documents.
    pub fn open(bytes: &[u8]) -> Result<Self, BackendError> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        if inner.is_encrypted() {
            return Err(BackendError::Core(PdfError::PasswordRequired));
        }
        // get_pages is keyed by 1-based page number, so values come out in order.
        let page_ids = inner.get_pages().into_values().collect();
        Ok(Self {
            inner,
            page_ids,
            embedded_fonts: HashMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.inner
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, BackendError> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            BackendError::Parse(format!(
                "page index {index} out of range (0..{})",
                self.page_ids.len()
            ))
        })
    }

    /// The page's `/MediaBox` as `[x0, y0, x1, y1]`, normalized so that
    /// `x0 <= x1` and `y0 <= y1`.
    pub fn page_box(&self, index: usize) -> Result<[f64; 4], BackendError> {
        let page_id = self.page_id(index)?;
        let Some(value) = inherited(&self.inner, page_id, b"MediaBox")? else {
            scan_warn!("page {index} has no /MediaBox; assuming US Letter");
            return Ok(DEFAULT_MEDIA_BOX);
        };
        let values: Vec<f64> = value
            .as_array()
            .map_err(|e| BackendError::Parse(format!("MediaBox is not an array: {e}")))?
            .iter()
            .map(|o| number(resolve(&self.inner, o)))
            .collect::<Option<_>>()
            .ok_or_else(|| BackendError::Parse("MediaBox holds a non-number".into()))?;
        match values[..] {
            [x0, y0, x1, y1] => Ok([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
            _ => Err(BackendError::Parse(format!(
                "expected 4-element MediaBox, got {}",
                values.len()
            ))),
        }
    }

    /// Interpret page `index`.
    pub fn scan_page(&self, index: usize) -> Result<PageScan, BackendError> {
        let page_id = self.page_id(index)?;
        let media_box = self.page_box(index)?;
        let page = self.inner.get_dictionary(page_id)?;
        let content = page_content(&self.inner, page)?;
        let resources = match inherited(&self.inner, page_id, b"Resources")? {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };
        scan_content(&self.inner, resources, content, index, media_box)
    }

    /// Start editing page `index`. `scan` must come from [`Self::scan_page`]
    /// for the same page, taken after any earlier commit.
    pub fn editor<'d, 's>(
        &'d mut self,
        index: usize,
        scan: &'s PageScan,
    ) -> Result<PageEditor<'d, 's>, BackendError> {
        let page_id = self.page_id(index)?;
        Ok(PageEditor::new(
            &mut self.inner,
            &mut self.embedded_fonts,
            page_id,
            scan,
        ))
    }

    /// Serialize, dropping unreferenced objects and deflating streams.
    pub fn save(&mut self) -> Result<Vec<u8>, BackendError> {
        self.inner.prune_objects();
        self.inner.compress();
        let mut out = Vec::new();
        self.inner.save_to(&mut out)?;
        Ok(out)
    }
}

/// All `/Contents` streams of a page, decoded and joined by newlines.
fn page_content(doc: &Document, page: &Dictionary) -> Result<Vec<u8>, BackendError> {
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let streams: Vec<&Object> = match resolve(doc, contents) {
        Object::Array(items) => items.iter().map(|item| resolve(doc, item)).collect(),
        other => vec![other],
    };
    let mut content = Vec::new();
    for stream in streams {
        let stream = stream
            .as_stream()
            .map_err(|e| BackendError::Parse(format!("/Contents entry is not a stream: {e}")))?;
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend(stream_data(stream));
    }
    Ok(content)
}

//! Shared helpers for the pipeline tests: lopdf-built documents, scripted
//! translation providers and a read-back of the translated pages.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::{Object, Stream, dictionary};
use pdftranslate::pdftranslate_core::{FontStyle, Segment, build_blocks, extract_segments};
use pdftranslate::pdftranslate_parse::PdfDocument;
use pdftranslate::{
    FontOptions, FontResolver, PdfTranslator, ProviderChain, TranslateError, TranslationCache,
    TranslationProvider, TranslatorConfig,
};

// --- Test PDF creation ---

/// A PDF with one page per content string, all using Helvetica as `/F1`
/// and a 1×1 gray image as `/Im1`.
pub fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(1),
            "Height" => Object::Integer(1),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        vec![128],
    ));

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                "XObject" => dictionary! { "Im1" => Object::Reference(image_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn pdf_with_content(content: &str) -> Vec<u8> {
    pdf_with_pages(&[content])
}

// --- Scripted providers ---

/// Answers from a fixed phrase book and records every request.
pub struct PhraseBook {
    entries: HashMap<String, String>,
    pub seen: Mutex<Vec<String>>,
}

impl PhraseBook {
    pub fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<String> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort();
        seen
    }
}

#[async_trait]
impl TranslationProvider for PhraseBook {
    fn name(&self) -> &str {
        "phrasebook"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        self.seen.lock().unwrap().push(text.to_string());
        self.entries
            .get(text)
            .cloned()
            .ok_or_else(|| TranslateError::Api {
                provider: "phrasebook",
                message: format!("no entry for {text:?}"),
            })
    }
}

/// Always fails, like a service that is down.
pub struct Broken;

#[async_trait]
impl TranslationProvider for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        Err(TranslateError::Status {
            provider: "broken",
            status: 503,
        })
    }
}

/// Reports itself unavailable; calling it is a test failure.
pub struct Unconfigured;

#[async_trait]
impl TranslationProvider for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        panic!("unavailable provider was called");
    }
}

fn no_font_files() -> FontOptions {
    FontOptions {
        font_dir: PathBuf::from("/nonexistent/pdftranslate-fonts"),
        families: vec![],
        system_fonts: false,
    }
}

/// A translator over `providers` that draws with the built-in Helvetica
/// and keeps its own cache.
pub fn translator(providers: Vec<Arc<dyn TranslationProvider>>) -> PdfTranslator {
    let config = TranslatorConfig {
        fonts: no_font_files(),
        ..TranslatorConfig::default()
    };
    PdfTranslator::with_providers(config, ProviderChain::new(providers))
        .with_cache(Arc::new(TranslationCache::new()))
}

/// DejaVu Sans, shipped with the tests.
pub fn dejavu_sans() -> Vec<u8> {
    std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts/DejaVuSans.ttf"))
        .unwrap()
}

/// Like [`translator`], drawing with DejaVu Sans registered as a bundled face.
pub fn translator_with_dejavu(providers: Vec<Arc<dyn TranslationProvider>>) -> PdfTranslator {
    let fonts = FontResolver::new(no_font_files()).with_bundled(
        "dejavu-sans",
        FontStyle::Regular,
        dejavu_sans(),
    );
    translator(providers).with_font_resolver(fonts)
}

// --- Reading results back ---

/// All visible text of a page, glyph by glyph.
pub fn page_text(pdf: &[u8], page: usize) -> String {
    let doc = PdfDocument::open(pdf).unwrap();
    let scan = doc.scan_page(page).unwrap();
    scan.glyphs.iter().map(|g| g.ch.text.as_str()).collect()
}

/// Segments of a page, as the pipeline would see them.
pub fn page_segments(pdf: &[u8], page: usize) -> Vec<Segment> {
    let doc = PdfDocument::open(pdf).unwrap();
    let scan = doc.scan_page(page).unwrap();
    let config = TranslatorConfig::default();
    let blocks = build_blocks(&scan.chars(), &config.layout);
    extract_segments(&blocks, &config.segment)
}

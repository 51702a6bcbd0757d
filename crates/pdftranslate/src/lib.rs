//! pdftranslate: Translate the text of PDF documents without changing their layout.
//!
//! This is the public API facade crate. It re-exports types from
//! pdftranslate-core and uses pdftranslate-parse for reading and editing pages.
//!
//! # Architecture
//!
//! - **pdftranslate-core**: Backend-independent data types and algorithms
//! - **pdftranslate-parse**: Page scanning and content stream editing
//! - **pdftranslate** (this crate): Translation providers, orchestration,
//!   font resolution, rendering and the document pipeline
//!
//! # Example
//!
//! ```no_run
//! use pdftranslate::{PdfTranslator, TranslatorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("report.pdf")?;
//! let translator = PdfTranslator::new(TranslatorConfig::from_env())?;
//! let output = translator.translate_pdf_blocking(&input, "auto", "tr", None)?;
//! std::fs::write("report.tr.pdf", output)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fonts;
pub mod orchestrator;
pub mod provider;
pub mod raster;
pub mod render;
pub mod translator;

pub use cache::TranslationCache;
pub use config::{
    FontOptions, OrchestratorOptions, ProviderKind, ProviderSettings, RenderOptions,
    TranslatorConfig,
};
pub use error::TranslateError;
pub use fonts::{FontResolver, FontTier, PageRenderContext, ResolvedFont};
pub use orchestrator::Orchestrator;
pub use pdftranslate_core;
pub use pdftranslate_core::PdfError;
pub use pdftranslate_parse;
pub use provider::{ProviderChain, ProviderStatus, TranslationProvider};
pub use translator::{PdfTranslator, ProgressFn, TranslationReport};

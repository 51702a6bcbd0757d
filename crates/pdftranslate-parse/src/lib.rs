//! pdftranslate-parse: PDF backend for the translation engine.
//!
//! Reads pages with lopdf and interprets their content streams into a
//! [`PageScan`]: positioned glyphs that remember which operator showed them,
//! painted fills, and image placements. A [`PageEditor`] then removes glyphs,
//! overpaints regions, embeds fonts and draws replacement text while leaving
//! the rest of the content stream byte-for-byte intact.

/// Warning for recoverable oddities in a document. Compiles to nothing
/// unless the `tracing` feature is enabled.
macro_rules! scan_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)*);
        #[cfg(not(feature = "tracing"))]
        let _ = format_args!($($arg)*);
    }};
}

pub mod cmap;
pub mod document;
pub mod editor;
pub mod encoding;
pub mod error;
pub mod font;
pub mod interpreter;
pub mod interpreter_state;
mod objects;
pub mod scan;
pub mod standard_fonts;
pub mod text_state;
pub mod tokenizer;

pub use document::PdfDocument;
pub use editor::{FontSpec, PageEditor, Redaction};
pub use error::BackendError;
pub use pdftranslate_core;
pub use scan::{FillRegion, FillRule, GlyphRecord, PageScan};
pub use standard_fonts::StandardFont;

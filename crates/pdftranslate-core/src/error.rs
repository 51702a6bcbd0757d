//! Error type shared by every pdftranslate layer.
//!
//! [`PdfError`] covers the conditions that abort a whole document. Problems
//! local to one segment (a failed translation, a font that will not load, text
//! that will not fit) are recovered where they happen and never surface here.

use std::fmt;

/// Fatal error types for PDF translation.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// I/O error reading or writing PDF data.
    IoError(String),
    /// Error resolving font or encoding information.
    FontError(String),
    /// Error during content stream interpretation or rewriting.
    InterpreterError(String),
    /// The PDF is encrypted and requires a password to open.
    PasswordRequired,
    /// The translation pipeline could not run (e.g. no async runtime).
    TranslationError(String),
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::TranslationError(msg) => write!(f, "translation error: {msg}"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_error_parse_error_creation() {
        let err = PdfError::ParseError("invalid xref".to_string());
        assert_eq!(err.to_string(), "parse error: invalid xref");
    }

    #[test]
    fn pdf_error_font_error_creation() {
        let err = PdfError::FontError("missing glyph widths".to_string());
        assert_eq!(err.to_string(), "font error: missing glyph widths");
    }

    #[test]
    fn pdf_error_password_required() {
        assert_eq!(
            PdfError::PasswordRequired.to_string(),
            "PDF is encrypted and requires a password"
        );
    }

    #[test]
    fn pdf_error_translation_error() {
        let err = PdfError::TranslationError("runtime unavailable".to_string());
        assert_eq!(err.to_string(), "translation error: runtime unavailable");
    }

    #[test]
    fn pdf_error_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PdfError = io.into();
        assert_eq!(err, PdfError::IoError("gone".to_string()));
    }

    #[test]
    fn pdf_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(PdfError::Other("boom".to_string()));
        assert_eq!(err.to_string(), "boom");
    }
}

//! Drawing-font resolution and per-page font embedding.
//!
//! Fonts are looked up in four tiers: faces registered in memory with
//! [`FontResolver::with_bundled`], the project font directory, the platform
//! font directories and finally the built-in Helvetica. A tier missing the
//! requested style falls back to its regular face before the next tier is
//! tried. Loaded faces are cached by raw bytes for the resolver's lifetime.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fontdue::{Font, FontSettings};
use pdftranslate_core::{Charset, FontStyle, PdfError};
use pdftranslate_parse::editor::{FIRST_EMBEDDED_CODE, LAST_EMBEDDED_CODE};
use pdftranslate_parse::encoding::{BaseEncoding, SimpleEncoding};
use pdftranslate_parse::standard_fonts;
use pdftranslate_parse::{BackendError, FontSpec, PageEditor, StandardFont};
use tracing::{debug, warn};

use crate::config::FontOptions;

/// Prefix of every font resource this crate adds to a page.
pub const FONT_KEY_PREFIX: &str = "TRFON";

/// OS/2 `fsType` value for restricted-license embedding.
const FS_TYPE_RESTRICTED: u16 = 0x0002;

/// Where a font came from, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontTier {
    Bundled,
    Project,
    System,
    BuiltIn,
}

/// A parsed TrueType face ready for embedding.
#[derive(Debug)]
pub struct LoadedFace {
    pub family: String,
    pub style: FontStyle,
    pub base_font: String,
    pub data: Arc<[u8]>,
    /// Advance widths for WinAnsi codes 32..=255, in 1/1000 em.
    pub widths: Vec<f64>,
    pub ascent: f64,
    pub descent: f64,
}

impl LoadedFace {
    /// Parse `data` and measure the WinAnsi repertoire.
    ///
    /// Fails for unparseable data, CFF-flavored OpenType, collections and
    /// faces whose license forbids embedding.
    pub fn parse(family: &str, style: FontStyle, data: Arc<[u8]>) -> Result<Self, PdfError> {
        match data.get(..4) {
            Some(b"OTTO") => {
                return Err(PdfError::FontError(format!(
                    "{family}: CFF outlines cannot be embedded as TrueType"
                )));
            }
            Some(b"ttcf") => {
                return Err(PdfError::FontError(format!("{family}: font collections are not supported")));
            }
            _ => {}
        }
        if os2_fs_type(&data).is_some_and(|t| t & 0x000F == FS_TYPE_RESTRICTED) {
            return Err(PdfError::FontError(format!(
                "{family}: license restricts embedding"
            )));
        }
        let settings = FontSettings {
            scale: 1000.0,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(&*data, settings)
            .map_err(|e| PdfError::FontError(format!("{family}: {e}")))?;

        let encoding = SimpleEncoding::new(BaseEncoding::WinAnsi);
        let missing = f64::from(font.metrics_indexed(0, 1000.0).advance_width);
        let widths = (FIRST_EMBEDDED_CODE..=LAST_EMBEDDED_CODE)
            .map(|code| match encoding.decode(code) {
                Some(c) if font.lookup_glyph_index(c) != 0 => {
                    f64::from(font.metrics(c, 1000.0).advance_width)
                }
                _ => missing,
            })
            .collect();
        let (ascent, descent) = font
            .horizontal_line_metrics(1000.0)
            .map(|m| (f64::from(m.ascent), f64::from(m.descent)))
            .unwrap_or((800.0, -200.0));

        Ok(Self {
            family: family.to_string(),
            style,
            base_font: postscript_name(family, style),
            data,
            widths,
            ascent,
            descent,
        })
    }
}

/// `fsType` from the OS/2 table, if the font has one.
fn os2_fs_type(data: &[u8]) -> Option<u16> {
    let be16 = |at: usize| Some(u16::from_be_bytes([*data.get(at)?, *data.get(at + 1)?]));
    let be32 = |at: usize| {
        let b = data.get(at..at + 4)?;
        Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    };
    let num_tables = usize::from(be16(4)?);
    (0..num_tables)
        .map(|i| 12 + i * 16)
        .find(|&record| data.get(record..record + 4) == Some(&b"OS/2"[..]))
        .and_then(|record| be32(record + 8))
        .and_then(|offset| be16(offset as usize + 8))
}

fn postscript_name(family: &str, style: FontStyle) -> String {
    let mut name: String = family
        .split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect();
    name.retain(|c| c.is_ascii_alphanumeric());
    if name.is_empty() {
        name.push_str("Embedded");
    }
    match style {
        FontStyle::Regular => name,
        FontStyle::Bold => name + "-Bold",
        FontStyle::Italic => name + "-Italic",
        FontStyle::BoldItalic => name + "-BoldItalic",
    }
}

/// Glyph source of a [`ResolvedFont`].
#[derive(Debug, Clone)]
pub enum FontSource {
    Embedded(Arc<LoadedFace>),
    BuiltIn(&'static StandardFont),
}

/// A font chosen for drawing one segment.
#[derive(Debug, Clone)]
pub struct ResolvedFont {
    key: String,
    style: FontStyle,
    tier: FontTier,
    source: FontSource,
}

impl ResolvedFont {
    fn embedded(tier: FontTier, face: Arc<LoadedFace>) -> Self {
        Self {
            key: font_key(&face.family, face.style),
            style: face.style,
            tier,
            source: FontSource::Embedded(face),
        }
    }

    /// The Helvetica face of `style`.
    pub fn builtin(style: FontStyle) -> Self {
        Self {
            key: font_key("helvetica", style),
            style,
            tier: FontTier::BuiltIn,
            source: FontSource::BuiltIn(standard_fonts::helvetica(style)),
        }
    }

    /// Page resource name, `TRFON_{family}_{style}`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn tier(&self) -> FontTier {
        self.tier
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, FontSource::BuiltIn(_))
    }

    /// What the font can draw. The built-in face is limited to ASCII.
    pub fn charset(&self) -> Charset {
        match self.source {
            FontSource::Embedded(_) => Charset::Latin1,
            FontSource::BuiltIn(_) => Charset::Ascii,
        }
    }

    pub fn spec(&self) -> FontSpec {
        match &self.source {
            FontSource::Embedded(face) => FontSpec::TrueType {
                base_font: face.base_font.clone(),
                data: Arc::clone(&face.data),
                widths: face.widths.clone(),
                ascent: face.ascent,
                descent: face.descent,
                style: face.style,
            },
            FontSource::BuiltIn(_) => FontSpec::Helvetica(self.style),
        }
    }

    /// Width of WinAnsi `bytes` at `size` points.
    pub fn text_width(&self, bytes: &[u8], size: f64) -> f64 {
        match &self.source {
            FontSource::Embedded(face) => {
                let units: f64 = bytes
                    .iter()
                    .filter(|&&b| b >= FIRST_EMBEDDED_CODE)
                    .map(|&b| face.widths[usize::from(b - FIRST_EMBEDDED_CODE)])
                    .sum();
                units * size / 1000.0
            }
            FontSource::BuiltIn(metrics) => metrics.text_width(bytes, size),
        }
    }
}

pub fn font_key(family: &str, style: FontStyle) -> String {
    format!("{FONT_KEY_PREFIX}_{family}_{}", style.as_str())
}

/// Encode text already folded to Latin-1 as WinAnsi bytes.
///
/// WinAnsi agrees with Latin-1 on every code a folded string can contain;
/// anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// File names of a project font family by style.
fn project_file_name(family: &str, style: FontStyle) -> String {
    let known = match family {
        "dejavu-sans" => Some([
            "DejaVuSans.ttf",
            "DejaVuSans-Bold.ttf",
            "DejaVuSans-Oblique.ttf",
            "DejaVuSans-BoldOblique.ttf",
        ]),
        "noto-sans" => Some([
            "NotoSans-Regular.ttf",
            "NotoSans-Bold.ttf",
            "NotoSans-Italic.ttf",
            "NotoSans-BoldItalic.ttf",
        ]),
        _ => None,
    };
    match known {
        Some(names) => names[style_slot(style)].to_string(),
        None => format!("{family}-{}.ttf", style.as_str()),
    }
}

fn style_slot(style: FontStyle) -> usize {
    match style {
        FontStyle::Regular => 0,
        FontStyle::Bold => 1,
        FontStyle::Italic => 2,
        FontStyle::BoldItalic => 3,
    }
}

/// Platform font files as (family, [regular, bold, italic, bold italic]).
const SYSTEM_FONTS: &[(&str, [&str; 4])] = &[
    (
        "dejavu-sans",
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
        ],
    ),
    (
        "dejavu-sans",
        [
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans-Oblique.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans-BoldOblique.ttf",
        ],
    ),
    (
        "liberation-sans",
        [
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
        ],
    ),
    (
        "free-sans",
        [
            "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSansOblique.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSansBoldOblique.ttf",
        ],
    ),
    (
        "noto-sans",
        [
            "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
            "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
            "/usr/share/fonts/truetype/noto/NotoSans-Italic.ttf",
            "/usr/share/fonts/truetype/noto/NotoSans-BoldItalic.ttf",
        ],
    ),
    (
        "arial",
        [
            r"C:\Windows\Fonts\arial.ttf",
            r"C:\Windows\Fonts\arialbd.ttf",
            r"C:\Windows\Fonts\ariali.ttf",
            r"C:\Windows\Fonts\arialbi.ttf",
        ],
    ),
    (
        "arial",
        [
            "/Library/Fonts/Arial.ttf",
            "/Library/Fonts/Arial Bold.ttf",
            "/Library/Fonts/Arial Italic.ttf",
            "/Library/Fonts/Arial Bold Italic.ttf",
        ],
    ),
    (
        "arial",
        [
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
            "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
        ],
    ),
];

struct BundledFace {
    family: String,
    style: FontStyle,
    data: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tier: FontTier,
    /// Family for in-memory faces, file path otherwise.
    source: String,
    style: FontStyle,
}

/// Finds a drawable font for a style. Safe to share across pages and threads.
pub struct FontResolver {
    options: FontOptions,
    bundled: Vec<BundledFace>,
    cache: Mutex<HashMap<CacheKey, Option<Arc<LoadedFace>>>>,
}

impl FontResolver {
    pub fn new(options: FontOptions) -> Self {
        Self {
            options,
            bundled: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Register an in-memory face, consulted before any file.
    pub fn with_bundled(
        mut self,
        family: impl Into<String>,
        style: FontStyle,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        self.bundled.push(BundledFace {
            family: family.into(),
            style,
            data: data.into(),
        });
        self
    }

    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    /// The best available font for `style`. Never fails: the last resort is
    /// the built-in Helvetica.
    pub fn resolve(&self, style: FontStyle) -> ResolvedFont {
        let styles: &[FontStyle] = if style == FontStyle::Regular {
            &[FontStyle::Regular]
        } else {
            &[style, FontStyle::Regular]
        };
        for tier in [FontTier::Bundled, FontTier::Project, FontTier::System] {
            for &wanted in styles {
                if let Some(face) = self.load_from_tier(tier, wanted) {
                    debug!(?tier, family = %face.family, style = wanted.as_str(), "resolved font");
                    return ResolvedFont::embedded(tier, face);
                }
            }
        }
        debug!(style = style.as_str(), "falling back to built-in Helvetica");
        ResolvedFont::builtin(style)
    }

    fn load_from_tier(&self, tier: FontTier, style: FontStyle) -> Option<Arc<LoadedFace>> {
        match tier {
            FontTier::Bundled => self
                .bundled
                .iter()
                .filter(|b| b.style == style)
                .find_map(|b| {
                    self.cached(tier, &b.family, &b.family, style, || Some(Arc::clone(&b.data)))
                }),
            FontTier::Project => self.options.families.iter().find_map(|family| {
                let path = self.options.font_dir.join(project_file_name(family, style));
                self.load_file(tier, family, &path, style)
            }),
            FontTier::System if self.options.system_fonts => {
                SYSTEM_FONTS.iter().find_map(|(family, paths)| {
                    let path = PathBuf::from(paths[style_slot(style)]);
                    self.load_file(tier, family, &path, style)
                })
            }
            FontTier::System | FontTier::BuiltIn => None,
        }
    }

    fn load_file(
        &self,
        tier: FontTier,
        family: &str,
        path: &Path,
        style: FontStyle,
    ) -> Option<Arc<LoadedFace>> {
        let source = path.to_string_lossy();
        self.cached(tier, family, &source, style, || {
            match std::fs::read(path) {
                Ok(bytes) => Some(Arc::from(bytes)),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "font file not readable");
                    None
                }
            }
        })
    }

    /// Load through the cache. Failures are cached too, so a broken or
    /// missing file is only tried once.
    fn cached(
        &self,
        tier: FontTier,
        family: &str,
        source: &str,
        style: FontStyle,
        read: impl FnOnce() -> Option<Arc<[u8]>>,
    ) -> Option<Arc<LoadedFace>> {
        let key = CacheKey {
            tier,
            source: source.to_string(),
            style,
        };
        if let Some(hit) = self.lock_cache().get(&key) {
            return hit.clone();
        }
        let loaded = read().and_then(|data| match LoadedFace::parse(family, style, data) {
            Ok(face) => Some(Arc::new(face)),
            Err(err) => {
                warn!(source, error = %err, "font rejected");
                None
            }
        });
        self.lock_cache().insert(key, loaded.clone());
        loaded
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Option<Arc<LoadedFace>>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Font state of the page being rendered.
///
/// Created fresh for every page so no font key leaks from one page to the
/// next.
#[derive(Debug)]
pub struct PageRenderContext {
    pub page_index: usize,
    embedded: HashSet<String>,
}

impl PageRenderContext {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            embedded: HashSet::new(),
        }
    }

    /// Declare `font` on the page unless it already is.
    pub fn ensure_font(
        &mut self,
        editor: &mut PageEditor<'_, '_>,
        font: &ResolvedFont,
    ) -> Result<(), BackendError> {
        if self.embedded.contains(font.key()) {
            return Ok(());
        }
        editor.add_font(font.key(), &font.spec())?;
        self.embedded.insert(font.key().to_string());
        Ok(())
    }

    pub fn has_font(&self, key: &str) -> bool {
        self.embedded.contains(key)
    }

    pub fn embedded_count(&self) -> usize {
        self.embedded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fonts() -> FontOptions {
        FontOptions {
            font_dir: PathBuf::from("/nonexistent/font/dir"),
            families: vec!["dejavu-sans".into()],
            system_fonts: false,
        }
    }

    /// Minimal sfnt header whose table directory holds only an OS/2 record.
    fn sfnt_with_fs_type(fs_type: u16) -> Vec<u8> {
        let mut data = vec![0, 1, 0, 0, 0, 1, 0, 16, 0, 0, 0, 0];
        data.extend_from_slice(b"OS/2");
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&28u32.to_be_bytes());
        data.extend_from_slice(&10u32.to_be_bytes());
        data.extend_from_slice(&[0, 4, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&fs_type.to_be_bytes());
        data
    }

    #[test]
    fn reads_fs_type() {
        assert_eq!(os2_fs_type(&sfnt_with_fs_type(0x0002)), Some(2));
        assert_eq!(os2_fs_type(&sfnt_with_fs_type(0x0008)), Some(8));
        assert_eq!(os2_fs_type(b"\0\x01\0\0"), None);
    }

    #[test]
    fn restricted_and_cff_faces_are_rejected() {
        let restricted: Arc<[u8]> = Arc::from(sfnt_with_fs_type(0x0002));
        let err = LoadedFace::parse("x", FontStyle::Regular, restricted).unwrap_err();
        assert!(err.to_string().contains("license"));

        let cff: Arc<[u8]> = Arc::from(b"OTTO\0\0\0\0".to_vec());
        assert!(LoadedFace::parse("x", FontStyle::Regular, cff).is_err());
    }

    #[test]
    fn garbage_bundled_font_falls_through_to_builtin() {
        let resolver = FontResolver::new(no_fonts()).with_bundled(
            "broken",
            FontStyle::Bold,
            b"not a font".to_vec(),
        );
        let font = resolver.resolve(FontStyle::Bold);
        assert!(font.is_builtin());
        assert_eq!(font.key(), "TRFON_helvetica_bold");
        assert_eq!(font.charset(), Charset::Ascii);
        assert!(matches!(font.spec(), FontSpec::Helvetica(FontStyle::Bold)));
        // second lookup is served from the negative cache
        assert!(resolver.resolve(FontStyle::Bold).is_builtin());
        assert_eq!(resolver.lock_cache().len(), 3);
    }

    fn dejavu_sans() -> Vec<u8> {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts/DejaVuSans.ttf");
        std::fs::read(path).unwrap()
    }

    fn fixture_fonts() -> FontOptions {
        FontOptions {
            font_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts")),
            families: vec!["dejavu-sans".into()],
            system_fonts: false,
        }
    }

    #[test]
    fn truetype_face_is_measured() {
        let face =
            LoadedFace::parse("dejavu-sans", FontStyle::Regular, Arc::from(dejavu_sans())).unwrap();
        assert_eq!(face.widths.len(), 224);
        assert!(face.ascent > 0.0 && face.descent < 0.0);
        let width = |c: u8| face.widths[usize::from(c - FIRST_EMBEDDED_CODE)];
        assert!(width(b'W') > width(b'i'));
        // 0xFC is u-diaeresis in WinAnsi and drawn like a plain u
        assert!((width(0xFC) - width(b'u')).abs() < 1.0);
        assert_eq!(face.base_font, "DejavuSans");
    }

    #[test]
    fn bundled_faces_win_over_project_files() {
        let project_only = FontResolver::new(fixture_fonts());
        let font = project_only.resolve(FontStyle::Regular);
        assert_eq!(font.tier(), FontTier::Project);
        assert_eq!(font.key(), "TRFON_dejavu-sans_regular");
        assert_eq!(font.charset(), Charset::Latin1);
        assert!(matches!(font.spec(), FontSpec::TrueType { .. }));

        let resolver = FontResolver::new(fixture_fonts()).with_bundled(
            "unicode-sans",
            FontStyle::Regular,
            dejavu_sans(),
        );
        let font = resolver.resolve(FontStyle::Regular);
        assert_eq!(font.tier(), FontTier::Bundled);
        assert_eq!(font.key(), "TRFON_unicode-sans_regular");
        // a missing bold face falls back to the tier's regular one
        let bold = resolver.resolve(FontStyle::Bold);
        assert_eq!(bold.tier(), FontTier::Bundled);
        assert_eq!(bold.key(), "TRFON_unicode-sans_regular");
    }

    #[test]
    fn embedded_widths_drive_text_width() {
        let resolver = FontResolver::new(fixture_fonts());
        let font = resolver.resolve(FontStyle::Regular);
        let FontSource::Embedded(face) = font.source() else {
            panic!("expected an embedded face");
        };
        let expected = (face.widths[usize::from(b'H' - 32)] + face.widths[usize::from(b'i' - 32)])
            * 12.0
            / 1000.0;
        assert!((font.text_width(b"Hi", 12.0) - expected).abs() < 1e-9);
        assert!(font.text_width(b"Hi", 24.0) > font.text_width(b"Hi", 12.0));
    }

    #[test]
    fn builtin_widths_match_helvetica() {
        let font = ResolvedFont::builtin(FontStyle::Regular);
        // H = 722, i = 222
        assert!((font.text_width(b"Hi", 10.0) - 9.44).abs() < 1e-9);
    }

    #[test]
    fn keys_and_names() {
        assert_eq!(font_key("dejavu-sans", FontStyle::BoldItalic), "TRFON_dejavu-sans_bold_italic");
        assert_eq!(postscript_name("dejavu-sans", FontStyle::Bold), "DejavuSans-Bold");
        assert_eq!(postscript_name("--", FontStyle::Regular), "Embedded");
        assert_eq!(project_file_name("noto-sans", FontStyle::Italic), "NotoSans-Italic.ttf");
        assert_eq!(project_file_name("custom", FontStyle::Bold), "custom-bold.ttf");
    }

    #[test]
    fn win_ansi_encoding_of_folded_text() {
        assert_eq!(encode_win_ansi("Größe"), b"Gr\xf6\xdfe".to_vec());
        assert_eq!(encode_win_ansi("a\u{0130}"), b"a?".to_vec());
    }
}

//! Configuration for the translation pipeline.
//!
//! Every knob has a default matching the engine's documented behavior, so
//! `TranslatorConfig::default()` is a working setup. [`TranslatorConfig::from_env`]
//! additionally picks up provider credentials and the font directory.

use std::path::PathBuf;
use std::time::Duration;

use pdftranslate_core::{FitOptions, LayoutOptions, SampleOptions, SegmentOptions};

/// Smallest and largest per-call translation timeout.
pub const MIN_CALL_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(45);

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranslatorConfig {
    pub layout: LayoutOptions,
    pub segment: SegmentOptions,
    pub orchestrator: OrchestratorOptions,
    pub render: RenderOptions,
    pub fonts: FontOptions,
    pub providers: ProviderSettings,
}

impl TranslatorConfig {
    /// Defaults plus provider credentials and URLs from the environment:
    /// `MYMEMORY_EMAIL`, `HUGGINGFACE_WRITE_API_KEY`, `HUGGINGFACE_READ_API_KEY`,
    /// `HUGGINGFACE_API_KEY`, `HF_TOKEN`, `LINGVA_URL`, `LIBRETRANSLATE_URL`,
    /// `LIBRETRANSLATE_API_KEY` and `PDFTRANSLATE_FONT_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        let providers = &mut config.providers;
        providers.mymemory_email = get("MYMEMORY_EMAIL");
        providers.huggingface_token = [
            "HUGGINGFACE_WRITE_API_KEY",
            "HUGGINGFACE_READ_API_KEY",
            "HUGGINGFACE_API_KEY",
            "HF_TOKEN",
        ]
        .iter()
        .find_map(|key| get(key));
        providers.lingva_url = get("LINGVA_URL");
        providers.libretranslate_url = get("LIBRETRANSLATE_URL");
        providers.libretranslate_api_key = get("LIBRETRANSLATE_API_KEY");
        if let Some(dir) = get("PDFTRANSLATE_FONT_DIR") {
            config.fonts.font_dir = PathBuf::from(dir);
        }
        config
    }
}

/// Batching and concurrency of translation calls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrchestratorOptions {
    /// Segments handled per batch.
    pub batch_size: usize,
    /// Concurrent calls within a batch.
    pub workers: usize,
    /// Timeout for one translation call; clamped by [`Self::call_timeout`].
    pub timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            workers: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorOptions {
    pub fn call_timeout(&self) -> Duration {
        self.timeout.clamp(MIN_CALL_TIMEOUT, MAX_CALL_TIMEOUT)
    }
}

/// Erasing and redrawing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Points added around a segment's bbox before erasing.
    pub erase_margin: f64,
    pub fit: FitOptions,
    pub sample: SampleOptions,
    /// Raster resolution used for background sampling.
    pub pixels_per_point: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            erase_margin: 0.3,
            fit: FitOptions::default(),
            sample: SampleOptions::default(),
            pixels_per_point: 0.5,
        }
    }
}

/// Where drawing fonts come from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontOptions {
    /// Directory searched for project fonts.
    pub font_dir: PathBuf,
    /// Project font families, in preference order.
    pub families: Vec<String>,
    /// Whether to look in the platform font directories.
    pub system_fonts: bool,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            font_dir: PathBuf::from("fonts"),
            families: vec!["dejavu-sans".to_string(), "noto-sans".to_string()],
            system_fonts: true,
        }
    }
}

/// The translation services that can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProviderKind {
    MyMemory,
    HuggingFace,
    Lingva,
    LibreTranslate,
}

/// Provider order, credentials and endpoints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderSettings {
    /// Providers in priority order.
    pub order: Vec<ProviderKind>,
    pub mymemory_email: Option<String>,
    pub huggingface_token: Option<String>,
    /// Preferred Lingva instance, tried before the public ones.
    pub lingva_url: Option<String>,
    pub libretranslate_url: Option<String>,
    pub libretranslate_api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            order: vec![
                ProviderKind::MyMemory,
                ProviderKind::HuggingFace,
                ProviderKind::Lingva,
                ProviderKind::LibreTranslate,
            ],
            mymemory_email: None,
            huggingface_token: None,
            lingva_url: None,
            libretranslate_url: None,
            libretranslate_api_key: None,
        }
    }
}

//! Process-wide translation result cache.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    target: String,
    digest: [u8; 32],
}

impl CacheKey {
    fn new(source: &str, target: &str, text: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            digest: Sha256::digest(text.as_bytes()).into(),
        }
    }
}

/// Successful translations keyed by language pair and text hash.
///
/// Unbounded; entries live as long as the cache does.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<CacheKey, String>>,
}

static GLOBAL: OnceLock<Arc<TranslationCache>> = OnceLock::new();

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every translator that does not bring its own.
    pub fn global() -> Arc<TranslationCache> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TranslationCache::new())))
    }

    pub fn get(&self, source: &str, target: &str, text: &str) -> Option<String> {
        let key = CacheKey::new(source, target, text);
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).cloned()
    }

    pub fn insert(&self, source: &str, target: &str, text: &str, translated: String) {
        let key = CacheKey::new(source, target, text);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, translated);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

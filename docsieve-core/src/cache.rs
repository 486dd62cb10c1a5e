use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const DOCSIEVE_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const TEXT_CACHE_VERSION: &str = "1.1.0";
}

/// Text cache key (artifact bytes + extractor + extractor input -> text)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TextCacheKey {
    pub pdf_hash: String,
    pub extractor: String,
    /// Hash of whatever else the extractor reads, e.g. a sidecar text file
    #[serde(default)]
    pub input_hash: Option<String>,
    pub cache_version: String,
}

impl TextCacheKey {
    pub fn new(pdf_hash: String, extractor: &str) -> Self {
        Self {
            pdf_hash,
            extractor: extractor.to_string(),
            input_hash: None,
            cache_version: versions::TEXT_CACHE_VERSION.to_string(),
        }
    }

    pub fn with_input_hash(mut self, input_hash: Option<String>) -> Self {
        self.input_hash = input_hash;
        self
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.pdf_hash);
        hasher.update(&self.extractor);
        if let Some(input_hash) = &self.input_hash {
            hasher.update(b"input:");
            hasher.update(input_hash);
        }
        hasher.update(&self.cache_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached extraction result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextCacheValue {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub extraction_time_ms: u64,
    pub docsieve_version: String,
}

impl TextCacheValue {
    pub fn new(text: String, extraction_time_ms: u64) -> Self {
        Self {
            text,
            created_at: Utc::now(),
            extraction_time_ms,
            docsieve_version: versions::DOCSIEVE_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hash_depends_on_extractor() {
        let lopdf = TextCacheKey::new("abc".into(), "lopdf");
        let poppler = TextCacheKey::new("abc".into(), "pdftotext");
        assert_ne!(lopdf.to_cache_hash(), poppler.to_cache_hash());
        assert_eq!(lopdf.to_cache_hash(), TextCacheKey::new("abc".into(), "lopdf").to_cache_hash());
    }

    #[test]
    fn test_key_hash_depends_on_extractor_input() {
        let sidecar = |input: Option<&str>| {
            TextCacheKey::new("abc".into(), "sidecar")
                .with_input_hash(input.map(str::to_string))
                .to_cache_hash()
        };
        assert_ne!(sidecar(Some("v1")), sidecar(Some("v2")));
        assert_ne!(sidecar(None), sidecar(Some("v1")));
        assert_eq!(sidecar(Some("v1")), sidecar(Some("v1")));
    }
}

use crate::cache::{TextCacheKey, TextCacheValue};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for caching extracted document text
pub trait TextStorage {
    fn get_text(&self, key: &TextCacheKey) -> Result<Option<TextCacheValue>>;
    fn store_text(&self, key: &TextCacheKey, value: &TextCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        fs::create_dir_all(cache_dir.join("text"))?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    fn text_path(&self, key: &TextCacheKey) -> PathBuf {
        self.cache_dir
            .join("text")
            .join(format!("{}.json", key.to_cache_hash()))
    }
}

impl TextStorage for FileStorage {
    fn get_text(&self, key: &TextCacheKey) -> Result<Option<TextCacheValue>> {
        let path = self.text_path(key);
        if path.exists() {
            let json_str = fs::read_to_string(path)?;
            let value: TextCacheValue = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached text: {}", e))?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn store_text(&self, key: &TextCacheKey, value: &TextCacheValue) -> Result<()> {
        let json_str = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize cached text: {}", e))?;
        fs::write(self.text_path(key), json_str)?;
        Ok(())
    }
}

/// Calculate a fast hash for PDF content using start + end chunks
pub fn calculate_pdf_hash(pdf_bytes: &[u8]) -> String {
    let chunk_size = 1024; // 1KB from start and end
    let mut hasher = Sha256::new();

    // Hash file size first (for quick differentiation)
    hasher.update(pdf_bytes.len().to_le_bytes());

    let start_end = std::cmp::min(chunk_size, pdf_bytes.len());
    hasher.update(&pdf_bytes[0..start_end]);

    if pdf_bytes.len() > chunk_size {
        let end_start = pdf_bytes.len() - chunk_size;
        hasher.update(&pdf_bytes[end_start..]);
    }

    format!("{:x}", hasher.finalize())
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl TextStorage for NoOpStorage {
    fn get_text(&self, _key: &TextCacheKey) -> Result<Option<TextCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_text(&self, _key: &TextCacheKey, _value: &TextCacheValue) -> Result<()> {
        Ok(()) // No-op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_hash_consistency() {
        let pdf_data = b"%PDF-1.5 compiled inspection report";
        assert_eq!(calculate_pdf_hash(pdf_data), calculate_pdf_hash(pdf_data));
    }

    #[test]
    fn test_pdf_hash_uniqueness() {
        assert_ne!(calculate_pdf_hash(b"%PDF 1"), calculate_pdf_hash(b"%PDF 2"));
    }

    #[test]
    fn test_pdf_hash_sees_tail_of_large_files() {
        let mut a = vec![b'x'; 4096];
        let mut b = a.clone();
        a[4000] = b'a';
        b[4000] = b'b';
        assert_ne!(calculate_pdf_hash(&a), calculate_pdf_hash(&b));
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let key = TextCacheKey::new(calculate_pdf_hash(b"%PDF"), "lopdf");

        assert!(storage.get_text(&key).unwrap().is_none());
        storage
            .store_text(&key, &TextCacheValue::new("OFÍCIO Nº 1".to_string(), 3))
            .unwrap();
        let cached = storage.get_text(&key).unwrap().unwrap();
        assert_eq!(cached.text, "OFÍCIO Nº 1");
        assert_eq!(cached.extraction_time_ms, 3);
    }

    #[test]
    fn test_noop_storage_always_misses() {
        let storage = NoOpStorage::new();
        let key = TextCacheKey::new("h".into(), "lopdf");
        storage
            .store_text(&key, &TextCacheValue::new("x".into(), 0))
            .unwrap();
        assert!(storage.get_text(&key).unwrap().is_none());
    }
}

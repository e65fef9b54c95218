//! Address → coordinates cache, optionally persisted as JSON.
//!
//! The file is a single JSON object mapping each address to
//! `{"latitude": .., "longitude": ..}`, or to `null` when the service
//! found no match. Transient failures are never cached.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::{Coordinates, GeocodeError};

/// Lookup results keyed by full address.
#[derive(Debug, Clone, Default)]
pub struct GeocodeCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Option<Coordinates>>,
    dirty: bool,
}

impl GeocodeCache {
    /// A cache that lives for one run only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads a persisted cache. A missing file yields an empty cache that
    /// will be created on [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader(reader)?
        } else {
            log::debug!("No geocode cache at '{}', starting empty", path.display());
            BTreeMap::new()
        };

        log::info!(
            "Loaded {} cached geocode results from '{}'",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            dirty: false,
        })
    }

    /// Returns the cached result for `address`: `Some(None)` is a known
    /// miss, `None` means the address was never looked up.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<Option<Coordinates>> {
        self.entries.get(address).copied()
    }

    /// Records a lookup result.
    pub fn insert(&mut self, address: String, result: Option<Coordinates>) {
        self.entries.insert(address, result);
        self.dirty = true;
    }

    /// Number of cached addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to its file if it has one and changed.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be written.
    pub fn save(&self) -> Result<(), GeocodeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.entries)?;

        log::info!(
            "Saved {} geocode results to '{}'",
            self.entries.len(),
            path.display()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SE: Coordinates = Coordinates {
        latitude: -23.5505,
        longitude: -46.6333,
    };

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeocodeCache::load(&dir.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn persists_hits_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = GeocodeCache::load(&path).unwrap();
        cache.insert("PRACA DA SE, SAO PAULO - SP".to_string(), Some(SE));
        cache.insert("NOWHERE - SP".to_string(), None);
        cache.save().unwrap();

        let reloaded = GeocodeCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("PRACA DA SE, SAO PAULO - SP"), Some(Some(SE)));
        assert_eq!(reloaded.get("NOWHERE - SP"), Some(None));
        assert_eq!(reloaded.get("ELSEWHERE - SP"), None);
    }

    #[test]
    fn in_memory_cache_never_writes() {
        let mut cache = GeocodeCache::in_memory();
        cache.insert("A".to_string(), None);
        assert!(cache.save().is_ok());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            GeocodeCache::load(&path),
            Err(GeocodeError::Json(_))
        ));
    }
}

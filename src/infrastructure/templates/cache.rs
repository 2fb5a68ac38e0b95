//! Compiled-template cache keyed by resolved path or caller-supplied key.
//!
//! An entry is stale once the root file or any template it includes has a
//! modification time newer than the one recorded at compile time, or once the
//! helper registry has changed since. Staleness is only checked on lookup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::Tera;
use tracing::debug;

/// Metadata describing one compiled template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMetadata {
    pub path: PathBuf,
    #[serde(skip)]
    pub mtime: Option<SystemTime>,
    pub dependencies: Vec<String>,
    /// Resolved include files compiled alongside the root, with their mtimes
    #[serde(skip)]
    pub included: Vec<(PathBuf, SystemTime)>,
    pub source_len: usize,
}

impl TemplateMetadata {
    /// Newest modification time across the root file and its includes
    pub fn newest_mtime(&self) -> Option<SystemTime> {
        self.included
            .iter()
            .map(|(_, mtime)| *mtime)
            .chain(self.mtime)
            .max()
    }
}

/// A Tera instance holding one root template plus whatever it includes
pub struct CompiledTemplate {
    pub(crate) tera: Tera,
    pub(crate) name: String,
    pub(crate) helpers_version: u64,
    pub metadata: TemplateMetadata,
}

impl CompiledTemplate {
    pub fn render(&self, context: &tera::Context) -> tera::Result<String> {
        self.tera.render(&self.name, context)
    }
}

pub struct CacheEntry {
    pub compiled: CompiledTemplate,
    pub mtime: SystemTime,
    pub hits: u64,
    pub cached_at: DateTime<Utc>,
}

/// One row of [`CacheStats::entries`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryStats {
    pub key: String,
    pub path: PathBuf,
    pub hits: u64,
    pub size: usize,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage in `0.0..=100.0`
    pub hit_rate: f64,
    /// Sum of cached source lengths, in bytes
    pub memory_usage: usize,
    pub entries: Vec<CacheEntryStats>,
}

#[derive(Default)]
pub struct TemplateCache {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh entry, counting a hit, or evict a stale one and count a miss
    pub fn lookup(
        &mut self,
        key: &str,
        mtime: SystemTime,
        helpers_version: u64,
    ) -> Option<&mut CacheEntry> {
        let fresh = self.entries.get(key).is_some_and(|entry| {
            entry.mtime >= mtime && entry.compiled.helpers_version == helpers_version
        });

        if !fresh {
            if self.entries.remove(key).is_some() {
                debug!(%key, "Evicting stale template");
            }
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        Some(entry)
    }

    pub fn insert(&mut self, key: String, compiled: CompiledTemplate, mtime: SystemTime) {
        self.entries.insert(
            key,
            CacheEntry {
                compiled,
                mtime,
                hits: 0,
                cached_at: Utc::now(),
            },
        );
    }

    /// Include files recorded for an entry, empty when the key is not cached
    pub fn included_files(&self, key: &str) -> Vec<PathBuf> {
        self.entries
            .get(key)
            .map(|e| {
                e.compiled
                    .metadata
                    .included
                    .iter()
                    .map(|(path, _)| path.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove one entry
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove all entries and reset counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64 * 100.0
        };

        let mut entries: Vec<CacheEntryStats> = self
            .entries
            .iter()
            .map(|(key, entry)| CacheEntryStats {
                key: key.clone(),
                path: entry.compiled.metadata.path.clone(),
                hits: entry.hits,
                size: entry.compiled.metadata.source_len,
                cached_at: entry.cached_at,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            memory_usage: entries.iter().map(|e| e.size).sum(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn compiled(source: &str, helpers_version: u64) -> CompiledTemplate {
        let mut tera = Tera::default();
        tera.add_raw_template("t", source).unwrap();
        CompiledTemplate {
            tera,
            name: "t".to_string(),
            helpers_version,
            metadata: TemplateMetadata {
                path: PathBuf::from("/tmp/t.tera"),
                mtime: None,
                dependencies: Vec::new(),
                included: Vec::new(),
                source_len: source.len(),
            },
        }
    }

    #[test]
    fn test_lookup_counts_hits_and_misses() {
        let mut cache = TemplateCache::new();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);

        assert!(cache.lookup("a", mtime, 0).is_none());
        cache.insert("a".to_string(), compiled("hello", 0), mtime);
        assert!(cache.lookup("a", mtime, 0).is_some());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate, 50.0);
        assert_eq!(stats.entries[0].hits, 1);
        assert_eq!(stats.memory_usage, 5);
    }

    #[test]
    fn test_newer_file_evicts_entry() {
        let mut cache = TemplateCache::new();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        cache.insert("a".to_string(), compiled("hello", 0), old);

        let newer = old + Duration::from_secs(5);
        assert!(cache.lookup("a", newer, 0).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_helper_change_evicts_entry() {
        let mut cache = TemplateCache::new();
        let mtime = SystemTime::UNIX_EPOCH;
        cache.insert("a".to_string(), compiled("hello", 1), mtime);
        assert!(cache.lookup("a", mtime, 2).is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = TemplateCache::new();
        cache.insert("a".to_string(), compiled("a", 0), SystemTime::UNIX_EPOCH);
        cache.insert("b".to_string(), compiled("b", 0), SystemTime::UNIX_EPOCH);

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}

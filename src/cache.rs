//! Memoization of loaded tables, keyed by where they came from.
//!
//! Sources do not change while the process runs, so entries are never
//! invalidated. Failed loads are not stored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Identity of a data source: its canonical path when it resolves, the path
/// as given otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(PathBuf);

impl SourceId {
    pub fn of(path: &Path) -> Self {
        Self(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug)]
pub struct SourceCache<T> {
    entries: HashMap<SourceId, Arc<T>>,
}

impl<T> Default for SourceCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> SourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `path`, loading it on first use.
    pub fn get_or_load<E, F>(&mut self, path: &Path, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
    {
        let id = SourceId::of(path);
        if let Some(hit) = self.entries.get(&id) {
            debug!("cache hit for {}", id.path().display());
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(load(path)?);
        self.entries.insert(id, Arc::clone(&value));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.csv");
        std::fs::write(&path, "x\n").unwrap();

        let calls = Cell::new(0);
        let mut cache: SourceCache<usize> = SourceCache::new();
        let load = |_: &Path| -> Result<usize, ()> {
            calls.set(calls.get() + 1);
            Ok(42)
        };
        let a = cache.get_or_load(&path, load).unwrap();
        let b = cache.get_or_load(&dir.path().join("./calls.csv"), load).unwrap();
        assert_eq!((*a, *b), (42, 42));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache: SourceCache<u8> = SourceCache::new();
        let path = Path::new("missing.xlsx");
        assert!(cache.get_or_load(path, |_| Err::<u8, _>("absent")).is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_load(path, |_| Ok::<_, &str>(1)).unwrap(), 1);
    }
}

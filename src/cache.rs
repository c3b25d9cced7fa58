use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of image URLs that loaded successfully at least once.
///
/// Created by the composition root and cloned into every slider mount; all
/// clones share the same set. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    urls: Arc<Mutex<HashSet<String>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Returns `true` when the URL was not cached before.
    pub fn insert(&self, url: &str) -> bool {
        let mut urls = self.lock();
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_owned())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Inserts never leave the set half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let cache = ImageCache::new();
        let other = cache.clone();
        assert!(cache.insert("https://cdn.example/a.jpg"));
        assert!(other.contains("https://cdn.example/a.jpg"));
        assert!(!other.insert("https://cdn.example/a.jpg"));
        assert_eq!(cache.len(), 1);
    }
}

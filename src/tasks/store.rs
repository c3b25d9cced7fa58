use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::events::{Phase, Slide};
use crate::tasks::autoplay::next_index;

/// Slide list, active index and readiness set for one mount.
///
/// Indices only ever join the readiness set; a fresh load resets it.
#[derive(Debug, Clone)]
pub struct SlideStore {
    phase: Phase,
    slides: Arc<[Slide]>,
    current: usize,
    ready: BTreeSet<usize>,
}

impl Default for SlideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideStore {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            slides: Arc::from(Vec::new()),
            current: 0,
            ready: BTreeSet::new(),
        }
    }

    /// Installs the outcome of the slide fetch and marks the store ready.
    ///
    /// A failed fetch degrades to an empty list.
    pub fn load(&mut self, fetched: Result<Vec<Slide>>) {
        let slides = match fetched {
            Ok(slides) => slides,
            Err(err) => {
                warn!(error = %err, "failed to fetch showcase slides; rendering nothing");
                Vec::new()
            }
        };
        info!(count = slides.len(), "showcase slides loaded");
        self.slides = Arc::from(slides);
        self.current = 0;
        self.ready = BTreeSet::from([0]);
        self.phase = Phase::Ready;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn slides(&self) -> &Arc<[Slide]> {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn ready(&self) -> &BTreeSet<usize> {
        &self.ready
    }

    pub fn image_url(&self, index: usize) -> Option<&str> {
        self.slides.get(index).map(|slide| slide.image.as_str())
    }

    /// Moves to the next slide, wrapping. Returns the new index.
    pub fn advance(&mut self) -> usize {
        self.current = next_index(self.current, self.slides.len());
        self.current
    }

    /// Adds settled indices in one step; out-of-range indices are ignored.
    pub fn mark_ready<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        let len = self.slides.len();
        self.ready
            .extend(indices.into_iter().filter(|idx| *idx < len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn slides(n: usize) -> Vec<Slide> {
        (0..n)
            .map(|i| Slide {
                id: format!("s{i}"),
                title: format!("Slide {i}"),
                subtitle: None,
                image: format!("https://cdn.example/{i}.jpg"),
                order: i as i64,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .collect()
    }

    #[test]
    fn starts_loading_and_resets_on_load() {
        let mut store = SlideStore::new();
        assert_eq!(store.phase(), Phase::Loading);

        store.load(Ok(slides(3)));
        assert!(store.is_ready());
        assert_eq!(store.ready(), &BTreeSet::from([0]));

        store.mark_ready([1, 2]);
        store.advance();
        store.load(Ok(slides(2)));
        assert_eq!(store.current(), 0);
        assert_eq!(store.ready(), &BTreeSet::from([0]));
    }

    #[test]
    fn fetch_error_becomes_empty_list() {
        let mut store = SlideStore::new();
        store.load(Err(Error::Status {
            status: 503,
            url: "http://api/showcase".into(),
        }));
        assert!(store.is_ready());
        assert!(store.is_empty());
    }

    #[test]
    fn advance_wraps_and_ready_set_only_grows() {
        let mut store = SlideStore::new();
        store.load(Ok(slides(3)));
        assert_eq!(store.advance(), 1);
        assert_eq!(store.advance(), 2);
        assert_eq!(store.advance(), 0);

        store.mark_ready([2, 7]);
        let before = store.ready().clone();
        store.mark_ready([1]);
        assert!(store.ready().is_superset(&before));
        assert_eq!(store.ready(), &BTreeSet::from([0, 1, 2]));
    }
}

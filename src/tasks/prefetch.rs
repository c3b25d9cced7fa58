use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::events::PrefetchOutcome;
use crate::tasks::preloader::Preloader;

/// How a prefetch batch gets out of the way of foreground work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStrategy {
    /// Yield to the runtime so already-queued tasks run first.
    Idle,
    /// Wait a fixed short delay.
    Delay(Duration),
}

impl IdleStrategy {
    pub async fn wait(self) {
        match self {
            IdleStrategy::Idle => tokio::task::yield_now().await,
            IdleStrategy::Delay(delay) => sleep(delay).await,
        }
    }
}

/// Previous, current and next index, wrapping around. `{0}` for `len <= 1`.
pub fn adjacent_indices(current: usize, len: usize) -> BTreeSet<usize> {
    if len <= 1 {
        return BTreeSet::from([0]);
    }
    let current = current % len;
    BTreeSet::from([(current + len - 1) % len, current, (current + 1) % len])
}

/// Decides which neighbour images still need warming for one mount.
#[derive(Debug, Default)]
pub struct PrefetchScheduler {
    in_flight: BTreeSet<usize>,
}

impl PrefetchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices to preload for `current`, excluding ready and in-flight ones.
    ///
    /// The returned indices are recorded as in flight until [`settle`] is
    /// called with them; an empty result means there is nothing to do.
    ///
    /// [`settle`]: PrefetchScheduler::settle
    pub fn plan(&mut self, current: usize, len: usize, ready: &BTreeSet<usize>) -> BTreeSet<usize> {
        if len == 0 {
            return BTreeSet::new();
        }
        let wanted: BTreeSet<usize> = adjacent_indices(current, len)
            .into_iter()
            .filter(|idx| !ready.contains(idx) && !self.in_flight.contains(idx))
            .collect();
        self.in_flight.extend(wanted.iter().copied());
        trace!(current, len, ?wanted, "prefetch plan");
        wanted
    }

    pub fn settle(&mut self, indices: &BTreeSet<usize>) {
        for idx in indices {
            self.in_flight.remove(idx);
        }
    }

    pub fn in_flight(&self) -> &BTreeSet<usize> {
        &self.in_flight
    }
}

/// Waits for an idle slot, preloads every `(index, url)` in parallel and
/// reports them together.
///
/// Returns `None` without issuing any request when the mount died while
/// the batch was waiting. If the element left the viewport during the wait
/// the batch is reported as skipped so the mount can plan it again.
pub async fn run_batch(
    preloader: Preloader,
    strategy: IdleStrategy,
    batch: Vec<(usize, String)>,
    alive: CancellationToken,
    visibility: watch::Receiver<bool>,
) -> Option<PrefetchOutcome> {
    strategy.wait().await;
    if alive.is_cancelled() {
        trace!(size = batch.len(), "mount gone before prefetch started");
        return None;
    }
    let indices: BTreeSet<usize> = batch.iter().map(|(idx, _)| *idx).collect();
    let in_view = visibility.has_changed().is_ok() && *visibility.borrow();
    // Only the gate above needs the observer; release it before loading.
    drop(visibility);
    if !in_view {
        debug!(?indices, "element hidden before prefetch started");
        return Some(PrefetchOutcome::Skipped(indices));
    }
    join_all(batch.iter().map(|(_, url)| preloader.preload(url))).await;
    debug!(?indices, "prefetch batch settled");
    Some(PrefetchOutcome::Settled(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ImageCache;
    use crate::error::Result;
    use crate::tasks::preloader::ImageFetcher;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn adjacency_wraps_and_collapses() {
        assert_eq!(adjacent_indices(0, 0), BTreeSet::from([0]));
        assert_eq!(adjacent_indices(0, 1), BTreeSet::from([0]));
        assert_eq!(adjacent_indices(0, 2), BTreeSet::from([0, 1]));
        assert_eq!(adjacent_indices(1, 2), BTreeSet::from([0, 1]));
        assert_eq!(adjacent_indices(0, 3), BTreeSet::from([2, 0, 1]));
        assert_eq!(adjacent_indices(4, 5), BTreeSet::from([3, 4, 0]));
    }

    #[test]
    fn adjacency_matches_formula_for_all_small_lists() {
        for n in 2..12 {
            for i in 0..n {
                let expected = BTreeSet::from([(i + n - 1) % n, i, (i + 1) % n]);
                assert_eq!(adjacent_indices(i, n), expected, "n={n} i={i}");
            }
        }
    }

    #[test]
    fn plan_skips_ready_and_in_flight() {
        let mut scheduler = PrefetchScheduler::new();
        let ready = BTreeSet::from([0]);

        assert_eq!(scheduler.plan(0, 3, &ready), BTreeSet::from([1, 2]));
        // Same index, same readiness: nothing new to request.
        assert!(scheduler.plan(0, 3, &ready).is_empty());

        scheduler.settle(&BTreeSet::from([1, 2]));
        assert!(scheduler.in_flight().is_empty());
        let ready = BTreeSet::from([0, 1, 2]);
        assert!(scheduler.plan(1, 3, &ready).is_empty());
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ImageFetcher for Counting {
        async fn fetch(&self, _url: &str) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn batch() -> Vec<(usize, String)> {
        vec![
            (1, "https://cdn/1.jpg".to_string()),
            (2, "https://cdn/2.jpg".to_string()),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn batch_waits_for_delay_then_loads() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0)));
        let preloader = Preloader::new(ImageCache::new(), fetcher.clone());
        let (_tx, rx) = watch::channel(true);
        let start = tokio::time::Instant::now();

        let outcome = run_batch(
            preloader,
            IdleStrategy::Delay(Duration::from_millis(100)),
            batch(),
            CancellationToken::new(),
            rx,
        )
        .await;

        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(outcome, Some(PrefetchOutcome::Settled(BTreeSet::from([1, 2]))));
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_hidden_during_delay_requests_nothing() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0)));
        let preloader = Preloader::new(ImageCache::new(), fetcher.clone());
        let (tx, rx) = watch::channel(true);

        let pending = tokio::spawn(run_batch(
            preloader,
            IdleStrategy::Delay(Duration::from_millis(100)),
            batch(),
            CancellationToken::new(),
            rx,
        ));
        tx.send_replace(false);

        let outcome = pending.await.unwrap();
        assert_eq!(outcome, Some(PrefetchOutcome::Skipped(BTreeSet::from([1, 2]))));
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 0);
        assert_eq!(tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn closed_observer_counts_as_hidden() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0)));
        let preloader = Preloader::new(ImageCache::new(), fetcher.clone());
        let (tx, rx) = watch::channel(true);
        drop(tx);

        let outcome = run_batch(
            preloader,
            IdleStrategy::Idle,
            batch(),
            CancellationToken::new(),
            rx,
        )
        .await;
        assert!(matches!(outcome, Some(PrefetchOutcome::Skipped(_))));
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_mount_gets_no_outcome() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0)));
        let preloader = Preloader::new(ImageCache::new(), fetcher.clone());
        let (_tx, rx) = watch::channel(true);
        let alive = CancellationToken::new();
        alive.cancel();

        let outcome = run_batch(preloader, IdleStrategy::Idle, batch(), alive, rx).await;
        assert_eq!(outcome, None);
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn plan_is_empty_without_slides_or_for_single_slide() {
        let mut scheduler = PrefetchScheduler::new();
        assert!(scheduler.plan(0, 0, &BTreeSet::new()).is_empty());
        assert!(scheduler.plan(0, 1, &BTreeSet::from([0])).is_empty());
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::config::Configuration;
use crate::content::ContentApi;
use crate::events::{PrefetchOutcome, SliderSnapshot};
use crate::tasks::autoplay::{AutoplayGate, AutoplayTimer};
use crate::tasks::prefetch::{IdleStrategy, PrefetchScheduler, run_batch};
use crate::tasks::preloader::Preloader;
use crate::tasks::store::SlideStore;

#[derive(Debug, Clone, Copy)]
pub struct SliderOptions {
    pub autoplay_interval: Duration,
    pub idle: IdleStrategy,
}

impl From<&Configuration> for SliderOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            autoplay_interval: cfg.autoplay_interval,
            idle: cfg.prefetch.idle_strategy(),
        }
    }
}

impl Default for SliderOptions {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

/// One live slider instance.
///
/// Dropping the mount cancels it; [`Mount::unmount`] also waits for the
/// task to wind down.
pub struct Mount {
    alive: CancellationToken,
    snapshots: watch::Receiver<SliderSnapshot>,
    handle: JoinHandle<Result<()>>,
}

impl Mount {
    pub fn spawn(
        api: Arc<dyn ContentApi>,
        preloader: Preloader,
        visibility: watch::Receiver<bool>,
        options: SliderOptions,
    ) -> Self {
        let alive = CancellationToken::new();
        let (snapshot_tx, snapshots) = watch::channel(SliderSnapshot::loading());
        let handle = tokio::spawn(run(
            api,
            preloader,
            visibility,
            options,
            alive.clone(),
            snapshot_tx,
        ));
        Self {
            alive,
            snapshots,
            handle,
        }
    }

    pub fn snapshot(&self) -> SliderSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<SliderSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_mounted(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Tears the mount down and waits for its task to exit.
    pub async fn unmount(mut self) -> Result<()> {
        self.alive.cancel();
        (&mut self.handle).await.context("slider task panicked")?
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.alive.cancel();
    }
}

/// Handles shared by every prefetch batch of one mount.
struct PrefetchContext {
    preloader: Preloader,
    idle: IdleStrategy,
    alive: CancellationToken,
    visibility: watch::Receiver<bool>,
    settled_tx: mpsc::Sender<PrefetchOutcome>,
    passes: u64,
    batches: u64,
}

impl PrefetchContext {
    /// Runs the scheduler for the current index and spawns a batch for
    /// whatever it asks for.
    fn schedule(&mut self, store: &SlideStore, scheduler: &mut PrefetchScheduler) {
        self.passes += 1;
        let wanted = scheduler.plan(store.current(), store.len(), store.ready());
        if wanted.is_empty() {
            trace!(current = store.current(), "neighbours already warm");
            return;
        }
        let batch: Vec<(usize, String)> = wanted
            .iter()
            .filter_map(|idx| store.image_url(*idx).map(|url| (*idx, url.to_string())))
            .collect();
        self.batches += 1;
        debug!(current = store.current(), indices = ?wanted, "prefetching neighbours");
        let preloader = self.preloader.clone();
        let idle = self.idle;
        let alive = self.alive.clone();
        let visibility = self.visibility.clone();
        let settled_tx = self.settled_tx.clone();
        // Not tied to the mount: a preload in flight finishes even after unmount.
        tokio::spawn(async move {
            if let Some(outcome) = run_batch(preloader, idle, batch, alive, visibility).await {
                let _ = settled_tx.send(outcome).await;
            }
        });
    }
}

fn gate(store: &SlideStore, visible: bool) -> AutoplayGate {
    AutoplayGate {
        ready: store.is_ready(),
        slide_count: store.len(),
        visible,
    }
}

fn publish(
    tx: &watch::Sender<SliderSnapshot>,
    store: &SlideStore,
    visible: bool,
    timer: &AutoplayTimer,
    prefetch: &PrefetchContext,
) {
    tx.send_replace(SliderSnapshot {
        phase: store.phase(),
        slides: Arc::clone(store.slides()),
        current: store.current(),
        ready: store.ready().clone(),
        visible,
        autoplay: timer.state(),
        prefetch_passes: prefetch.passes,
        prefetch_batches: prefetch.batches,
    });
}

/// Drives one mount from fetch to unmount.
///
/// Rules:
/// - The slide list is fetched once; a failure counts as an empty list.
/// - The first image is preloaded before the store reports ready.
/// - Autoplay runs only while ready, visible and holding more than one slide.
/// - Neighbours are prefetched on every index change and every time the
///   element scrolls back into view, never while hidden. A batch that finds
///   the element hidden after its idle wait is skipped and planned again.
/// - Nothing is published once `alive` is cancelled.
#[instrument(name = "slider", skip_all)]
pub async fn run(
    api: Arc<dyn ContentApi>,
    preloader: Preloader,
    mut visibility: watch::Receiver<bool>,
    options: SliderOptions,
    alive: CancellationToken,
    snapshot_tx: watch::Sender<SliderSnapshot>,
) -> Result<()> {
    let mut store = SlideStore::new();
    let mut scheduler = PrefetchScheduler::new();
    let mut timer = AutoplayTimer::new(options.autoplay_interval);
    let (settled_tx, mut settled_rx) = mpsc::channel::<PrefetchOutcome>(16);
    let mut prefetch = PrefetchContext {
        preloader: preloader.clone(),
        idle: options.idle,
        alive: alive.clone(),
        visibility: visibility.clone(),
        settled_tx,
        passes: 0,
        batches: 0,
    };

    let fetched = select! {
        _ = alive.cancelled() => {
            debug!("unmounted while fetching slides");
            return Ok(());
        }
        fetched = api.fetch_slides() => fetched,
    };
    let first_image = fetched
        .as_ref()
        .ok()
        .and_then(|slides| slides.first())
        .map(|slide| slide.image.clone());
    if let Some(url) = first_image {
        select! {
            _ = alive.cancelled() => {
                debug!("unmounted while preloading first slide");
                return Ok(());
            }
            _ = preloader.preload(&url) => {}
        }
    }
    store.load(fetched);

    let mut visible = *visibility.borrow_and_update();
    let mut observing = true;
    timer.update(gate(&store, visible));
    if visible {
        prefetch.schedule(&store, &mut scheduler);
    }
    publish(&snapshot_tx, &store, visible, &timer, &prefetch);

    loop {
        select! {
            _ = alive.cancelled() => break,

            changed = visibility.changed(), if observing => {
                let now = match changed {
                    Ok(()) => *visibility.borrow_and_update(),
                    Err(_) => {
                        // Observer gone: the element can no longer be on screen.
                        observing = false;
                        false
                    }
                };
                if now == visible {
                    continue;
                }
                visible = now;
                let rebuilt = timer.update(gate(&store, visible));
                debug!(visible, autoplay = ?timer.state(), rebuilt, "visibility changed");
                if visible {
                    prefetch.schedule(&store, &mut scheduler);
                }
                publish(&snapshot_tx, &store, visible, &timer, &prefetch);
            }

            _ = timer.tick() => {
                let current = store.advance();
                debug!(current, "autoplay advanced");
                if visible {
                    prefetch.schedule(&store, &mut scheduler);
                }
                publish(&snapshot_tx, &store, visible, &timer, &prefetch);
            }

            Some(outcome) = settled_rx.recv() => {
                if alive.is_cancelled() {
                    break;
                }
                match outcome {
                    PrefetchOutcome::Settled(indices) => {
                        scheduler.settle(&indices);
                        store.mark_ready(indices);
                    }
                    PrefetchOutcome::Skipped(indices) => {
                        scheduler.settle(&indices);
                        // Back in view before the skip arrived: that pass saw these in flight.
                        if visible && observing && *visibility.borrow() {
                            prefetch.schedule(&store, &mut scheduler);
                        }
                    }
                }
                publish(&snapshot_tx, &store, visible, &timer, &prefetch);
            }
        }
    }

    timer.stop();
    drop(visibility);
    drop(prefetch.visibility);
    info!(
        slides = store.len(),
        ready = store.ready().len(),
        passes = prefetch.passes,
        "slider unmounted"
    );
    Ok(())
}

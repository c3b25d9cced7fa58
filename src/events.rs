use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One showcase entry as served by the content API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Absolute URL once the content layer has resolved it.
    pub image: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Reported by a prefetch batch back to the mount that planned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// Every preload in the batch settled.
    Settled(BTreeSet<usize>),
    /// The element left the viewport before the batch started; nothing was requested.
    Skipped(BTreeSet<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Slide list or first image still pending.
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayState {
    Stopped,
    Running,
}

/// Published by a mounted slider after every state change.
#[derive(Debug, Clone)]
pub struct SliderSnapshot {
    pub phase: Phase,
    pub slides: Arc<[Slide]>,
    pub current: usize,
    pub ready: BTreeSet<usize>,
    pub visible: bool,
    pub autoplay: AutoplayState,
    /// Times the prefetch scheduler was consulted during this mount.
    pub prefetch_passes: u64,
    /// Passes that actually issued preloads.
    pub prefetch_batches: u64,
}

impl SliderSnapshot {
    pub fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            slides: Arc::from(Vec::new()),
            current: 0,
            ready: BTreeSet::new(),
            visible: false,
            autoplay: AutoplayState::Stopped,
            prefetch_passes: 0,
            prefetch_batches: 0,
        }
    }
}

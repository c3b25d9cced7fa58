use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::events::AutoplayState;

/// Inputs deciding whether the slideshow rotates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoplayGate {
    pub ready: bool,
    pub slide_count: usize,
    pub visible: bool,
}

impl AutoplayGate {
    pub fn should_run(&self) -> bool {
        self.ready && self.slide_count > 1 && self.visible
    }
}

/// Interval driver that is rebuilt whenever its gate changes.
#[derive(Debug)]
pub struct AutoplayTimer {
    period: Duration,
    gate: AutoplayGate,
    interval: Option<Interval>,
}

impl AutoplayTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            gate: AutoplayGate::default(),
            interval: None,
        }
    }

    pub fn state(&self) -> AutoplayState {
        if self.interval.is_some() {
            AutoplayState::Running
        } else {
            AutoplayState::Stopped
        }
    }

    /// Applies a new gate; returns `true` when the timer was torn down or recreated.
    pub fn update(&mut self, gate: AutoplayGate) -> bool {
        if gate == self.gate {
            return false;
        }
        self.gate = gate;
        self.interval = gate.should_run().then(|| {
            let mut interval = interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        true
    }

    pub fn stop(&mut self) {
        self.gate = AutoplayGate::default();
        self.interval = None;
    }

    /// Resolves on the next tick; pends forever while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// `(current + 1) mod len`; stays at zero for an empty list.
pub fn next_index(current: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (current + 1) % len }
}

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::tasks::prefetch::IdleStrategy;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Base URL of the content API (the `/showcase` route lives below it).
    pub api_url: String,
    /// Origin used to absolutize server-relative image paths.
    pub backend_url: String,
    /// Ask the content API for inactive slides as well (`?all=true`).
    pub include_inactive: bool,
    /// Timeout applied to every HTTP request (slide list and images).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long a fetched slide list is reused before asking the API again.
    /// Zero disables the response cache.
    #[serde(with = "humantime_serde")]
    pub content_cache_ttl: Duration,
    /// Delay between automatic slide advances.
    #[serde(with = "humantime_serde")]
    pub autoplay_interval: Duration,
    /// Viewport intersection settings gating autoplay and prefetch.
    pub visibility: VisibilityOptions,
    /// Neighbour prefetch scheduling.
    pub prefetch: PrefetchOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.api_url.trim().is_empty(), "api-url must not be empty");
        ensure!(
            self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://"),
            "backend-url must be an http(s) origin"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be greater than zero"
        );
        ensure!(
            !self.autoplay_interval.is_zero(),
            "autoplay-interval must be greater than zero"
        );
        self.visibility
            .validate()
            .context("invalid visibility configuration")?;
        self.prefetch
            .validate()
            .context("invalid prefetch configuration")?;
        Ok(self)
    }

    /// Route serving the slide list, honouring `include-inactive`.
    pub fn showcase_url(&self) -> String {
        let base = self.api_url.trim_end_matches('/');
        if self.include_inactive {
            format!("{base}/showcase?all=true")
        } else {
            format!("{base}/showcase")
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            include_inactive: false,
            request_timeout: Duration::from_secs(10),
            content_cache_ttl: Duration::from_secs(5 * 60),
            autoplay_interval: Duration::from_millis(5000),
            visibility: VisibilityOptions::default(),
            prefetch: PrefetchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct VisibilityOptions {
    /// Fraction of the element's area that must intersect the viewport.
    pub threshold: f64,
    /// Margin added around every edge of the viewport before intersecting.
    pub root_margin: f64,
}

impl VisibilityOptions {
    const fn default_threshold() -> f64 {
        0.1
    }

    const fn default_root_margin() -> f64 {
        50.0
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.threshold.is_finite() && self.threshold > 0.0 && self.threshold <= 1.0,
            "visibility.threshold must be within (0, 1]"
        );
        ensure!(
            self.root_margin.is_finite() && self.root_margin >= 0.0,
            "visibility.root-margin must be non-negative"
        );
        Ok(())
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            root_margin: Self::default_root_margin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrefetchStrategy {
    /// Yield to the runtime so queued work runs before the batch.
    Idle,
    /// Always wait `fallback-delay` before the batch.
    Delay,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PrefetchOptions {
    pub strategy: PrefetchStrategy,
    #[serde(with = "humantime_serde")]
    pub fallback_delay: Duration,
}

impl PrefetchOptions {
    pub fn idle_strategy(&self) -> IdleStrategy {
        match self.strategy {
            PrefetchStrategy::Idle => IdleStrategy::Idle,
            PrefetchStrategy::Delay => IdleStrategy::Delay(self.fallback_delay),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.fallback_delay <= Duration::from_secs(5),
            "prefetch.fallback-delay must be at most 5s"
        );
        Ok(())
    }
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            strategy: PrefetchStrategy::Idle,
            fallback_delay: Duration::from_millis(100),
        }
    }
}

//! Content API client for the showcase slide list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::events::Slide;

/// Source of the ordered slide list.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn fetch_slides(&self) -> Result<Vec<Slide>>;
}

#[async_trait]
impl<T: ContentApi + ?Sized> ContentApi for Arc<T> {
    async fn fetch_slides(&self) -> Result<Vec<Slide>> {
        (**self).fetch_slides().await
    }
}

/// Turns a stored image reference into a fetchable URL.
///
/// Absolute `http(s)` URLs pass through, anything else is appended to the
/// backend origin. An empty reference stays empty.
pub fn resolve_image_url(backend_url: &str, image: &str) -> String {
    if image.is_empty() {
        return String::new();
    }
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    format!("{}{}", backend_url.trim_end_matches('/'), image)
}

/// `GET {api-url}/showcase` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: reqwest::Client,
    url: String,
    backend_url: String,
}

impl HttpContentApi {
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: reqwest::Client, cfg: &Configuration) -> Self {
        Self {
            client,
            url: cfg.showcase_url(),
            backend_url: cfg.backend_url.clone(),
        }
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_slides(&self) -> Result<Vec<Slide>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        let body = response.bytes().await?;
        let mut slides: Vec<Slide> = serde_json::from_slice(&body)?;
        for slide in &mut slides {
            slide.image = resolve_image_url(&self.backend_url, &slide.image);
        }
        debug!(count = slides.len(), "fetched showcase slides");
        Ok(slides)
    }
}

/// Reuses the last successful slide list for `ttl`.
///
/// Failed fetches are never cached. Concurrent callers wait on the same
/// refresh instead of issuing their own.
pub struct CachedContentApi<A> {
    inner: A,
    ttl: Duration,
    entry: Mutex<Option<CachedSlides>>,
}

struct CachedSlides {
    fetched_at: Instant,
    slides: Vec<Slide>,
}

impl<A: ContentApi> CachedContentApi<A> {
    pub fn new(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Drops the cached list so the next fetch goes to the API.
    pub async fn invalidate(&self) {
        self.entry.lock().await.take();
    }
}

#[async_trait]
impl<A: ContentApi> ContentApi for CachedContentApi<A> {
    async fn fetch_slides(&self) -> Result<Vec<Slide>> {
        if self.ttl.is_zero() {
            return self.inner.fetch_slides().await;
        }
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!(count = cached.slides.len(), "serving cached slide list");
                return Ok(cached.slides.clone());
            }
        }
        let slides = self.inner.fetch_slides().await?;
        *entry = Some(CachedSlides {
            fetched_at: Instant::now(),
            slides: slides.clone(),
        });
        Ok(slides)
    }
}

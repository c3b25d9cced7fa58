use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::cache::ImageCache;
use crate::config::Configuration;
use crate::error::{Error, Result};

/// Fetches one image off-tree so the renderer can paint it later.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<()>;
}

/// Downloads the image and checks that it decodes.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        let owned_url = url.to_string();
        // Decoding is CPU bound; keep it off the async workers.
        let decoded = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes)
                .map(|img| (img.width(), img.height()))
                .map_err(|source| Error::Image {
                    url: owned_url,
                    source,
                })
        })
        .await
        .map_err(|join| Error::Io(std::io::Error::other(join)))??;
        trace!(url, width = decoded.0, height = decoded.1, "image decoded");
        Ok(())
    }
}

/// Marker returned once a preload finished, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled;

/// Best-effort image warmer backed by the shared [`ImageCache`].
#[derive(Clone)]
pub struct Preloader {
    cache: ImageCache,
    fetcher: Arc<dyn ImageFetcher>,
}

impl Preloader {
    pub fn new(cache: ImageCache, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Resolves once `url` has loaded or failed. Never errors.
    ///
    /// Cached URLs resolve without touching the network. Failures are not
    /// remembered, so a later mount tries the URL again.
    pub async fn preload(&self, url: &str) -> Settled {
        if url.is_empty() {
            debug!("skipping preload of empty image url");
            return Settled;
        }
        if self.cache.contains(url) {
            trace!(url, "image already cached");
            return Settled;
        }
        match self.fetcher.fetch(url).await {
            Ok(()) => {
                self.cache.insert(url);
                debug!(url, "image preloaded");
            }
            Err(err) => debug!(url, error = %err, "image preload failed; treating as settled"),
        }
        Settled
    }
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

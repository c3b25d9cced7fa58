use thiserror::Error;

/// Library error type for showcase operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The content API could not be reached or the request timed out.
    #[error("content api request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The content API answered with a non-success status.
    #[error("content api returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body was not a valid slide list.
    #[error("malformed slide list: {0}")]
    Decode(#[from] serde_json::Error),

    /// The fetched bytes are not a decodable image.
    #[error("invalid image data from {url}: {source}")]
    Image {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::path::PathBuf;

use thiserror::Error;

/// Why an image could not be retrieved. The embedder never surfaces these to
/// its caller; the affected `<img>` is left as it was.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("neither an existing file nor an http(s) URL: {locator}")]
    UnsupportedLocator { locator: String },
    #[error("HTTP client initialization failed: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn unsupported(locator: &str) -> Self {
        Self::UnsupportedLocator {
            locator: locator.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("unknown embedding mode `{value}` (expected base64 or cid)")]
    UnknownMode { value: String },
    #[error("unsupported data-convert value `{value}` (expected png, jpg, jpeg or gif)")]
    UnsupportedFormat { value: String },
    #[error("unsupported data-format value `{value}` (expected rgb or rgba)")]
    UnsupportedPixelFormat { value: String },
    #[error("converting {locator} failed: {source}")]
    Conversion {
        locator: String,
        #[source]
        source: image::ImageError,
    },
    #[error("HTML rewriting failed: {source}")]
    Html {
        #[from]
        source: lol_html::errors::RewritingError,
    },
}

impl EmbedError {
    pub(crate) fn conversion(locator: &str, source: image::ImageError) -> Self {
        Self::Conversion {
            locator: locator.to_string(),
            source,
        }
    }
}

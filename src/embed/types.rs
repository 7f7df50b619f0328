use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use super::EmbedError;

/// Attribute added to every `<img>` the embedder rewrote.
pub const MARKER_ATTRIBUTE: &str = "data-mailprep";

/// Where embedded bytes end up.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// `src` becomes a `data:` URI.
    Base64,
    /// Bytes go to the [`MimeAssembler`](super::MimeAssembler); `src` becomes
    /// `cid:<content-id>`.
    Cid,
}

impl FromStr for EmbedMode {
    type Err = EmbedError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "cid" => Ok(Self::Cid),
            _ => Err(EmbedError::UnknownMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for EmbedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base64 => "base64",
            Self::Cid => "cid",
        })
    }
}

/// Container requested by `data-convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Png,
    Jpeg,
    Gif,
}

impl TargetFormat {
    pub fn parse(value: &str) -> Result<Self, EmbedError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            _ => Err(EmbedError::UnsupportedFormat {
                value: value.to_string(),
            }),
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
        }
    }

    pub fn subtype(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
        }
    }
}

/// Pixel layout requested by `data-format`; RGB when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelFormat {
    #[default]
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn parse(value: &str) -> Result<Self, EmbedError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "rgba" => Ok(Self::Rgba),
            _ => Err(EmbedError::UnsupportedPixelFormat {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionDirective {
    pub format: TargetFormat,
    pub pixel: PixelFormat,
}

/// Knobs for [`DefaultFetcher`](super::DefaultFetcher).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    /// Relative local paths are looked up here instead of the working
    /// directory.
    pub base_dir: Option<PathBuf>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            user_agent: concat!("mailprep/", env!("CARGO_PKG_VERSION")).to_string(),
            base_dir: None,
        }
    }
}

impl EmbedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero timeout disables the request deadline.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        if self.fetch_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.fetch_timeout_ms))
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

/// Image references found in a document, by kind.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerCounts {
    /// `src` is a `data:` URI with a `;base64,` payload.
    pub base64: usize,
    /// `src` is a `cid:` reference.
    pub cid: usize,
    /// The tag carries the marker attribute.
    pub marked: usize,
}

//! Inline image embedding for HTML e-mail bodies.
//!
//! [`embed_images`] rewrites every `<img>` of a document either to a base64
//! `data:` URI or to a `cid:` reference whose bytes are handed to a
//! [`MimeAssembler`]. Content identifiers only depend on the image bytes and
//! the tag's position, so the same document always yields the same ids.
//!
//! Two attributes steer an individual image:
//!
//! * `data-convert="png|jpg|jpeg|gif"` re-encodes the image when it is in
//!   another container.
//! * `data-format="rgb|rgba"` picks the pixel layout used for that
//!   re-encoding (RGB by default).

mod convert;
mod error;
mod fetch;
mod mime;
mod scan;
mod text;
mod types;

pub use error::{EmbedError, FetchError};
pub use fetch::{DefaultFetcher, Fetcher};
pub use mime::{Disposition, EmbeddedImagePart, InlineParts, MimeAssembler};
pub use text::html_to_plain_text;
pub use types::{
    ConversionDirective, EmbedMode, EmbedOptions, MARKER_ATTRIBUTE, MarkerCounts, PixelFormat,
    TargetFormat,
};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use scan::{ImgTag, SrcEdit};

/// Embeds the images of `html` with `fetcher`, pushing CID parts into
/// `assembler`. See [`Embedder::embed`].
pub fn embed_images<F, M>(
    html: &str,
    mode: EmbedMode,
    fetcher: &F,
    assembler: &mut M,
) -> Result<String, EmbedError>
where
    F: Fetcher + ?Sized,
    M: MimeAssembler + ?Sized,
{
    Embedder::new(fetcher).embed(html, mode, assembler)
}

/// Counts `<img>` tags by how their source is embedded.
pub fn count_markers(html: &str) -> Result<MarkerCounts, EmbedError> {
    let mut counts = MarkerCounts::default();
    for tag in scan::img_tags(html)? {
        if let Some(src) = tag.src() {
            if starts_with_ignore_ascii_case(&src, "data:") && src.contains(";base64,") {
                counts.base64 += 1;
            } else if starts_with_ignore_ascii_case(&src, "cid:") {
                counts.cid += 1;
            }
        }
        if tag.has_attribute(MARKER_ATTRIBUTE) {
            counts.marked += 1;
        }
    }
    Ok(counts)
}

#[derive(Debug, Clone)]
pub struct Embedder<F> {
    fetcher: F,
}

impl Embedder<DefaultFetcher> {
    /// An embedder reading local files and http(s) URLs.
    pub fn from_options(options: &EmbedOptions) -> Result<Self, FetchError> {
        DefaultFetcher::new(options).map(Self::new)
    }
}

/// One `<img>` that will be fetched, with its validated directive.
struct Candidate {
    tag: ImgTag,
    locator: String,
    directive: Option<ConversionDirective>,
}

impl<F> Embedder<F>
where
    F: Fetcher,
{
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Rewrites the `<img>` tags of `html` for `mode`.
    ///
    /// Tags already carrying the marker attribute, without a `src`, or with a
    /// `data:`/`cid:` source are left alone. Conversion directives of all
    /// remaining tags are validated before anything is fetched. A tag whose
    /// image cannot be fetched keeps its original bytes and produces no part.
    pub fn embed<M>(&self, html: &str, mode: EmbedMode, assembler: &mut M) -> Result<String, EmbedError>
    where
        M: MimeAssembler + ?Sized,
    {
        let candidates = candidates(html)?;
        let mut edits = Vec::new();

        for candidate in candidates {
            let bytes = match self.fetcher.get(&candidate.locator) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        locator = %candidate.locator,
                        error = %err,
                        "image fetch failed, leaving tag unchanged"
                    );
                    continue;
                }
            };

            let bytes = match candidate.directive {
                Some(directive) => convert::convert(&bytes, directive)
                    .map_err(|err| EmbedError::conversion(&candidate.locator, err))?
                    .unwrap_or(bytes),
                None => bytes,
            };

            let Some(subtype) = convert::detect_subtype(&bytes, &candidate.locator) else {
                tracing::warn!(
                    locator = %candidate.locator,
                    "image type not recognized, leaving tag unchanged"
                );
                continue;
            };

            let src = match mode {
                EmbedMode::Base64 => {
                    let ext = convert::locator_extension(&candidate.locator).unwrap_or(subtype);
                    format!("data:image/{ext};base64,{}", STANDARD.encode(&bytes))
                }
                EmbedMode::Cid => {
                    let content_id = content_id(&bytes, candidate.tag.ordinal);
                    assembler.attach(bytes, &subtype, &content_id, Disposition::Inline);
                    format!("cid:{content_id}")
                }
            };

            tracing::debug!(
                ordinal = candidate.tag.ordinal,
                locator = %candidate.locator,
                %mode,
                "image embedded"
            );
            edits.push(SrcEdit {
                ordinal: candidate.tag.ordinal,
                src,
            });
        }

        Ok(scan::apply(html, &edits)?)
    }
}

fn candidates(html: &str) -> Result<Vec<Candidate>, EmbedError> {
    let mut out = Vec::new();
    for tag in scan::img_tags(html)? {
        if tag.has_attribute(MARKER_ATTRIBUTE) {
            continue;
        }
        let Some(locator) = tag.src() else {
            continue;
        };
        if starts_with_ignore_ascii_case(&locator, "data:")
            || starts_with_ignore_ascii_case(&locator, "cid:")
        {
            continue;
        }
        let directive = directive(&tag)?;
        out.push(Candidate {
            tag,
            locator,
            directive,
        });
    }
    Ok(out)
}

fn directive(tag: &ImgTag) -> Result<Option<ConversionDirective>, EmbedError> {
    let Some(format) = tag.value("data-convert") else {
        return Ok(None);
    };
    let format = TargetFormat::parse(format)?;
    let pixel = match tag.value("data-format") {
        Some(value) => PixelFormat::parse(value)?,
        None => PixelFormat::default(),
    };
    Ok(Some(ConversionDirective { format, pixel }))
}

/// `hex(sha256(bytes))` followed by the tag's ordinal.
fn content_id(bytes: &[u8], ordinal: usize) -> String {
    format!("{}{ordinal}", hex::encode(Sha256::digest(bytes)))
}

fn starts_with_ignore_ascii_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests;

use std::io::Cursor;
use std::path::Path;

use image::DynamicImage;
use url::Url;

use super::types::{ConversionDirective, PixelFormat};

/// MIME subtype of `bytes`: sniffed from the content, else guessed from the
/// locator's extension. `None` when neither names an image type.
pub(crate) fn detect_subtype(bytes: &[u8], locator: &str) -> Option<String> {
    if let Ok(format) = image::guess_format(bytes) {
        if let Some(subtype) = format.to_mime_type().strip_prefix("image/") {
            return Some(subtype.to_string());
        }
    }
    let guess = mime_guess::from_path(locator_path(locator)).first()?;
    (guess.type_().as_str() == "image").then(|| guess.subtype().as_str().to_string())
}

/// Extension of the locator's path, lower-cased, without the dot.
pub(crate) fn locator_extension(locator: &str) -> Option<String> {
    Path::new(&locator_path(locator))
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

fn locator_path(locator: &str) -> String {
    match Url::parse(locator) {
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        // a Windows drive letter parses as a one-letter scheme
        _ => locator.to_string(),
    }
}

/// Re-encodes `bytes` when the directive asks for a container other than
/// the detected one. `Ok(None)` means the bytes are already in that format.
pub(crate) fn convert(
    bytes: &[u8],
    directive: ConversionDirective,
) -> Result<Option<Vec<u8>>, image::ImageError> {
    let target = directive.format.image_format();
    if image::guess_format(bytes).ok() == Some(target) {
        return Ok(None);
    }

    let decoded = image::load_from_memory(bytes)?;
    let converted = match directive.pixel {
        PixelFormat::Rgb => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        PixelFormat::Rgba => DynamicImage::ImageRgba8(decoded.to_rgba8()),
    };

    let mut out = Cursor::new(Vec::new());
    converted.write_to(&mut out, target)?;
    tracing::debug!(
        format = directive.format.subtype(),
        from = bytes.len(),
        to = out.get_ref().len(),
        "image converted"
    );
    Ok(Some(out.into_inner()))
}

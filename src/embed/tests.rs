use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use super::{
    DefaultFetcher, Disposition, EmbedError, EmbedMode, EmbedOptions, Embedder, FetchError,
    Fetcher, InlineParts, MarkerCounts, count_markers, embed_images,
};

#[derive(Default)]
struct StubFetcher {
    images: HashMap<String, Vec<u8>>,
    calls: RefCell<Vec<String>>,
}

impl StubFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn with(mut self, locator: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.images.insert(locator.to_string(), bytes.into());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Fetcher for StubFetcher {
    fn get(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.borrow_mut().push(locator.to_string());
        self.images.get(locator).cloned().ok_or_else(|| FetchError::Status {
            url: locator.to_string(),
            status: 404,
        })
    }
}

fn png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_pixel(3, 2, Rgba([10, 120, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn expected_cid(bytes: &[u8], ordinal: usize) -> String {
    format!("{}{ordinal}", hex::encode(Sha256::digest(bytes)))
}

#[test]
fn base64_mode_rewrites_src_and_marks_tag() {
    let fetcher = StubFetcher::new().with("https://cdn.test/logo.png", b"logo".to_vec());
    let html = r#"<p>Hi</p><img src="https://cdn.test/logo.png" alt="logo"><p>Bye</p>"#;
    let mut parts = InlineParts::new();

    let out = embed_images(html, EmbedMode::Base64, &fetcher, &mut parts).unwrap();

    assert!(out.starts_with("<p>Hi</p><img "), "{out}");
    assert!(out.ends_with("><p>Bye</p>"), "{out}");
    assert!(out.contains(r#"src="data:image/png;base64,bG9nbw==""#), "{out}");
    assert!(out.contains(r#"alt="logo""#), "{out}");
    assert_eq!(
        count_markers(&out).unwrap(),
        MarkerCounts {
            base64: 1,
            cid: 0,
            marked: 1
        }
    );
    assert!(parts.is_empty());
}

#[test]
fn cid_mode_attaches_inline_parts() {
    let png = png_bytes();
    let fetcher = StubFetcher::new().with("https://cdn.test/a.png", png.clone());
    let html = r#"<img src="https://cdn.test/a.png">"#;
    let mut parts = InlineParts::new();

    let out = embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    let cid = expected_cid(&png, 0);
    assert!(out.contains(&format!(r#"src="cid:{cid}""#)), "{out}");
    assert!(out.contains(r#"data-mailprep="""#), "{out}");
    assert_eq!(parts.len(), 1);
    let part = parts.find(&cid).expect("part attached");
    assert_eq!(part.bytes, png);
    assert_eq!(part.content_type(), "image/png");
    assert_eq!(part.content_id_header(), format!("<{cid}>"));
    assert_eq!(part.disposition, Disposition::Inline);
}

#[test]
fn content_ids_ignore_unrelated_whitespace() {
    let fetcher = StubFetcher::new()
        .with("https://cdn.test/a.png", b"first".to_vec())
        .with("https://cdn.test/b.gif", b"second".to_vec());
    let compact = r#"<div><img src="https://cdn.test/a.png"><img src="https://cdn.test/b.gif"></div>"#;
    let spaced = "<div>\n    <img src=\"https://cdn.test/a.png\">\n\n    <img src=\"https://cdn.test/b.gif\">\n</div>\n";

    let mut first = InlineParts::new();
    embed_images(compact, EmbedMode::Cid, &fetcher, &mut first).unwrap();
    let mut second = InlineParts::new();
    embed_images(spaced, EmbedMode::Cid, &fetcher, &mut second).unwrap();

    let ids = |parts: &InlineParts| -> Vec<String> {
        parts.parts().iter().map(|p| p.content_id.clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(
        ids(&first),
        vec![expected_cid(b"first", 0), expected_cid(b"second", 1)]
    );
}

#[test]
fn identical_images_get_distinct_ids() {
    let fetcher = StubFetcher::new().with("https://cdn.test/dot.gif", b"dot".to_vec());
    let html = r#"<img src="https://cdn.test/dot.gif"><img src="https://cdn.test/dot.gif">"#;
    let mut parts = InlineParts::new();
    embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    assert_eq!(parts.len(), 2);
    assert_ne!(parts.parts()[0].content_id, parts.parts()[1].content_id);
    assert!(parts.parts()[1].content_id.ends_with('1'));
}

#[test]
fn loose_quotes_do_not_shift_ordinals() {
    let fetcher = StubFetcher::new()
        .with("https://cdn.test/a.png", b"a".to_vec())
        .with("https://cdn.test/b.png", b"b".to_vec());
    let html = r#"<img alt=don't src=https://cdn.test/a.png><p>it's</p><img src="https://cdn.test/b.png"/>"#;
    let mut parts = InlineParts::new();

    let out = embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    let ids: Vec<String> = parts.parts().iter().map(|p| p.content_id.clone()).collect();
    assert_eq!(ids, vec![expected_cid(b"a", 0), expected_cid(b"b", 1)]);
    assert_eq!(count_markers(&out).unwrap().cid, 2);
    assert!(out.contains("<p>it's</p>"), "{out}");
}

#[test]
fn unreachable_image_is_left_untouched() {
    let fetcher = StubFetcher::new().with("https://cdn.test/ok.png", b"ok".to_vec());
    let broken = r#"<img class="hero" src="https://down.test/missing.png">"#;
    let html = format!(r#"<img src="https://cdn.test/ok.png">{broken}"#);
    let mut parts = InlineParts::new();

    let out = embed_images(&html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    assert_eq!(parts.len(), 1);
    assert!(out.ends_with(broken), "{out}");
    assert_eq!(fetcher.calls().len(), 2);
}

#[test]
fn already_embedded_tags_are_skipped() {
    let fetcher = StubFetcher::new();
    let html = concat!(
        r#"<img data-mailprep src="https://cdn.test/a.png">"#,
        r#"<img src="data:image/png;base64,AAAA">"#,
        r#"<img src="cid:abc0">"#,
        r#"<img alt="no source"><img src="  ">"#,
        r#"<!-- <img src="https://cdn.test/commented.png"> -->"#,
    );
    let mut parts = InlineParts::new();

    let out = embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    assert_eq!(out, html);
    assert!(fetcher.calls().is_empty());
}

#[test]
fn bad_directives_fail_before_fetching() {
    let fetcher = StubFetcher::new().with("https://cdn.test/a.png", b"a".to_vec());
    let html = r#"<img src="https://cdn.test/a.png"><img data-convert="webp" src="https://cdn.test/b.png">"#;
    let err = embed_images(html, EmbedMode::Cid, &fetcher, &mut InlineParts::new()).unwrap_err();
    assert!(matches!(err, EmbedError::UnsupportedFormat { ref value } if value == "webp"));
    assert!(fetcher.calls().is_empty());

    let html = r#"<img data-convert="jpg" data-format="cmyk" src="https://cdn.test/a.png">"#;
    let err = embed_images(html, EmbedMode::Base64, &fetcher, &mut InlineParts::new()).unwrap_err();
    assert!(matches!(err, EmbedError::UnsupportedPixelFormat { .. }));
}

#[test]
fn conversion_changes_the_attached_format() {
    let png = png_bytes();
    let fetcher = StubFetcher::new().with("https://cdn.test/photo.png", png.clone());
    let html = r#"<img data-convert="JPG" data-format="rgb" src="https://cdn.test/photo.png">"#;
    let mut parts = InlineParts::new();

    embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();

    let part = &parts.parts()[0];
    assert_eq!(part.subtype, "jpeg");
    assert_eq!(image::guess_format(&part.bytes).ok(), Some(ImageFormat::Jpeg));
    assert_eq!(part.content_id, expected_cid(&part.bytes, 0));
}

#[test]
fn base64_keeps_the_locator_extension_after_conversion() {
    let fetcher = StubFetcher::new().with("https://cdn.test/photo.png", png_bytes());
    let html = r#"<img data-convert="gif" src="https://cdn.test/photo.png">"#;
    let out = embed_images(html, EmbedMode::Base64, &fetcher, &mut InlineParts::new()).unwrap();
    assert!(out.contains(r#"src="data:image/png;base64,R0lGOD"#), "{out}");
}

#[test]
fn matching_format_is_not_reencoded() {
    let png = png_bytes();
    let fetcher = StubFetcher::new().with("https://cdn.test/a.png", png.clone());
    let html = r#"<img data-convert="png" src="https://cdn.test/a.png">"#;
    let mut parts = InlineParts::new();
    embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();
    assert_eq!(parts.parts()[0].bytes, png);
}

#[test]
fn undecodable_image_with_directive_is_an_error() {
    let fetcher = StubFetcher::new().with("https://cdn.test/a.png", b"not a png".to_vec());
    let html = r#"<img data-convert="jpeg" src="https://cdn.test/a.png">"#;
    let err = embed_images(html, EmbedMode::Cid, &fetcher, &mut InlineParts::new()).unwrap_err();
    assert!(matches!(err, EmbedError::Conversion { .. }));
}

#[test]
fn unknown_image_type_is_left_untouched() {
    let fetcher = StubFetcher::new().with("https://cdn.test/blob", b"???".to_vec());
    let html = r#"<img src="https://cdn.test/blob">"#;
    let mut parts = InlineParts::new();
    let out = embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();
    assert_eq!(out, html);
    assert!(parts.is_empty());
}

#[test]
fn encoded_ampersands_reach_the_fetcher_decoded() {
    let fetcher = StubFetcher::new().with("https://cdn.test/i.png?w=1&h=2", b"x".to_vec());
    let html = r#"<img src="https://cdn.test/i.png?w=1&amp;h=2">"#;
    let mut parts = InlineParts::new();
    embed_images(html, EmbedMode::Cid, &fetcher, &mut parts).unwrap();
    assert_eq!(fetcher.calls(), vec!["https://cdn.test/i.png?w=1&h=2"]);
    assert_eq!(parts.len(), 1);
}

#[test]
fn local_files_are_embedded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("badge.png"), png_bytes()).unwrap();
    let embedder = Embedder::from_options(&EmbedOptions::new().with_base_dir(dir.path())).unwrap();

    let html = r#"<img src="badge.png"><img src="also-missing.png">"#;
    let out = embedder
        .embed(html, EmbedMode::Base64, &mut InlineParts::new())
        .unwrap();

    assert!(out.contains(r#"src="data:image/png;base64,iVBORw0KGgo"#), "{out}");
    assert!(out.ends_with(r#"<img src="also-missing.png">"#));
    let _: &DefaultFetcher = embedder.fetcher();
}

#[test]
fn markers_are_counted() {
    let fetcher = StubFetcher::new()
        .with("https://cdn.test/a.png", b"a".to_vec())
        .with("https://cdn.test/b.png", b"b".to_vec());
    let html = r#"<img src="https://cdn.test/a.png"><img src="https://cdn.test/b.png"><img src="https://cdn.test/c.png">"#;
    assert_eq!(count_markers(html).unwrap(), MarkerCounts::default());

    let out = embed_images(html, EmbedMode::Cid, &fetcher, &mut InlineParts::new()).unwrap();
    assert_eq!(
        count_markers(&out).unwrap(),
        MarkerCounts {
            base64: 0,
            cid: 2,
            marked: 2
        }
    );

    let out = embed_images(html, EmbedMode::Base64, &fetcher, &mut InlineParts::new()).unwrap();
    assert_eq!(count_markers(&out).unwrap().base64, 2);
}

#[test]
fn mode_parses_case_insensitively() {
    assert_eq!("CID".parse::<EmbedMode>().unwrap(), EmbedMode::Cid);
    assert_eq!(" base64 ".parse::<EmbedMode>().unwrap(), EmbedMode::Base64);
    assert!(matches!(
        "inline".parse::<EmbedMode>(),
        Err(EmbedError::UnknownMode { .. })
    ));
}

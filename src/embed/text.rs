use std::sync::LazyLock;

use regex::{Captures, Regex};

static DROPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>")
        .expect("block pattern compiles")
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</?p\b[^>]*>").expect("break pattern compiles"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("tag pattern compiles"));

static HEADER_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+ ").expect("header pattern compiles"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|(nbsp|lt|gt|quot|apos|amp));")
        .expect("entity pattern compiles")
});

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern compiles"));

/// Plain-text alternative of an HTML body. `<br>` and paragraph boundaries
/// become newlines, other markup is dropped (images and link targets with
/// it) and runs of blank lines collapse to one.
pub fn html_to_plain_text(html: &str) -> String {
    let text = DROPPED_BLOCKS.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = HEADER_MARK.replace_all(&text, "");

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let text = lines.join("\n");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Single pass, so "&amp;lt;" becomes "&lt;" and not "<". Numeric
/// references that are not a Unicode scalar value are kept as written.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let numeric = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                (None, None) => None,
            };
            if caps.get(3).is_none() {
                return numeric
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            match &caps[3] {
                "nbsp" => " ",
                "lt" => "<",
                "gt" => ">",
                "quot" => "\"",
                "apos" => "'",
                _ => "&",
            }
            .to_string()
        })
        .into_owned()
}

use std::collections::HashMap;

use lol_html::errors::RewritingError;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use super::MARKER_ATTRIBUTE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImgTag {
    /// Position among the document's `<img>` tags, from 0.
    pub ordinal: usize,
    attributes: Vec<(String, String)>,
}

impl ImgTag {
    /// Value of the first attribute named `name`, ASCII case-insensitive.
    /// Valueless attributes read as `""`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// `src` with `&amp;` decoded, trimmed.
    pub fn src(&self) -> Option<String> {
        self.value("src")
            .map(|raw| raw.trim().replace("&amp;", "&"))
            .filter(|src| !src.is_empty())
    }
}

/// `<img>` tags of `html` in document order, tokenized the way a browser
/// does. Tags inside comments are not elements and take no ordinal.
pub(crate) fn img_tags(html: &str) -> Result<Vec<ImgTag>, RewritingError> {
    let mut tags = Vec::new();
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                let attributes = el
                    .attributes()
                    .iter()
                    .map(|attr| (attr.name(), attr.value()))
                    .collect();
                tags.push(ImgTag {
                    ordinal: tags.len(),
                    attributes,
                });
                Ok(())
            })],
            strict: false,
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(tags)
}

/// New `src` for the `<img>` at `ordinal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SrcEdit {
    pub ordinal: usize,
    pub src: String,
}

/// Sets `src` and the marker attribute on the edited tags. Every other byte
/// of the document is passed through as is.
pub(crate) fn apply(html: &str, edits: &[SrcEdit]) -> Result<String, RewritingError> {
    if edits.is_empty() {
        return Ok(html.to_string());
    }
    let by_ordinal: HashMap<usize, &str> = edits
        .iter()
        .map(|edit| (edit.ordinal, edit.src.as_str()))
        .collect();

    let mut ordinal = 0;
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                if let Some(src) = by_ordinal.get(&ordinal) {
                    el.set_attribute("src", src)?;
                    el.set_attribute(MARKER_ATTRIBUTE, "")?;
                }
                ordinal += 1;
                Ok(())
            })],
            strict: false,
            ..RewriteStrSettings::default()
        },
    )
}

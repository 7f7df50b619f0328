use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        })
    }
}

/// Receives the binary parts produced while embedding. Implement it over
/// whatever multipart builder sends the message.
pub trait MimeAssembler {
    fn attach(&mut self, bytes: Vec<u8>, subtype: &str, content_id: &str, disposition: Disposition);
}

impl<M> MimeAssembler for &mut M
where
    M: MimeAssembler + ?Sized,
{
    fn attach(&mut self, bytes: Vec<u8>, subtype: &str, content_id: &str, disposition: Disposition) {
        (**self).attach(bytes, subtype, content_id, disposition);
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImagePart {
    #[cfg_attr(feature = "with-serde", serde(skip))]
    pub bytes: Vec<u8>,
    pub subtype: String,
    pub content_id: String,
    pub disposition: Disposition,
}

impl EmbeddedImagePart {
    pub fn content_type(&self) -> String {
        format!("image/{}", self.subtype)
    }

    /// `Content-ID` header value, angle brackets included.
    pub fn content_id_header(&self) -> String {
        format!("<{}>", self.content_id)
    }
}

/// A [`MimeAssembler`] that just keeps the parts, in attachment order.
#[derive(Debug, Clone, Default)]
pub struct InlineParts {
    parts: Vec<EmbeddedImagePart>,
}

impl InlineParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> &[EmbeddedImagePart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<EmbeddedImagePart> {
        self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn find(&self, content_id: &str) -> Option<&EmbeddedImagePart> {
        self.parts.iter().find(|part| part.content_id == content_id)
    }
}

impl MimeAssembler for InlineParts {
    fn attach(&mut self, bytes: Vec<u8>, subtype: &str, content_id: &str, disposition: Disposition) {
        self.parts.push(EmbeddedImagePart {
            bytes,
            subtype: subtype.to_string(),
            content_id: content_id.to_string(),
            disposition,
        });
    }
}

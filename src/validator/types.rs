use thiserror::Error;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    #[default]
    Strict,
    Relaxed,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEmail {
    pub original: String,
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
    pub mode: ValidationMode,
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl NormalizedEmail {
    /// `local@domain` with the lower-cased (Unicode) domain.
    pub fn address(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }

    /// `local@ascii-domain`, suitable for SMTP envelopes.
    pub fn ascii_address(&self) -> String {
        format!("{}@{}", self.local, self.ascii_domain)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("empty e-mail address")]
    Empty,
    #[error("invalid e-mail address '{address}': {}", reasons.join("; "))]
    Invalid {
        address: String,
        reasons: Vec<String>,
    },
}

impl EmailError {
    pub(crate) fn invalid(address: impl Into<String>, reasons: Vec<String>) -> Self {
        Self::Invalid {
            address: address.into(),
            reasons,
        }
    }
}

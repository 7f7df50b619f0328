use std::net::IpAddr;

use super::dkim::DkimRecord;
use super::dmarc::DmarcRecord;
use super::record::AuthRecord;
use super::spf::{SpfOptions, SpfRecord, SpfVerdict};
use super::{DkimError, DmarcError, SpfError};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpfStatus {
    Missing,
    MultipleRecords {
        records: Vec<String>,
    },
    Invalid {
        record: String,
        #[cfg_attr(feature = "with-serde", serde(serialize_with = "display::serialize"))]
        error: SpfError,
    },
    Evaluated {
        record: SpfRecord,
        verdict: SpfVerdict,
    },
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmarcStatus {
    Missing,
    MultipleRecords {
        records: Vec<String>,
    },
    Invalid {
        record: String,
        #[cfg_attr(feature = "with-serde", serde(serialize_with = "display::serialize"))]
        error: DmarcError,
    },
    Valid(DmarcRecord),
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DkimSelectorStatus {
    Missing {
        selector: String,
    },
    Invalid {
        selector: String,
        records: Vec<String>,
        #[cfg_attr(feature = "with-serde", serde(serialize_with = "display::serialize"))]
        error: DkimError,
    },
    Valid {
        selector: String,
        record: DkimRecord,
    },
}

impl SpfStatus {
    pub fn summary(&self) -> String {
        match self {
            Self::Missing => "missing".to_string(),
            Self::MultipleRecords { records } => format!("{} records", records.len()),
            Self::Invalid { error, .. } => format!("invalid: {error}"),
            Self::Evaluated { verdict, .. } => verdict.summary(),
        }
    }

    fn is_valid(&self) -> bool {
        matches!(self, Self::Evaluated { verdict, .. } if verdict.is_authorized())
    }
}

impl DmarcStatus {
    pub fn summary(&self) -> String {
        match self {
            Self::Missing => "missing".to_string(),
            Self::MultipleRecords { records } => format!("{} records", records.len()),
            Self::Invalid { error, .. } => format!("invalid: {error}"),
            Self::Valid(record) => match record.policy {
                Some(policy) => format!("valid (p={})", policy.as_str()),
                None => "valid (no policy)".to_string(),
            },
        }
    }
}

impl DkimSelectorStatus {
    pub fn selector(&self) -> &str {
        match self {
            Self::Missing { selector }
            | Self::Invalid { selector, .. }
            | Self::Valid { selector, .. } => selector,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Missing { .. } => "missing".to_string(),
            Self::Invalid { error, .. } => format!("invalid: {error}"),
            Self::Valid { record, .. } if record.is_testing() => "valid (testing)".to_string(),
            Self::Valid { .. } => "valid".to_string(),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    pub domain: String,
    pub spf: SpfStatus,
    pub dmarc: DmarcStatus,
    pub dkim: Vec<DkimSelectorStatus>,
}

impl AuthStatus {
    pub(crate) fn new(
        domain: String,
        spf: SpfStatus,
        dmarc: DmarcStatus,
        dkim: Vec<DkimSelectorStatus>,
    ) -> Self {
        Self {
            domain,
            spf,
            dmarc,
            dkim,
        }
    }

    /// SPF evaluated and not refusing, DMARC valid, every requested DKIM
    /// selector valid.
    pub fn is_valid(&self) -> bool {
        self.spf.is_valid()
            && matches!(self.dmarc, DmarcStatus::Valid(_))
            && self
                .dkim
                .iter()
                .all(|status| matches!(status, DkimSelectorStatus::Valid { .. }))
    }

    /// The records that parsed, SPF first.
    pub fn records(&self) -> Vec<AuthRecord> {
        let mut out = Vec::new();
        if let SpfStatus::Evaluated { record, .. } = &self.spf {
            out.push(AuthRecord::from(record.clone()));
        }
        if let DmarcStatus::Valid(record) = &self.dmarc {
            out.push(AuthRecord::from(record.clone()));
        }
        for status in &self.dkim {
            if let DkimSelectorStatus::Valid { record, .. } = status {
                out.push(AuthRecord::from(record.clone()));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthLookupOptions {
    dkim_selectors: Vec<String>,
    sender_ips: Vec<IpAddr>,
    spf: SpfOptions,
}

impl AuthLookupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dkim_selector(mut self, selector: impl Into<String>) -> Self {
        if let Some(normalized) = normalize_selector(selector.into()) {
            if !self.dkim_selectors.contains(&normalized) {
                self.dkim_selectors.push(normalized);
            }
        }
        self
    }

    pub fn with_dkim_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for selector in selectors {
            self = self.with_dkim_selector(selector);
        }
        self
    }

    /// Address of a host expected to send for the domain. Without any, SPF is
    /// evaluated for the domain's own A/AAAA records.
    pub fn with_sender_ip(mut self, ip: IpAddr) -> Self {
        if !self.sender_ips.contains(&ip) {
            self.sender_ips.push(ip);
        }
        self
    }

    pub fn with_spf_options(mut self, options: SpfOptions) -> Self {
        self.spf = options;
        self
    }

    pub fn dkim_selectors(&self) -> &[String] {
        &self.dkim_selectors
    }

    pub fn sender_ips(&self) -> &[IpAddr] {
        &self.sender_ips
    }

    pub fn spf_options(&self) -> SpfOptions {
        self.spf
    }
}

fn normalize_selector(input: String) -> Option<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

#[cfg(feature = "with-serde")]
mod display {
    pub(super) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: std::fmt::Display,
        S: serde::Serializer,
    {
        serializer.collect_str(value)
    }
}

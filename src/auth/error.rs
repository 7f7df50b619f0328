use thiserror::Error;

use super::resolver::RecordType;
use crate::validator::EmailError;

/// Errors raised when querying DNS for authentication records.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("{record_type} lookup failed for {name}: {source}")]
    Lookup {
        name: String,
        record_type: RecordType,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("TXT record {name} contains invalid UTF-8 data: {source}")]
    TxtDataUtf8 {
        name: String,
        #[source]
        source: std::str::Utf8Error,
    },
}

impl AuthError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn lookup(
        name: impl Into<String>,
        record_type: RecordType,
        source: trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::Lookup {
            name: name.into(),
            record_type,
            source,
        }
    }

    pub(crate) fn txt_data_utf8(name: impl Into<String>, source: std::str::Utf8Error) -> Self {
        Self::TxtDataUtf8 {
            name: name.into(),
            source,
        }
    }
}

/// Why a DKIM TXT record was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DkimError {
    #[error("record does not match 'v=DKIM1; [h=..;] [k=rsa;] [t=..;] p=<base64>'")]
    Malformed,
    #[error("record has no p= public key")]
    MissingPublicKey,
    #[error("public key is not valid base64: {source}")]
    InvalidPublicKey {
        #[source]
        source: base64::DecodeError,
    },
}

/// Why a DMARC TXT record was rejected. Grammar, `pct=` range and report
/// addresses are reported separately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DmarcError {
    #[error("record does not match the DMARC1 tag grammar")]
    Malformed,
    #[error("pct={value} is outside 0..=100")]
    PctOutOfRange { value: u16 },
    #[error("report address '{address}' is invalid: {source}")]
    InvalidReportAddress {
        address: String,
        #[source]
        source: EmailError,
    },
}

impl DmarcError {
    pub(crate) fn report_address(address: impl Into<String>, source: EmailError) -> Self {
        Self::InvalidReportAddress {
            address: address.into(),
            source,
        }
    }
}

/// Garbage handed to the network matcher. Never confused with "not in
/// network".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("'{input}' is not an IP address")]
    InvalidAddress { input: String },
    #[error("'{input}' is not an IP network")]
    InvalidNetwork { input: String },
}

impl NetworkError {
    pub(crate) fn address(input: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
        }
    }

    pub(crate) fn network(input: impl Into<String>) -> Self {
        Self::InvalidNetwork {
            input: input.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpfError {
    #[error("invalid SPF record: '{record}'")]
    InvalidRecord { record: String },
    #[error("mechanism '{mechanism}': {source}")]
    Network {
        mechanism: String,
        #[source]
        source: NetworkError,
    },
    #[error("include:{domain} exceeds the nesting limit of {limit}")]
    IncludeDepthExceeded { domain: String, limit: usize },
    #[error("'{input}' is neither an IP address nor a domain name")]
    InvalidTarget { input: String },
}

impl SpfError {
    pub(crate) fn invalid_record(record: impl Into<String>) -> Self {
        Self::InvalidRecord {
            record: record.into(),
        }
    }

    pub(crate) fn network(mechanism: impl Into<String>, source: NetworkError) -> Self {
        Self::Network {
            mechanism: mechanism.into(),
            source,
        }
    }
}

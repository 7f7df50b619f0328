use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    lookup::TxtLookup,
};

use super::AuthError;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Txt,
    A,
    Aaaa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Txt => "TXT",
            Self::A => "A",
            Self::Aaaa => "AAAA",
        })
    }
}

/// Blocking DNS lookups. A name without records of the requested type is an
/// empty list, not an error.
pub trait DnsClient {
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, AuthError>;
}

impl DnsClient for Resolver {
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, AuthError> {
        match record_type {
            RecordType::Txt => match Resolver::txt_lookup(self, name) {
                Ok(lookup) => collect_txt_records(name, &lookup),
                Err(err) => empty_or_error(name, record_type, err),
            },
            RecordType::A => match Resolver::ipv4_lookup(self, name) {
                Ok(lookup) => Ok(lookup.iter().map(|a| a.0.to_string()).collect()),
                Err(err) => empty_or_error(name, record_type, err),
            },
            RecordType::Aaaa => match Resolver::ipv6_lookup(self, name) {
                Ok(lookup) => Ok(lookup.iter().map(|aaaa| aaaa.0.to_string()).collect()),
                Err(err) => empty_or_error(name, record_type, err),
            },
        }
    }
}

pub(crate) fn system_resolver() -> Result<Resolver, AuthError> {
    Resolver::from_system_conf().map_err(AuthError::resolver_init)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, AuthError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(AuthError::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(AuthError::idna)
}

pub(crate) fn fqdn(label: &str, domain: &str) -> String {
    let trimmed = label.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        domain.to_string()
    } else {
        format!("{}.{}", trimmed.to_ascii_lowercase(), domain)
    }
}

/// A and AAAA addresses of `domain`. Lookup failures and unparsable answers
/// are dropped.
pub(crate) fn resolve_addresses<D>(dns: &D, domain: &str) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>)
where
    D: DnsClient + ?Sized,
{
    let ipv4 = lookup_parsed(dns, domain, RecordType::A);
    let ipv6 = lookup_parsed(dns, domain, RecordType::Aaaa);
    (ipv4, ipv6)
}

fn lookup_parsed<D, T>(dns: &D, domain: &str, record_type: RecordType) -> Vec<T>
where
    D: DnsClient + ?Sized,
    T: std::str::FromStr + PartialEq,
{
    match dns.query(domain, record_type) {
        Ok(answers) => {
            let mut out: Vec<T> = Vec::new();
            for parsed in answers.iter().filter_map(|a| a.trim().parse::<T>().ok()) {
                if !out.contains(&parsed) {
                    out.push(parsed);
                }
            }
            out
        }
        Err(err) => {
            tracing::debug!(domain, %record_type, error = %err, "address lookup failed");
            Vec::new()
        }
    }
}

fn collect_txt_records(name: &str, lookup: &TxtLookup) -> Result<Vec<String>, AuthError> {
    let mut records = Vec::new();
    for txt in lookup.iter() {
        let mut record = String::new();
        for piece in txt.txt_data().iter() {
            let segment = std::str::from_utf8(piece.as_ref())
                .map_err(|err| AuthError::txt_data_utf8(name, err))?;
            record.push_str(segment);
        }
        records.push(record);
    }
    Ok(records)
}

fn empty_or_error(
    name: &str,
    record_type: RecordType,
    err: ResolveError,
) -> Result<Vec<String>, AuthError> {
    if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
        Ok(Vec::new())
    } else {
        Err(AuthError::lookup(name, record_type, err))
    }
}

//! SPF, DKIM and DMARC record validation.
//!
//! The record parsers ([`parse_dkim_record`], [`parse_dmarc_record`],
//! [`SpfRecord::parse`]) are pure. [`spf_check`] and [`check_auth_records`]
//! need DNS, reached through the [`DnsClient`] trait.

mod classify;
mod dkim;
mod dmarc;
mod error;
mod network;
mod record;
mod resolver;
mod spf;
mod types;

pub use classify::{AddressClass, classify_address};
pub use dkim::{DkimHash, DkimKeyType, DkimRecord, parse_dkim_record, validate_dkim_record};
pub use dmarc::{
    Alignment, DmarcPolicy, DmarcRecord, FailureOption, ReportFormat, parse_dmarc_record,
    parse_dmarc_record_with, validate_dmarc_record,
};
pub use error::{AuthError, DkimError, DmarcError, NetworkError, SpfError};
pub use network::is_ip_in_network;
pub use record::AuthRecord;
pub use resolver::{DnsClient, RecordType};
pub use spf::{
    DEFAULT_MAX_INCLUDE_DEPTH, SpfOptions, SpfQuery, SpfRecord, SpfVerdict, spf_check,
    spf_check_with_options,
};
pub use types::{AuthLookupOptions, AuthStatus, DkimSelectorStatus, DmarcStatus, SpfStatus};

use resolver::{fqdn, normalize_domain, system_resolver};

pub fn check_auth_records(domain: &str) -> Result<AuthStatus, AuthError> {
    check_auth_records_with_options(domain, &AuthLookupOptions::default())
}

/// Looks up and validates the SPF, DMARC and DKIM selector records of
/// `domain` with the system resolver.
pub fn check_auth_records_with_options(
    domain: &str,
    options: &AuthLookupOptions,
) -> Result<AuthStatus, AuthError> {
    let resolver = system_resolver()?;
    check_with_resolver(&resolver, domain, options)
}

pub fn check_with_resolver<R>(
    resolver: &R,
    domain: &str,
    options: &AuthLookupOptions,
) -> Result<AuthStatus, AuthError>
where
    R: DnsClient + ?Sized,
{
    let ascii_domain = normalize_domain(domain)?;
    tracing::debug!(domain = %ascii_domain, "checking authentication records");

    let spf_records = resolver.query(&ascii_domain, RecordType::Txt)?;
    let spf_status = spf_status(resolver, &ascii_domain, &spf_records, options);

    let dmarc_name = fqdn("_dmarc", &ascii_domain);
    let dmarc_records = resolver.query(&dmarc_name, RecordType::Txt)?;
    let dmarc_status = dmarc_status(&dmarc_records);

    let mut dkim_statuses = Vec::new();
    for selector in options.dkim_selectors() {
        let selector_name = fqdn(&format!("{}._domainkey", selector), &ascii_domain);
        let selector_records = resolver.query(&selector_name, RecordType::Txt)?;
        dkim_statuses.push(selector_status(selector, &selector_records));
    }

    Ok(AuthStatus::new(
        ascii_domain,
        spf_status,
        dmarc_status,
        dkim_statuses,
    ))
}

fn spf_status<R>(
    resolver: &R,
    domain: &str,
    records: &[String],
    options: &AuthLookupOptions,
) -> SpfStatus
where
    R: DnsClient + ?Sized,
{
    let mut candidates = tagged_records(records, "v=spf1");
    if candidates.is_empty() {
        return SpfStatus::Missing;
    }
    if candidates.len() > 1 {
        candidates.sort();
        candidates.dedup();
        return SpfStatus::MultipleRecords {
            records: candidates,
        };
    }

    let raw = candidates.remove(0);
    let record = match SpfRecord::parse(&raw) {
        Ok(record) => record,
        Err(error) => return SpfStatus::Invalid { record: raw, error },
    };

    let query = options
        .sender_ips()
        .iter()
        .fold(SpfQuery::new().with_domain(domain), |query, ip| {
            query.with_ip(*ip)
        });

    match spf_check_with_options(resolver, &raw, &query, options.spf_options()) {
        Ok(verdict) => SpfStatus::Evaluated { record, verdict },
        Err(error) => SpfStatus::Invalid { record: raw, error },
    }
}

fn dmarc_status(records: &[String]) -> DmarcStatus {
    let mut candidates = tagged_records(records, "v=dmarc1");
    if candidates.is_empty() {
        return DmarcStatus::Missing;
    }
    if candidates.len() > 1 {
        candidates.sort();
        candidates.dedup();
        return DmarcStatus::MultipleRecords {
            records: candidates,
        };
    }

    let raw = candidates.remove(0);
    match parse_dmarc_record(&raw) {
        Ok(record) => DmarcStatus::Valid(record),
        Err(error) => DmarcStatus::Invalid { record: raw, error },
    }
}

fn selector_status(selector: &str, records: &[String]) -> DkimSelectorStatus {
    let sanitized: Vec<String> = records
        .iter()
        .map(|record| record.trim().to_string())
        .filter(|record| !record.is_empty())
        .collect();
    if sanitized.is_empty() {
        return DkimSelectorStatus::Missing {
            selector: selector.to_string(),
        };
    }

    // the first record that validates wins, else report the first error
    let mut first_error = None;
    for raw in &sanitized {
        match parse_dkim_record(raw) {
            Ok(record) => {
                return DkimSelectorStatus::Valid {
                    selector: selector.to_string(),
                    record,
                };
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    DkimSelectorStatus::Invalid {
        selector: selector.to_string(),
        records: sanitized,
        error: first_error.unwrap_or(DkimError::Malformed),
    }
}

/// Records whose unquoted text starts with `tag`, ASCII case-insensitive.
fn tagged_records(records: &[String], tag: &str) -> Vec<String> {
    records
        .iter()
        .map(|record| record.trim())
        .filter(|record| starts_with_ignore_ascii_case(record.trim_start_matches('"'), tag))
        .map(str::to_string)
        .collect()
}

fn starts_with_ignore_ascii_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

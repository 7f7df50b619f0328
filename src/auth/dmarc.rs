use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::DmarcError;
use crate::validator::{AddressValidator, SyntaxValidator};

static DMARC_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i-u)^v=DMARC1;\s*((p=none|p=quarantine|p=reject|rua=mailto:(?u:[^;])+|ruf=mailto:(?u:[^;])+|pct=[0-9]{1,3}|sp=none|sp=quarantine|sp=reject|aspf=r|aspf=s|adkim=r|adkim=s|fo=[01ds]|rf=afrf|rf=iodef|ri=[0-9]+);?\s*)*\s*$",
    )
    .expect("DMARC grammar compiles")
});

static DMARC_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i-u)(?:(?P<policy_tag>p|sp)=(?P<policy>none|quarantine|reject)|(?P<report_tag>rua|ruf)=(?P<report>mailto:(?u:[^;])+)|pct=(?P<pct>[0-9]{1,3})|(?P<align_tag>aspf|adkim)=(?P<align>[rs])|fo=(?P<fo>[01ds])|rf=(?P<rf>afrf|iodef)|ri=(?P<ri>[0-9]+))",
    )
    .expect("DMARC tag pattern compiles")
});

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
}

impl DmarcPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Quarantine => "quarantine",
            Self::Reject => "reject",
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Relaxed,
    Strict,
}

/// `fo=` failure reporting option.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOption {
    /// `0`: report when every mechanism failed.
    AllFail,
    /// `1`: report when any mechanism failed.
    AnyFail,
    Dkim,
    Spf,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Afrf,
    Iodef,
}

/// A DMARC policy record that passed validation. Repeated tags keep the
/// last value; every `pct=` occurrence must be in range.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmarcRecord {
    pub raw: String,
    pub policy: Option<DmarcPolicy>,
    pub subdomain_policy: Option<DmarcPolicy>,
    pub aggregate_reports: Vec<String>,
    pub forensic_reports: Vec<String>,
    pub percentage: Option<u8>,
    pub spf_alignment: Option<Alignment>,
    pub dkim_alignment: Option<Alignment>,
    pub failure_options: Option<FailureOption>,
    pub report_format: Option<ReportFormat>,
    pub report_interval: Option<u32>,
}

impl DmarcRecord {
    fn empty(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            policy: None,
            subdomain_policy: None,
            aggregate_reports: Vec::new(),
            forensic_reports: Vec::new(),
            percentage: None,
            spf_alignment: None,
            dkim_alignment: None,
            failure_options: None,
            report_format: None,
            report_interval: None,
        }
    }

    /// `p=quarantine` or `p=reject`.
    pub fn is_enforcing(&self) -> bool {
        matches!(
            self.policy,
            Some(DmarcPolicy::Quarantine | DmarcPolicy::Reject)
        )
    }
}

pub fn parse_dmarc_record(raw: &str) -> Result<DmarcRecord, DmarcError> {
    parse_dmarc_record_with(raw, &SyntaxValidator::default())
}

/// Grammar first, then every `mailto:` target through `validator`, then the
/// `pct=` range.
pub fn parse_dmarc_record_with<V>(raw: &str, validator: &V) -> Result<DmarcRecord, DmarcError>
where
    V: AddressValidator + ?Sized,
{
    let cleaned = raw.replace('"', "");
    let cleaned = cleaned.trim();
    if !DMARC_GRAMMAR.is_match(cleaned) {
        return Err(DmarcError::Malformed);
    }

    // grammar guarantees the "v=DMARC1;" prefix
    let body = &cleaned["v=DMARC1;".len()..];
    let mut record = DmarcRecord::empty(raw);
    let mut pct_out_of_range = None;

    for caps in DMARC_TAG.captures_iter(body) {
        apply_tag(&caps, &mut record, &mut pct_out_of_range, validator)?;
    }

    if let Some(value) = pct_out_of_range {
        return Err(DmarcError::PctOutOfRange { value });
    }

    Ok(record)
}

pub fn validate_dmarc_record(raw: &str) -> Result<(), DmarcError> {
    parse_dmarc_record(raw).map(|_| ())
}

fn apply_tag<V>(
    caps: &Captures<'_>,
    record: &mut DmarcRecord,
    pct_out_of_range: &mut Option<u16>,
    validator: &V,
) -> Result<(), DmarcError>
where
    V: AddressValidator + ?Sized,
{
    if let (Some(tag), Some(value)) = (caps.name("policy_tag"), caps.name("policy")) {
        let policy = policy_from(value.as_str());
        if tag.as_str().eq_ignore_ascii_case("sp") {
            record.subdomain_policy = Some(policy);
        } else {
            record.policy = Some(policy);
        }
    } else if let (Some(tag), Some(value)) = (caps.name("report_tag"), caps.name("report")) {
        let addresses = report_addresses(value.as_str(), validator)?;
        if tag.as_str().eq_ignore_ascii_case("rua") {
            record.aggregate_reports = addresses;
        } else {
            record.forensic_reports = addresses;
        }
    } else if let Some(value) = caps.name("pct") {
        let value = value
            .as_str()
            .parse::<u16>()
            .map_err(|_| DmarcError::Malformed)?;
        match u8::try_from(value) {
            Ok(pct) if pct <= 100 => record.percentage = Some(pct),
            // first offender is reported once report addresses are checked
            _ => {
                pct_out_of_range.get_or_insert(value);
            }
        }
    } else if let (Some(tag), Some(value)) = (caps.name("align_tag"), caps.name("align")) {
        let alignment = if value.as_str().eq_ignore_ascii_case("s") {
            Alignment::Strict
        } else {
            Alignment::Relaxed
        };
        if tag.as_str().eq_ignore_ascii_case("aspf") {
            record.spf_alignment = Some(alignment);
        } else {
            record.dkim_alignment = Some(alignment);
        }
    } else if let Some(value) = caps.name("fo") {
        record.failure_options = Some(match value.as_str().to_ascii_lowercase().as_str() {
            "0" => FailureOption::AllFail,
            "1" => FailureOption::AnyFail,
            "d" => FailureOption::Dkim,
            _ => FailureOption::Spf,
        });
    } else if let Some(value) = caps.name("rf") {
        record.report_format = Some(if value.as_str().eq_ignore_ascii_case("iodef") {
            ReportFormat::Iodef
        } else {
            ReportFormat::Afrf
        });
    } else if let Some(value) = caps.name("ri") {
        let interval = value
            .as_str()
            .parse::<u32>()
            .map_err(|_| DmarcError::Malformed)?;
        record.report_interval = Some(interval);
    }
    Ok(())
}

fn policy_from(value: &str) -> DmarcPolicy {
    match value.to_ascii_lowercase().as_str() {
        "reject" => DmarcPolicy::Reject,
        "quarantine" => DmarcPolicy::Quarantine,
        _ => DmarcPolicy::None,
    }
}

/// `mailto:a@x,mailto:b@y!10m` → validated, normalized addresses.
fn report_addresses<V>(value: &str, validator: &V) -> Result<Vec<String>, DmarcError>
where
    V: AddressValidator + ?Sized,
{
    let mut out = Vec::new();
    for uri in value.split(',') {
        let uri = uri.trim();
        if uri.is_empty() {
            continue;
        }
        let address = strip_mailto(uri);
        let address = address
            .split_once('!')
            .map(|(addr, _size)| addr)
            .unwrap_or(address)
            .trim();
        let normalized = validator
            .validate(address)
            .map_err(|err| DmarcError::report_address(address, err))?;
        out.push(normalized.address());
    }
    Ok(out)
}

fn strip_mailto(uri: &str) -> &str {
    match uri.get(..7) {
        Some(head) if head.eq_ignore_ascii_case("mailto:") => &uri[7..],
        _ => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{EmailError, NormalizedEmail};
    use proptest::prelude::*;

    #[test]
    fn full_record_parses() {
        let raw = "\"v=DMARC1; p=reject; sp=quarantine; rua=mailto:agg@example.com; \
                   ruf=mailto:forensic@example.com; pct=50; aspf=s; adkim=r; fo=1; rf=afrf; ri=86400\"";
        let record = parse_dmarc_record(raw).expect("valid record");
        assert_eq!(record.policy, Some(DmarcPolicy::Reject));
        assert_eq!(record.subdomain_policy, Some(DmarcPolicy::Quarantine));
        assert_eq!(record.aggregate_reports, vec!["agg@example.com"]);
        assert_eq!(record.forensic_reports, vec!["forensic@example.com"]);
        assert_eq!(record.percentage, Some(50));
        assert_eq!(record.spf_alignment, Some(Alignment::Strict));
        assert_eq!(record.dkim_alignment, Some(Alignment::Relaxed));
        assert_eq!(record.failure_options, Some(FailureOption::AnyFail));
        assert_eq!(record.report_format, Some(ReportFormat::Afrf));
        assert_eq!(record.report_interval, Some(86400));
        assert!(record.is_enforcing());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let record = parse_dmarc_record("V=dmarc1; P=Quarantine; PCT=100").expect("valid record");
        assert_eq!(record.policy, Some(DmarcPolicy::Quarantine));
        assert_eq!(record.percentage, Some(100));
    }

    #[test]
    fn version_only_is_valid() {
        let record = parse_dmarc_record("v=DMARC1;").expect("valid record");
        assert_eq!(record.policy, None);
        assert!(!record.is_enforcing());
    }

    #[test]
    fn unknown_tags_are_malformed() {
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=block").unwrap_err(),
            DmarcError::Malformed
        );
        assert_eq!(
            parse_dmarc_record("v=DMARC2; p=none").unwrap_err(),
            DmarcError::Malformed
        );
        assert_eq!(
            parse_dmarc_record("p=none; v=DMARC1").unwrap_err(),
            DmarcError::Malformed
        );
    }

    #[test]
    fn pct_out_of_range_is_distinct() {
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; pct=101").unwrap_err(),
            DmarcError::PctOutOfRange { value: 101 }
        );
        assert_eq!(
            validate_dmarc_record("v=DMARC1; p=none; pct=0"),
            Ok(())
        );
    }

    #[test]
    fn every_pct_occurrence_is_range_checked() {
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; pct=200; pct=50").unwrap_err(),
            DmarcError::PctOutOfRange { value: 200 }
        );
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; pct=50; pct=300; pct=400").unwrap_err(),
            DmarcError::PctOutOfRange { value: 300 }
        );
        let record = parse_dmarc_record("v=DMARC1; p=none; pct=20; pct=100").expect("valid record");
        assert_eq!(record.percentage, Some(100));
    }

    #[test]
    fn non_ascii_digits_are_malformed() {
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; pct=\u{665}\u{660}\u{660}").unwrap_err(),
            DmarcError::Malformed
        );
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; ri=\u{661}\u{662}").unwrap_err(),
            DmarcError::Malformed
        );
    }

    #[test]
    fn tag_names_fold_ascii_case_only() {
        // U+017F and U+212A fold to `s` and `k` under Unicode rules
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; \u{17f}p=reject").unwrap_err(),
            DmarcError::Malformed
        );
        assert_eq!(
            parse_dmarc_record("v=DMARC1; p=none; ad\u{212a}im=s").unwrap_err(),
            DmarcError::Malformed
        );
        let record = parse_dmarc_record("v=DMARC1; p=none; SP=Reject").expect("valid record");
        assert_eq!(record.policy, Some(DmarcPolicy::None));
        assert_eq!(record.subdomain_policy, Some(DmarcPolicy::Reject));
    }

    #[test]
    fn report_addresses_are_checked_before_pct() {
        let err =
            parse_dmarc_record("v=DMARC1; pct=200; rua=mailto:not-an-address").unwrap_err();
        assert!(matches!(err, DmarcError::InvalidReportAddress { .. }));
    }

    #[test]
    fn invalid_report_address_is_distinct() {
        let err = parse_dmarc_record("v=DMARC1; p=none; rua=mailto:not-an-address").unwrap_err();
        match err {
            DmarcError::InvalidReportAddress { address, .. } => {
                assert_eq!(address, "not-an-address")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn report_lists_and_size_limits() {
        let record = parse_dmarc_record(
            "v=DMARC1; p=none; rua=mailto:a@example.com,mailto:b@Example.NET!10m",
        )
        .expect("valid record");
        assert_eq!(
            record.aggregate_reports,
            vec!["a@example.com", "b@example.net"]
        );
    }

    struct RejectAll;

    impl AddressValidator for RejectAll {
        fn validate(&self, email: &str) -> Result<NormalizedEmail, EmailError> {
            Err(EmailError::Invalid {
                address: email.to_string(),
                reasons: vec!["blocked".to_string()],
            })
        }
    }

    #[test]
    fn custom_validator_is_consulted() {
        let err = parse_dmarc_record_with("v=DMARC1; rua=mailto:a@example.com", &RejectAll)
            .unwrap_err();
        assert!(matches!(err, DmarcError::InvalidReportAddress { .. }));
        assert!(parse_dmarc_record_with("v=DMARC1; p=none", &RejectAll).is_ok());
    }

    proptest! {
        #[test]
        fn pct_range_is_enforced(pct in 0u16..1000) {
            let raw = format!("v=DMARC1; p=none; pct={pct}");
            let result = parse_dmarc_record(&raw);
            if pct <= 100 {
                prop_assert_eq!(result.map(|r| r.percentage), Ok(Some(pct as u8)));
            } else {
                prop_assert_eq!(result, Err(DmarcError::PctOutOfRange { value: pct }));
            }
        }
    }
}

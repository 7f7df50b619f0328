use std::io::{self, BufRead};

use anyhow::{Context, Result};
use mailprep_lib::auth::{DkimHash, DmarcPolicy};
use mailprep_lib::{
    AddressClass, DmarcRecord, NormalizedEmail, SpfOptions, SpfQuery, SpfVerdict, ValidationMode,
    classify_address, normalize_email, parse_dkim_record, parse_dmarc_record,
    spf_check_with_options,
};

use crate::output::{Report, status_tag};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[cfg_attr(feature = "with-serde", serde(transparent))]
pub struct EmailReport {
    pub rows: Vec<NormalizedEmail>,
}

impl EmailReport {
    pub fn collect(emails: &[String], stdin: bool, mode: ValidationMode) -> Result<Self> {
        let mut rows = Vec::new();
        if stdin {
            for line in io::stdin().lock().lines() {
                let email = line.context("read stdin")?;
                if email.trim().is_empty() {
                    continue;
                }
                rows.push(normalize_email(&email, mode)?);
            }
        }
        for email in emails {
            rows.push(normalize_email(email, mode)?);
        }
        Ok(Self { rows })
    }
}

impl Report for EmailReport {
    fn ok(&self) -> bool {
        self.rows.iter().all(|row| row.valid)
    }

    fn human_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                if row.valid {
                    format!("{} {}", status_tag(true), row.original)
                } else {
                    format!(
                        "{} {} :: {}",
                        status_tag(false),
                        row.original,
                        row.reasons.join("; ")
                    )
                }
            })
            .collect()
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct ClassifyReport {
    pub input: String,
    pub class: AddressClass,
}

impl ClassifyReport {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            class: classify_address(input),
        }
    }
}

impl Report for ClassifyReport {
    fn ok(&self) -> bool {
        self.class.is_valid()
    }

    fn human_lines(&self) -> Vec<String> {
        let detail = match &self.class {
            AddressClass::Ipv4(addr) => addr.to_string(),
            AddressClass::Ipv6(addr) => addr.to_string(),
            AddressClass::Domain(domain) => domain.clone(),
            AddressClass::Invalid(_) => String::new(),
        };
        vec![format!(
            "{} {} => {} {detail}",
            status_tag(self.ok()),
            self.input,
            self.class.keyword()
        )
        .trim_end()
        .to_string()]
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct SpfReport {
    pub record: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub verdict: Option<SpfVerdict>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl SpfReport {
    pub fn evaluate(record: &str, query: &SpfQuery, options: SpfOptions) -> Result<Self> {
        let resolver = trust_dns_resolver::Resolver::from_system_conf()
            .context("system resolver configuration")?;
        let (verdict, error) = match spf_check_with_options(&resolver, record, query, options) {
            Ok(verdict) => (Some(verdict), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Ok(Self {
            record: record.to_string(),
            verdict,
            error,
        })
    }
}

impl Report for SpfReport {
    fn ok(&self) -> bool {
        self.verdict.as_ref().is_some_and(SpfVerdict::is_authorized)
    }

    fn human_lines(&self) -> Vec<String> {
        let summary = match (&self.verdict, &self.error) {
            (Some(verdict), _) => verdict.summary(),
            (None, Some(error)) => format!("error: {error}"),
            (None, None) => "unknown".to_string(),
        };
        vec![format!("{} spf: {summary}", status_tag(self.ok()))]
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct DkimReport {
    pub record: String,
    pub valid: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub hash: Option<&'static str>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub key_bytes: Option<usize>,
    pub testing: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl DkimReport {
    pub fn new(record: &str) -> Self {
        match parse_dkim_record(record) {
            Ok(parsed) => Self {
                record: record.to_string(),
                valid: true,
                hash: parsed.hash_algorithm.map(|hash| match hash {
                    DkimHash::Sha1 => "sha1",
                    DkimHash::Sha256 => "sha256",
                }),
                key_bytes: Some(parsed.public_key.len()),
                testing: parsed.is_testing(),
                error: None,
            },
            Err(err) => Self {
                record: record.to_string(),
                valid: false,
                hash: None,
                key_bytes: None,
                testing: false,
                error: Some(err.to_string()),
            },
        }
    }
}

impl Report for DkimReport {
    fn ok(&self) -> bool {
        self.valid
    }

    fn human_lines(&self) -> Vec<String> {
        if let Some(error) = &self.error {
            return vec![format!("{} dkim: {error}", status_tag(false))];
        }
        let mut parts = vec![format!("key={} bytes", self.key_bytes.unwrap_or_default())];
        if let Some(hash) = self.hash {
            parts.push(format!("h={hash}"));
        }
        if self.testing {
            parts.push("testing".to_string());
        }
        vec![format!("{} dkim: {}", status_tag(true), parts.join(", "))]
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct DmarcReport {
    pub record: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub parsed: Option<DmarcRecord>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl DmarcReport {
    pub fn new(record: &str) -> Self {
        let (parsed, error) = match parse_dmarc_record(record) {
            Ok(parsed) => (Some(parsed), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            record: record.to_string(),
            parsed,
            error,
        }
    }
}

impl Report for DmarcReport {
    fn ok(&self) -> bool {
        self.parsed.is_some()
    }

    fn human_lines(&self) -> Vec<String> {
        let Some(parsed) = &self.parsed else {
            let error = self.error.as_deref().unwrap_or("unknown");
            return vec![format!("{} dmarc: {error}", status_tag(false))];
        };

        let mut lines = vec![format!(
            "{} dmarc: p={}",
            status_tag(true),
            policy_str(parsed.policy)
        )];
        if parsed.subdomain_policy.is_some() {
            lines.push(format!("          sp={}", policy_str(parsed.subdomain_policy)));
        }
        if let Some(pct) = parsed.percentage {
            lines.push(format!("          pct={pct}"));
        }
        if !parsed.aggregate_reports.is_empty() {
            lines.push(format!("          rua={}", parsed.aggregate_reports.join(", ")));
        }
        if !parsed.forensic_reports.is_empty() {
            lines.push(format!("          ruf={}", parsed.forensic_reports.join(", ")));
        }
        lines
    }
}

fn policy_str(policy: Option<DmarcPolicy>) -> &'static str {
    policy.map(|p| p.as_str()).unwrap_or("-")
}

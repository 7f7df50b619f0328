use std::net::IpAddr;

use anyhow::{Context, Result};
use mailprep_lib::{
    AuthLookupOptions, AuthStatus, DkimSelectorStatus, DmarcStatus, SpfOptions, SpfStatus,
    check_auth_records_with_options,
};

use crate::output::{Report, status_tag};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct AuthReport {
    pub valid: bool,
    #[cfg_attr(feature = "with-serde", serde(flatten))]
    pub status: AuthStatus,
}

pub fn resolve(
    domain: &str,
    selectors: &[String],
    sender_ips: &[IpAddr],
    max_depth: usize,
) -> Result<AuthReport> {
    let options = sender_ips.iter().fold(
        AuthLookupOptions::new()
            .with_dkim_selectors(selectors.iter().cloned())
            .with_spf_options(SpfOptions::new().with_max_include_depth(max_depth)),
        |options, ip| options.with_sender_ip(*ip),
    );

    let status = check_auth_records_with_options(domain, &options)
        .with_context(|| format!("authentication records of {domain}"))?;
    Ok(AuthReport {
        valid: status.is_valid(),
        status,
    })
}

impl Report for AuthReport {
    fn ok(&self) -> bool {
        self.valid
    }

    fn human_lines(&self) -> Vec<String> {
        let status = &self.status;
        let mut lines = vec![format!("{} domain={}", status_tag(self.valid), status.domain)];
        lines.push(format!("          spf={}", spf_line(&status.spf)));
        lines.push(format!("          dmarc={}", dmarc_line(&status.dmarc)));

        match status.dkim.as_slice() {
            [] => lines.push("          dkim_selectors=none".to_string()),
            [selector] => lines.push(format!(
                "          dkim_selector {} {}",
                selector.selector(),
                selector_line(selector)
            )),
            selectors => {
                lines.push("          dkim_selectors:".to_string());
                for selector in selectors {
                    lines.push(format!(
                        "            {} {}",
                        selector.selector(),
                        selector_line(selector)
                    ));
                }
            }
        }
        lines
    }
}

fn spf_line(status: &SpfStatus) -> String {
    match status {
        SpfStatus::MultipleRecords { records } => {
            format!("multiple_records ({})", records.join(" | "))
        }
        SpfStatus::Invalid { record, .. } => format!("{} (record={record})", status.summary()),
        SpfStatus::Evaluated { record, .. } => format!("{} (record={})", status.summary(), record.raw),
        SpfStatus::Missing => status.summary(),
    }
}

fn dmarc_line(status: &DmarcStatus) -> String {
    match status {
        DmarcStatus::MultipleRecords { records } => {
            format!("multiple_records ({})", records.join(" | "))
        }
        DmarcStatus::Invalid { record, .. } => format!("{} (record={record})", status.summary()),
        DmarcStatus::Valid(record) => format!("{} (record={})", status.summary(), record.raw),
        DmarcStatus::Missing => status.summary(),
    }
}

fn selector_line(status: &DkimSelectorStatus) -> String {
    match status {
        DkimSelectorStatus::Invalid { records, .. } if !records.is_empty() => {
            format!("{} (records={})", status.summary(), records.join(" | "))
        }
        _ => status.summary(),
    }
}

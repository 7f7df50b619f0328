use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::classify::{AddressClass, classify_address};
use super::network::parse_network;
use super::resolver::{DnsClient, RecordType, resolve_addresses};
use super::SpfError;

/// Nested `include:` levels followed before giving up.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

/// A parsed `v=spf1` record: the raw text and the mechanism tokens after the
/// version tag, in order.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfRecord {
    pub raw: String,
    pub mechanisms: Vec<String>,
}

impl SpfRecord {
    /// Quotes and surrounding whitespace are stripped; the first token must
    /// be exactly `v=spf1`.
    pub fn parse(raw: &str) -> Result<Self, SpfError> {
        let cleaned = raw.trim().trim_matches('"').trim();
        let mut tokens = cleaned.split_whitespace();
        match tokens.next() {
            Some("v=spf1") => Ok(Self {
                raw: raw.to_string(),
                mechanisms: tokens.map(str::to_string).collect(),
            }),
            _ => Err(SpfError::invalid_record(raw)),
        }
    }

    /// The record ends evaluation with `-all`.
    pub fn disallows_all(&self) -> bool {
        self.mechanisms.iter().any(|token| token == "-all")
    }

    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.mechanisms
            .iter()
            .filter_map(|token| token.strip_prefix("include:"))
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpfVerdict {
    /// A mechanism matched; `mechanism` is the top-level token.
    Authorized { mechanism: String },
    /// Nothing matched and the record ends with `-all`.
    NotAuthorized,
    /// Nothing matched but the record does not say `-all`.
    NotDisallowed,
}

impl SpfVerdict {
    /// `NotDisallowed` counts as authorized: silence is not a refusal.
    pub fn is_authorized(&self) -> bool {
        !matches!(self, Self::NotAuthorized)
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Authorized { mechanism } => format!("authorized by {mechanism}"),
            Self::NotAuthorized => "not authorized (-all)".to_string(),
            Self::NotDisallowed => "not disallowed (no -all)".to_string(),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpfOptions {
    max_include_depth: usize,
    implicit_include_pass: bool,
}

impl Default for SpfOptions {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            implicit_include_pass: true,
        }
    }
}

impl SpfOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// When `false`, an included record only authorizes through an explicit
    /// mechanism match; a nested record without `-all` contributes nothing.
    pub fn with_implicit_include_pass(mut self, value: bool) -> Self {
        self.implicit_include_pass = value;
        self
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }

    pub fn implicit_include_pass(&self) -> bool {
        self.implicit_include_pass
    }
}

/// What is being checked against a record: sender addresses and/or a domain.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpfQuery {
    ipv4: Vec<Ipv4Addr>,
    ipv6: Vec<Ipv6Addr>,
    domain: Option<String>,
}

impl SpfQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a bare host string and fills the matching slot.
    pub fn for_address(input: &str) -> Result<Self, SpfError> {
        Self::new().with_address(input)
    }

    pub fn with_address(self, input: &str) -> Result<Self, SpfError> {
        match classify_address(input) {
            AddressClass::Ipv4(addr) => Ok(self.with_ipv4(addr)),
            AddressClass::Ipv6(addr) => Ok(self.with_ipv6(addr)),
            AddressClass::Domain(domain) => Ok(self.with_domain(domain)),
            AddressClass::Invalid(input) => Err(SpfError::InvalidTarget { input }),
        }
    }

    pub fn with_ipv4(mut self, addr: Ipv4Addr) -> Self {
        if !self.ipv4.contains(&addr) {
            self.ipv4.push(addr);
        }
        self
    }

    pub fn with_ipv6(mut self, addr: Ipv6Addr) -> Self {
        if !self.ipv6.contains(&addr) {
            self.ipv6.push(addr);
        }
        self
    }

    pub fn with_ip(self, addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => self.with_ipv4(v4),
            IpAddr::V6(v6) => self.with_ipv6(v6),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn ipv4(&self) -> &[Ipv4Addr] {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &[Ipv6Addr] {
        &self.ipv6
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    fn has_addresses(&self) -> bool {
        !self.ipv4.is_empty() || !self.ipv6.is_empty()
    }
}

#[derive(Debug, Default)]
struct Candidates {
    ipv4: Vec<IpAddr>,
    ipv6: Vec<IpAddr>,
}

/// State of one top-level check, threaded through every nested include.
struct SpfEvaluationContext<'a, D: ?Sized> {
    dns: &'a D,
    query: &'a SpfQuery,
    options: SpfOptions,
    candidates: Option<Candidates>,
    depth: usize,
}

impl<'a, D> SpfEvaluationContext<'a, D>
where
    D: DnsClient + ?Sized,
{
    fn new(dns: &'a D, query: &'a SpfQuery, options: SpfOptions) -> Self {
        Self {
            dns,
            query,
            options,
            candidates: None,
            depth: 0,
        }
    }

    /// Supplied addresses, or the domain's A/AAAA records when none were
    /// supplied. Resolved once, on first use.
    fn candidates(&mut self) -> &Candidates {
        let dns = self.dns;
        let query = self.query;
        self.candidates.get_or_insert_with(|| {
            if query.has_addresses() {
                return Candidates {
                    ipv4: query.ipv4.iter().copied().map(IpAddr::V4).collect(),
                    ipv6: query.ipv6.iter().copied().map(IpAddr::V6).collect(),
                };
            }
            match query.domain() {
                Some(domain) => {
                    let (ipv4, ipv6) = resolve_addresses(dns, domain);
                    tracing::debug!(
                        domain,
                        ipv4 = ipv4.len(),
                        ipv6 = ipv6.len(),
                        "resolved SPF candidates"
                    );
                    Candidates {
                        ipv4: ipv4.into_iter().map(IpAddr::V4).collect(),
                        ipv6: ipv6.into_iter().map(IpAddr::V6).collect(),
                    }
                }
                None => Candidates::default(),
            }
        })
    }

    fn is_domain_under_test(&self, domain: &str) -> bool {
        self.query
            .domain()
            .map(|own| own.trim_end_matches('.').eq_ignore_ascii_case(domain.trim_end_matches('.')))
            .unwrap_or(false)
    }
}

pub fn spf_check<D>(dns: &D, record: &str, query: &SpfQuery) -> Result<SpfVerdict, SpfError>
where
    D: DnsClient + ?Sized,
{
    spf_check_with_options(dns, record, query, SpfOptions::default())
}

/// Evaluates `record` for `query`. The first matching mechanism, left to
/// right, decides. Failing includes contribute nothing; an include chain
/// deeper than `options.max_include_depth()` is an error.
pub fn spf_check_with_options<D>(
    dns: &D,
    record: &str,
    query: &SpfQuery,
    options: SpfOptions,
) -> Result<SpfVerdict, SpfError>
where
    D: DnsClient + ?Sized,
{
    let record = SpfRecord::parse(record)?;
    let mut ctx = SpfEvaluationContext::new(dns, query, options);
    evaluate(&mut ctx, &record)
}

fn evaluate<D>(
    ctx: &mut SpfEvaluationContext<'_, D>,
    record: &SpfRecord,
) -> Result<SpfVerdict, SpfError>
where
    D: DnsClient + ?Sized,
{
    for token in &record.mechanisms {
        let matched = if let Some(domain) = token.strip_prefix("include:") {
            include_matches(ctx, domain)?
        } else if let Some(network) = token.strip_prefix("ip4:") {
            let candidates = ctx.candidates().ipv4.clone();
            any_in_network(token, network, &candidates)?
        } else if let Some(network) = token.strip_prefix("ip6:") {
            let candidates = ctx.candidates().ipv6.clone();
            any_in_network(token, network, &candidates)?
        } else {
            false
        };

        if matched {
            return Ok(SpfVerdict::Authorized {
                mechanism: token.clone(),
            });
        }
    }

    if record.disallows_all() {
        Ok(SpfVerdict::NotAuthorized)
    } else {
        Ok(SpfVerdict::NotDisallowed)
    }
}

fn include_matches<D>(ctx: &mut SpfEvaluationContext<'_, D>, domain: &str) -> Result<bool, SpfError>
where
    D: DnsClient + ?Sized,
{
    if ctx.is_domain_under_test(domain) {
        return Ok(true);
    }

    if ctx.depth >= ctx.options.max_include_depth() {
        return Err(SpfError::IncludeDepthExceeded {
            domain: domain.to_string(),
            limit: ctx.options.max_include_depth(),
        });
    }

    let records = match ctx.dns.query(domain, RecordType::Txt) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(domain, error = %err, "SPF include lookup failed, skipping");
            return Ok(false);
        }
    };

    ctx.depth += 1;
    let outcome = evaluate_included(ctx, domain, &records);
    ctx.depth -= 1;
    outcome
}

fn evaluate_included<D>(
    ctx: &mut SpfEvaluationContext<'_, D>,
    domain: &str,
    records: &[String],
) -> Result<bool, SpfError>
where
    D: DnsClient + ?Sized,
{
    for raw in records {
        let Ok(nested) = SpfRecord::parse(raw) else {
            continue;
        };
        tracing::debug!(domain, depth = ctx.depth, "evaluating included SPF record");
        match evaluate(ctx, &nested) {
            Ok(SpfVerdict::Authorized { .. }) => return Ok(true),
            Ok(SpfVerdict::NotDisallowed) if ctx.options.implicit_include_pass() => {
                return Ok(true);
            }
            Ok(_) => {}
            Err(err @ SpfError::IncludeDepthExceeded { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(domain, error = %err, "included SPF record unusable, skipping");
            }
        }
    }
    Ok(false)
}

fn any_in_network(token: &str, network: &str, candidates: &[IpAddr]) -> Result<bool, SpfError> {
    if candidates.is_empty() {
        return Ok(false);
    }
    let net = parse_network(network).map_err(|err| SpfError::network(token, err))?;
    Ok(candidates.iter().any(|addr| net.contains(addr)))
}

//! E-mail address syntax validation (RFC 5321/5322 subset).
//!
//! [`SyntaxValidator`] is the [`AddressValidator`] used wherever the crate
//! needs to vet an address, e.g. DMARC `mailto:` report targets and
//! [`Contact`](crate::Contact) addresses.

mod domain;
mod local;
mod types;

pub use types::{EmailError, NormalizedEmail, ValidationMode, ValidationReport};

pub(crate) use domain::is_valid_hostname;

use domain::{check_domain, normalize_domain};
use local::{is_local_relaxed, is_local_strict};
use unicode_normalization::UnicodeNormalization;

/// Something able to vet an e-mail address and hand back its normalized form.
pub trait AddressValidator {
    fn validate(&self, email: &str) -> Result<NormalizedEmail, EmailError>;
}

/// Syntax-only validator: no DNS, no SMTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxValidator {
    mode: ValidationMode,
}

impl SyntaxValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }
}

impl AddressValidator for SyntaxValidator {
    fn validate(&self, email: &str) -> Result<NormalizedEmail, EmailError> {
        let normalized = normalize_email(email, self.mode)?;
        if normalized.valid {
            Ok(normalized)
        } else {
            Err(EmailError::invalid(email.trim(), normalized.reasons))
        }
    }
}

pub fn validate_email(email: &str, mode: ValidationMode) -> Result<ValidationReport, EmailError> {
    let input = email.trim();
    if input.is_empty() {
        return Err(EmailError::Empty);
    }

    let mut reasons = Vec::new();

    // RFC 5321: 254 max, '@' included
    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let Some((local, domain)) = split_address(input) else {
        reasons.push("must contain exactly one '@'".to_string());
        return Ok(ValidationReport { ok: false, reasons });
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }

    check_domain(domain, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ok = reasons.is_empty();
    Ok(ValidationReport { ok, reasons })
}

/// Validates and returns the normalized output (NFC input, lower-cased
/// domain, ASCII domain).
pub fn normalize_email(email: &str, mode: ValidationMode) -> Result<NormalizedEmail, EmailError> {
    let composed: String = email.trim().nfc().collect();
    let report = validate_email(&composed, mode)?;

    // split even when invalid so the parts still get normalized
    let (local, domain) = composed.rsplit_once('@').unwrap_or((composed.as_str(), ""));
    let (domain_lower, ascii_domain) = normalize_domain(domain);

    Ok(NormalizedEmail {
        original: email.to_string(),
        local: local.to_string(),
        domain: domain_lower,
        ascii_domain,
        mode,
        valid: report.ok,
        reasons: report.reasons,
    })
}

/// Splits on the single unquoted '@'. A quoted local part may itself contain
/// '@'.
fn split_address(input: &str) -> Option<(&str, &str)> {
    let (local, domain) = input.rsplit_once('@')?;
    if domain.contains('@') {
        return None;
    }
    let quoted = local.len() >= 2 && local.starts_with('"') && local.ends_with('"');
    if !quoted && local.contains('@') {
        return None;
    }
    Some((local, domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_basic() {
        let r = validate_email("alice@example.com", ValidationMode::Strict).unwrap();
        assert!(r.ok, "{:?}", r.reasons);
    }

    #[test]
    fn rejects_double_at() {
        let r = validate_email("a@@b.com", ValidationMode::Strict).unwrap();
        assert!(!r.ok);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = validate_email("   ", ValidationMode::Strict).unwrap_err();
        assert_eq!(err, EmailError::Empty);
    }

    #[test]
    fn relaxed_accepts_quoted_at() {
        let r = validate_email("\"a@b\"@example.com", ValidationMode::Relaxed).unwrap();
        assert!(r.ok, "{:?}", r.reasons);
        let strict = validate_email("\"a@b\"@example.com", ValidationMode::Strict).unwrap();
        assert!(!strict.ok);
    }

    #[test]
    fn normalized_has_ascii_domain() {
        let n = normalize_email("alice@Exämple.com", ValidationMode::Strict).unwrap();
        assert_eq!(n.domain, "exämple.com");
        assert_eq!(n.ascii_domain, "xn--exmple-cua.com");
        assert_eq!(n.address(), "alice@exämple.com");
        assert!(n.valid);
    }

    #[test]
    fn syntax_validator_rejects_with_reasons() {
        let validator = SyntaxValidator::default();
        let err = validator.validate("not-an-address").unwrap_err();
        match err {
            EmailError::Invalid { address, reasons } => {
                assert_eq!(address, "not-an-address");
                assert!(reasons.iter().any(|r| r.contains("'@'")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn syntax_validator_returns_normalized() {
        let validator = SyntaxValidator::new(ValidationMode::Strict);
        let n = validator.validate(" Reports@Example.COM ").unwrap();
        assert_eq!(n.address(), "Reports@example.com");
    }
}

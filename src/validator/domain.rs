/// IDNA conversion + label checks. Every invalidating reason is pushed into
/// `reasons`.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) {
    let ascii = match idna::domain_to_ascii(domain) {
        Ok(d) => d,
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return;
        }
    };

    if ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return;
    }

    if !ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    for label in ascii.split('.') {
        check_label(label, reasons);
    }
}

fn check_label(label: &str, reasons: &mut Vec<String>) {
    if label.is_empty() {
        reasons.push("empty domain label".to_string());
        return;
    }
    if label.len() > 63 {
        reasons.push(format!(
            "domain label '{}' length {} > 63",
            label,
            label.len()
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        reasons.push(format!(
            "domain label '{}' cannot start/end with '-'",
            label
        ));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        reasons.push(format!("domain label '{}' has invalid chars", label));
    }
}

/// Host name check used outside of e-mail addresses: same label rules, a
/// trailing root dot is tolerated and the top-level label may not be numeric.
pub(crate) fn is_valid_hostname(input: &str) -> bool {
    let trimmed = input.strip_suffix('.').unwrap_or(input);
    if trimmed.is_empty() || trimmed.len() > 253 {
        return false;
    }
    let mut reasons = Vec::new();
    check_domain(trimmed, &mut reasons);
    if !reasons.is_empty() {
        return false;
    }
    trimmed
        .rsplit('.')
        .next()
        .map(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Lower-cased Unicode domain and its ASCII (punycode) form. The ASCII form
/// is empty when IDNA conversion fails.
pub(crate) fn normalize_domain(domain: &str) -> (String, String) {
    let lower = domain.trim().to_lowercase();
    let ascii = idna::domain_to_ascii(&lower).unwrap_or_default();
    (lower, ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_domain_ok() {
        let mut reasons = vec![];
        check_domain("example.com", &mut reasons);
        assert!(reasons.is_empty(), "{:?}", reasons);
    }

    #[test]
    fn label_too_long() {
        let long = "a".repeat(64);
        let mut reasons = vec![];
        check_domain(&format!("{}.com", long), &mut reasons);
        assert!(!reasons.is_empty());
    }

    #[test]
    fn hostname_rules() {
        assert!(is_valid_hostname("mail.example.com"));
        assert!(is_valid_hostname("example.com."));
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("999.999.999.999"));
        assert!(!is_valid_hostname("-bad.example.com"));
        assert!(!is_valid_hostname("exa mple.com"));
    }

    #[test]
    fn normalize_lowercases_and_punycodes() {
        let (lower, ascii) = normalize_domain("ExÄmple.COM");
        assert_eq!(lower, "exämple.com");
        assert_eq!(ascii, "xn--exmple-cua.com");
    }
}

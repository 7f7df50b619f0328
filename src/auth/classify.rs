use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::validator::is_valid_hostname;

/// What a bare host string turned out to be.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressClass {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    /// ASCII (punycode) form, lower-cased, without the root dot.
    Domain(String),
    Invalid(String),
}

impl AddressClass {
    /// Name of the SPF query slot the value belongs to.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Ipv4(_) => "ipv4",
            Self::Ipv6(_) => "ipv6",
            Self::Domain(_) => "domain",
            Self::Invalid(_) => "invalid",
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Self::Ipv4(addr) => Some(IpAddr::V4(*addr)),
            Self::Ipv6(addr) => Some(IpAddr::V6(*addr)),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

/// IPv4 literal first, then IPv6 literal, then domain syntax.
pub fn classify_address(input: &str) -> AddressClass {
    let trimmed = input.trim();
    if let Ok(addr) = trimmed.parse::<Ipv4Addr>() {
        return AddressClass::Ipv4(addr);
    }
    if let Ok(addr) = trimmed.parse::<Ipv6Addr>() {
        return AddressClass::Ipv6(addr);
    }
    if is_valid_hostname(trimmed) {
        let bare = trimmed.trim_end_matches('.');
        if let Ok(ascii) = idna::domain_to_ascii(bare) {
            return AddressClass::Domain(ascii);
        }
    }
    AddressClass::Invalid(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_win_over_domains() {
        assert_eq!(
            classify_address("192.0.2.1"),
            AddressClass::Ipv4(Ipv4Addr::new(192, 0, 2, 1))
        );
        assert_eq!(
            classify_address(" 2001:db8::1 "),
            AddressClass::Ipv6("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn domains_are_normalized() {
        assert_eq!(
            classify_address("Mail.Example.COM."),
            AddressClass::Domain("mail.example.com".to_string())
        );
        assert_eq!(
            classify_address("bücher.example"),
            AddressClass::Domain("xn--bcher-kva.example".to_string())
        );
    }

    #[test]
    fn everything_else_is_invalid() {
        for input in ["", "999.999.999.999", "no spaces.com", "localhost", "1.2.3"] {
            let class = classify_address(input);
            assert!(!class.is_valid(), "{input} -> {class:?}");
            assert_eq!(class.keyword(), "invalid");
        }
    }
}

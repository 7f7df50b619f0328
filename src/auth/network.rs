use std::net::IpAddr;

use ipnet::IpNet;

use super::NetworkError;

/// Whether `ip` lies inside `network` (CIDR, or a bare address meaning a
/// single host). Host bits in the network are ignored. An address of the
/// other family is simply not inside.
///
/// ```
/// use mailprep_lib::is_ip_in_network;
///
/// assert_eq!(is_ip_in_network("192.168.1.10", "192.168.1.0/24"), Ok(true));
/// assert!(is_ip_in_network("192.168.1.10", "not-a-net").is_err());
/// ```
pub fn is_ip_in_network(ip: &str, network: &str) -> Result<bool, NetworkError> {
    let addr = parse_address(ip)?;
    let net = parse_network(network)?;
    Ok(net.contains(&addr))
}

pub(crate) fn parse_address(input: &str) -> Result<IpAddr, NetworkError> {
    input
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| NetworkError::address(input))
}

pub(crate) fn parse_network(input: &str) -> Result<IpNet, NetworkError> {
    let trimmed = input.trim();
    if trimmed.contains('/') {
        return trimmed
            .parse::<IpNet>()
            .map_err(|_| NetworkError::network(input));
    }
    let addr = trimmed
        .parse::<IpAddr>()
        .map_err(|_| NetworkError::network(input))?;
    let host_prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, host_prefix).map_err(|_| NetworkError::network(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_membership() {
        assert_eq!(is_ip_in_network("192.0.2.1", "192.0.2.0/24"), Ok(true));
        assert_eq!(is_ip_in_network("203.0.113.1", "192.0.2.0/24"), Ok(false));
    }

    #[test]
    fn ipv6_membership() {
        assert_eq!(
            is_ip_in_network("2001:0db8:85a3::7334", "2001:0db8::/32"),
            Ok(true)
        );
        assert_eq!(
            is_ip_in_network("2001:0db9:85a3::7334", "2001:0db8::/32"),
            Ok(false)
        );
    }

    #[test]
    fn bare_address_is_a_host_network() {
        assert_eq!(is_ip_in_network("192.0.2.7", "192.0.2.7"), Ok(true));
        assert_eq!(is_ip_in_network("192.0.2.8", "192.0.2.7"), Ok(false));
    }

    #[test]
    fn host_bits_in_network_are_tolerated() {
        assert_eq!(is_ip_in_network("10.1.2.3", "10.1.2.99/24"), Ok(true));
    }

    #[test]
    fn mixed_families_are_not_members() {
        assert_eq!(is_ip_in_network("192.0.2.1", "2001:db8::/32"), Ok(false));
    }

    #[test]
    fn garbage_is_an_error_not_false() {
        assert_eq!(
            is_ip_in_network("2001:db8::1", "2001:zz8::/32"),
            Err(NetworkError::network("2001:zz8::/32"))
        );
        assert_eq!(
            is_ip_in_network("192.0.2.1", "192.0.2.0/33"),
            Err(NetworkError::network("192.0.2.0/33"))
        );
        assert_eq!(
            is_ip_in_network("host.example", "192.0.2.0/24"),
            Err(NetworkError::address("host.example"))
        );
    }
}

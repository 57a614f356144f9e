//! Typed component kinds — one module per provisionable resource.
//!
//! Each kind owns its validation rules, its dependency declarations, its
//! reference-pair rebuild, and its field comparison table consumed by the
//! generic diff routine.

pub mod credentials;
pub mod database;
pub mod firewall;
pub mod gateway;
pub mod instance;
pub mod loadbalancer;
pub mod nat;
pub mod network;
pub mod volume;

/// Dotted-quad IPv4 check, shared by subnet and rule validation.
pub(crate) fn valid_ipv4(addr: &str) -> bool {
    let octets: Vec<&str> = addr.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok())
}

/// `a.b.c.d/len` CIDR check.
pub(crate) fn valid_cidr(cidr: &str) -> bool {
    match cidr.split_once('/') {
        Some((addr, len)) => {
            valid_ipv4(addr) && len.parse::<u8>().is_ok_and(|l| l <= 32)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ipv4() {
        assert!(valid_ipv4("10.0.0.1"));
        assert!(valid_ipv4("255.255.255.255"));
        assert!(!valid_ipv4("10.0.0"));
        assert!(!valid_ipv4("10.0.0.256"));
        assert!(!valid_ipv4("ten.zero.zero.one"));
    }

    #[test]
    fn test_valid_cidr() {
        assert!(valid_cidr("10.0.0.0/24"));
        assert!(valid_cidr("0.0.0.0/0"));
        assert!(!valid_cidr("10.0.0.0"));
        assert!(!valid_cidr("10.0.0.0/33"));
        assert!(!valid_cidr("10.0.0/24"));
    }
}

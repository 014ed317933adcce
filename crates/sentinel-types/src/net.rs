//! IP address helpers used during event normalization

use std::net::Ipv4Addr;

/// Normalize an IP field value.
pub fn normalize_ip(ip: &str) -> String {
    let trimmed = ip.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        return "127.0.0.1".to_string();
    }
    trimmed.to_string()
}

fn is_internal_v4(addr: Ipv4Addr) -> bool {
    // 10/8, 172.16/12, 192.168/16 and 127/8
    addr.is_private() || addr.is_loopback()
}

/// Is the address outside the internal ranges?
///
/// Empty input is not external. Anything that fails to parse is treated as
/// external. The internal ranges are IPv4 only, so every IPv6 address
/// (loopback and v4-mapped included) is external.
pub fn is_external_ip(ip: &str) -> bool {
    let trimmed = ip.trim();
    if trimmed.is_empty() {
        return false;
    }

    match trimmed.parse::<Ipv4Addr>() {
        Ok(addr) => !is_internal_v4(addr),
        Err(_) => true,
    }
}

//! Literal IP address checks used to refuse internal targets.
//!
//! Only the textual host is inspected. No DNS lookups happen here, so a domain
//! name that resolves to an internal address is not caught.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns true when `ip` is loopback, private-use, link-local, unspecified,
/// shared address space, broadcast or another special-purpose block
/// (documentation, benchmarking, reserved).
pub fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

// IANA special-purpose IPv4 blocks not covered by the std predicates.
const SPECIAL_V4: [(Ipv4Addr, u8); 8] = [
    // "this network"
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    // carrier-grade NAT shared space
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    // IETF protocol assignments
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    // TEST-NET-1
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    // benchmarking
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    // TEST-NET-2
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    // TEST-NET-3
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    // reserved, includes broadcast
    (Ipv4Addr::new(240, 0, 0, 0), 4),
];

// IANA special-purpose IPv6 blocks not covered by the std predicates.
const SPECIAL_V6: [(Ipv6Addr, u8); 6] = [
    // discard-only
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
    // IETF protocol assignments
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    // documentation
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    // unique local
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    // link-local
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
    // deprecated site-local
    (Ipv6Addr::new(0xfec0, 0, 0, 0, 0, 0, 0, 0), 10),
];

fn in_v4_block(ip: Ipv4Addr, (network, prefix): (Ipv4Addr, u8)) -> bool {
    let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
    u32::from(ip) & mask == u32::from(network) & mask
}

fn in_v6_block(ip: Ipv6Addr, (network, prefix): (Ipv6Addr, u8)) -> bool {
    let mask = u128::MAX.checked_shl(128 - prefix as u32).unwrap_or(0);
    u128::from(ip) & mask == u128::from(network) & mask
}

fn is_forbidden_v4(ip: Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || SPECIAL_V4.iter().any(|block| in_v4_block(ip, *block))
}

fn is_forbidden_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_forbidden_v4(v4);
    }
    let segments = ip.segments();
    // 64:ff9b::/96 NAT64 embeds an IPv4 address in the low 32 bits
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [.., hi, lo] = segments;
        let embedded = Ipv4Addr::from(((hi as u32) << 16) | lo as u32);
        return is_forbidden_v4(embedded);
    }
    ip.is_loopback()
        || ip.is_unspecified()
        || SPECIAL_V6.iter().any(|block| in_v6_block(ip, *block))
}

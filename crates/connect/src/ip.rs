//! Network origin extraction.
//!
//! Forwarded-for headers and remote-address columns often carry proxy chains,
//! ports, or junk. [`filter_ip`] pulls the first strictly valid IPv4 or IPv6
//! literal out of such a string.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::LazyLock;

use regex::Regex;

use crate::order::Order;

/// Longest literal worth trying inside a candidate run, zone id included.
const MAX_LITERAL_LEN: usize = 64;

/// Candidate tokens: hex digits, dots, colons, and an optional `%zone` suffix.
static CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9A-Fa-f:.]*[0-9A-Fa-f:](?:%[0-9A-Za-z]+)?").expect("Invalid regex")
});

/// Return the first valid IP literal contained in `raw`.
///
/// Accepts dotted-quad IPv4, every IPv6 text form `std::net` understands
/// (compressed, IPv4-mapped, embedded IPv4), link-local addresses with a zone
/// id, and `ip:port` / `[ipv6]:port` socket forms, from which the address is
/// returned. Addresses glued to surrounding text (`IP:203.0.113.5`,
/// `1.2.3.4.5`) yield the leftmost, then longest, valid literal; a literal
/// never starts in the middle of a digit run. Returns `None` when nothing
/// matches.
#[must_use]
pub fn filter_ip(raw: &str) -> Option<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
        .find_map(extract_from_segment)
}

fn extract_from_segment(segment: &str) -> Option<String> {
    let trimmed = segment.trim_matches(|c: char| c == '"' || c == '\'');

    if let Ok(socket) = trimmed.parse::<SocketAddr>() {
        return Some(socket.ip().to_string());
    }

    CANDIDATE_RE
        .find_iter(trimmed)
        .find_map(|m| first_literal_in(m.as_str()))
        .map(String::from)
}

fn first_literal_in(run: &str) -> Option<&str> {
    let bytes = run.as_bytes();
    (0..run.len())
        .filter(|&start| {
            start
                .checked_sub(1)
                .and_then(|prev| bytes.get(prev))
                .is_none_or(|b| !b.is_ascii_hexdigit())
        })
        .find_map(|start| {
            let longest = run.len().min(start + MAX_LITERAL_LEN);
            (start + 1..=longest)
                .rev()
                .filter_map(|end| run.get(start..end))
                .find(|candidate| is_ip_literal(candidate))
        })
}

fn is_ip_literal(candidate: &str) -> bool {
    if candidate.parse::<IpAddr>().is_ok() {
        return true;
    }

    // Zone ids are only meaningful on link-local IPv6 addresses.
    candidate
        .split_once('%')
        .and_then(|(addr, _zone)| addr.parse::<Ipv6Addr>().ok())
        .is_some_and(|addr| addr.segments().first().is_some_and(|s| s & 0xffc0 == 0xfe80))
}

/// Network origin of an order.
///
/// When the order carries a remote-ip marker, its forwarded-for value wins
/// over the remote ip. Without a marker the remote address of the current
/// request, if any, is used.
#[must_use]
pub fn order_ip_address(order: &Order, request_remote_addr: Option<&str>) -> Option<String> {
    match order.remote_ip.as_deref().filter(|ip| !ip.is_empty()) {
        Some(remote_ip) => match order.x_forwarded_for.as_deref().filter(|f| !f.is_empty()) {
            Some(forwarded) => filter_ip(forwarded),
            None => filter_ip(remote_ip),
        },
        None => request_remote_addr.and_then(filter_ip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_chain_first_match_wins() {
        assert_eq!(
            filter_ip("203.0.113.5, 70.41.3.18").as_deref(),
            Some("203.0.113.5")
        );
    }

    #[test]
    fn test_invalid_input_is_absent() {
        assert_eq!(filter_ip("not-an-ip"), None);
        assert_eq!(filter_ip(""), None);
        assert_eq!(filter_ip("unknown, ,"), None);
    }

    #[test]
    fn test_out_of_range_octets_are_skipped() {
        assert_eq!(filter_ip("999.1.1.1, 10.0.0.1").as_deref(), Some("10.0.0.1"));
        assert_eq!(filter_ip("1.2.3"), None);
    }

    #[test]
    fn test_ipv6_forms() {
        assert_eq!(filter_ip("2001:db8::1").as_deref(), Some("2001:db8::1"));
        assert_eq!(
            filter_ip("2001:0db8:85a3:0000:0000:8a2e:0370:7334").as_deref(),
            Some("2001:0db8:85a3:0000:0000:8a2e:0370:7334")
        );
        assert_eq!(filter_ip("::1").as_deref(), Some("::1"));
        assert_eq!(
            filter_ip("::ffff:192.0.2.128").as_deref(),
            Some("::ffff:192.0.2.128")
        );
    }

    #[test]
    fn test_link_local_zone() {
        assert_eq!(filter_ip("fe80::1%eth0").as_deref(), Some("fe80::1%eth0"));
        // Zones on other addresses are not part of the literal.
        assert_eq!(filter_ip("2001:db8::1%eth0").as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_socket_forms_return_address() {
        assert_eq!(filter_ip("198.51.100.7:8443").as_deref(), Some("198.51.100.7"));
        assert_eq!(filter_ip("[2001:db8::2]:443").as_deref(), Some("2001:db8::2"));
    }

    #[test]
    fn test_embedded_in_text() {
        assert_eq!(filter_ip("client=192.0.2.44").as_deref(), Some("192.0.2.44"));
        assert_eq!(filter_ip("IP:203.0.113.5").as_deref(), Some("203.0.113.5"));
        assert_eq!(filter_ip("client:203.0.113.5").as_deref(), Some("203.0.113.5"));
        assert_eq!(filter_ip("face:203.0.113.5").as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_extra_octet_keeps_leading_quad() {
        assert_eq!(filter_ip("1.2.3.4.5").as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn test_literal_never_starts_inside_digits() {
        assert_eq!(filter_ip("1999.1.1.1"), None);
        assert_eq!(filter_ip("999.1.1.1 192.0.2.1").as_deref(), Some("192.0.2.1"));
    }
}

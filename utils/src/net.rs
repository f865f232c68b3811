//! Peer address helpers.
//!
//! Only externally routable IPv4 addresses are worth keeping in the address
//! book; everything else is pruned.

use std::collections::HashSet;
use std::hash::Hash;
use std::net::Ipv4Addr;

use multiaddr::{Multiaddr, Protocol};

/// The first `/ip4` component of `addr`, if any.
pub fn find_ipv4(addr: &Multiaddr) -> Option<Ipv4Addr> {
    addr.iter().find_map(|proto| match proto {
        Protocol::Ip4(ip) => Some(ip),
        _ => None,
    })
}

/// Whether `ip` lies in a range that is not reachable from the public internet.
///
/// Covers RFC 1918 private ranges, loopback, link-local, the shared
/// carrier-grade NAT range (100.64.0.0/10), unspecified and broadcast.
pub fn is_intranet_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || (a == 100 && (64..128).contains(&b))
}

/// Whether `addr` carries an `/ip4` component outside every intranet range.
///
/// Addresses without one (`/ip6`, `/dns4`, ...) are treated as not public.
pub fn is_public_addr(addr: &Multiaddr) -> bool {
    find_ipv4(addr).is_some_and(|ip| !is_intranet_ipv4(ip))
}

/// Remove duplicates, keeping the first occurrence of each entry.
pub fn dedup_preserving_order<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

//! Peer records kept in the node's address book.

use multiaddr::Multiaddr;
use serde::{Deserialize, Serialize};

/// A known network peer: its opaque id and the addresses it can be reached at.
///
/// Order of `addrs` is significant only for display; the registry keeps
/// them duplicate-free. Addresses serialize in their text form
/// (`/ip4/1.2.3.4/tcp/4001`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub id: String,
    #[serde(default)]
    pub addrs: Vec<Multiaddr>,
}

impl PeerRecord {
    pub fn new(id: impl Into<String>, addrs: Vec<Multiaddr>) -> Self {
        Self {
            id: id.into(),
            addrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_serialize_as_text() {
        let record = PeerRecord::new("p1", vec!["/ip4/8.8.8.8/tcp/4001".parse().unwrap()]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":"p1","addrs":["/ip4/8.8.8.8/tcp/4001"]}"#);
        let back: PeerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}

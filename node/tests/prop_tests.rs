//! Property tests for the peer registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use strata_node::PeerRegistry;
use strata_types::{Multiaddr, PeerRecord};
use strata_utils::is_public_addr;

fn arb_addr() -> impl Strategy<Value = Multiaddr> {
    prop_oneof![
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), 1u16..)
            .prop_map(|(a, b, c, d, port)| format!("/ip4/{a}.{b}.{c}.{d}/tcp/{port}")),
        (0u8..4, any::<u8>()).prop_map(|(prefix, host)| {
            let net = ["10.0.0", "192.168.1", "127.0.0", "172.16.4"][prefix as usize];
            format!("/ip4/{net}.{host}/tcp/4001")
        }),
        Just("/ip6/::1/tcp/4001".to_string()),
        Just("/ip6/::ffff:8.8.8.8/tcp/4001".to_string()),
        Just("/dns4/8.8.8.8/tcp/4001".to_string()),
    ]
    .prop_map(|s| s.parse::<Multiaddr>().expect("valid multiaddr"))
}

fn arb_book() -> impl Strategy<Value = HashMap<String, PeerRecord>> {
    prop::collection::hash_map(
        "[a-z0-9]{1,12}",
        prop::collection::vec(arb_addr(), 0..6),
        0..16,
    )
    .prop_map(|m| {
        m.into_iter()
            .map(|(id, addrs)| (id.clone(), PeerRecord::new(id, addrs)))
            .collect()
    })
}

fn registry_with(book: &HashMap<String, PeerRecord>) -> PeerRegistry {
    let reg = PeerRegistry::new("unused/peers");
    for (id, record) in book {
        assert!(reg.save(id, record.clone()));
    }
    reg
}

proptest! {
    /// Mutating any copy handed out never reaches the registry.
    #[test]
    fn copies_are_isolated(book in arb_book(), junk in "[a-z]{13,16}") {
        let reg = registry_with(&book);
        let mut ids = reg.list_ids();
        ids.push(junk.clone());
        let mut snap = reg.snapshot();
        snap.insert(junk.clone(), PeerRecord::new(junk.clone(), vec![]));
        for record in snap.values_mut() {
            record.addrs.clear();
        }
        prop_assert_eq!(reg.snapshot(), book);
        prop_assert!(!reg.has(&junk));
    }

    /// A second prune changes nothing, and every survivor is public and duplicate-free.
    #[test]
    fn pruning_is_idempotent(book in arb_book()) {
        let reg = registry_with(&book);
        reg.prune_intranet_addresses();
        let once = reg.snapshot();
        let again = reg.prune_intranet_addresses();
        prop_assert_eq!(again.removed, 0);
        prop_assert_eq!(reg.snapshot(), once.clone());

        for record in once.values() {
            prop_assert!(!record.addrs.is_empty());
            prop_assert!(record.addrs.iter().all(|a| is_public_addr(a)));
            let distinct: HashSet<_> = record.addrs.iter().collect();
            prop_assert_eq!(distinct.len(), record.addrs.len());
        }
        for (id, record) in &book {
            let had_public = record.addrs.iter().any(|a| is_public_addr(a));
            prop_assert_eq!(once.contains_key(id), had_public);
        }
    }

    /// Persisting then loading into an empty registry reproduces it.
    #[test]
    fn persistence_round_trips(book in arb_book()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peers");
        let reg = PeerRegistry::new(&path);
        for (id, record) in &book {
            reg.save(id, record.clone());
        }
        reg.persist().unwrap();

        let restored = PeerRegistry::new(&path);
        prop_assert_eq!(restored.load().unwrap(), book.len());
        prop_assert_eq!(restored.snapshot(), book);
    }

    /// Saves racing an exclusive holder either land whole or not at all.
    #[test]
    fn contended_saves_never_corrupt(book in arb_book()) {
        let reg = Arc::new(PeerRegistry::new("unused/peers"));
        let records: Vec<(String, PeerRecord)> = book.clone().into_iter().collect();
        let (half_a, half_b) = records.split_at(records.len() / 2);
        let (half_a, half_b) = (half_a.to_vec(), half_b.to_vec());

        let holder = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || {
                let mut book = reg.lock();
                for (id, record) in half_a {
                    book.upsert(&id, record);
                }
            })
        };
        let saver = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || {
                half_b
                    .into_iter()
                    .filter(|(id, record)| reg.save(id, record.clone()))
                    .count()
            })
        };
        holder.join().unwrap();
        let landed = saver.join().unwrap();

        let snap = reg.snapshot();
        prop_assert_eq!(snap.len(), records.len() / 2 + landed);
        for (id, record) in &snap {
            prop_assert_eq!(Some(record), book.get(id));
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Stress test: concurrent discovery mutations against snapshot readers.
//!
//! Writer threads apply random add/remove sequences on disjoint GUID sets
//! while reader threads keep taking snapshots. The final cache must hold
//! exactly the GUIDs whose last operation was an add.

use hdds_discovery_graph::{DiscoveryGraphCache, EntityKind, GraphEvent, NodeIdentity, GUID};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 8;
const READERS: usize = 4;
const OPS_PER_WRITER: usize = 1_000;
const ENDPOINTS_PER_WRITER: u8 = 32;

fn local_guid() -> GUID {
    GUID::participant([0xFF; 12])
}

fn writer_prefix(writer: usize) -> [u8; 12] {
    let mut prefix = [0u8; 12];
    prefix[0] = 0x10;
    prefix[11] = writer as u8;
    prefix
}

fn endpoint(writer: usize, index: u8) -> GUID {
    GUID::new(writer_prefix(writer), [0, 0, index, 0x03])
}

/// Returns the expected alive state of every endpoint it touched.
fn run_writer(cache: &DiscoveryGraphCache, writer: usize) -> HashMap<GUID, bool> {
    let mut rng = fastrand::Rng::with_seed(0x5eed + writer as u64);
    let owner = GUID::participant(writer_prefix(writer));
    let mut last_op = HashMap::new();

    cache.add_participant(owner, Some(&format!("writer_{}", writer)), Some("/stress"));

    for _ in 0..OPS_PER_WRITER {
        let guid = endpoint(writer, rng.u8(1..=ENDPOINTS_PER_WRITER));
        let kind = if rng.bool() {
            EntityKind::Publisher
        } else {
            EntityKind::Subscriber
        };

        if rng.u8(0..3) > 0 {
            cache.add_entity(guid, owner, &format!("rt/topic_{}", rng.u8(0..4)), "T", kind);
            last_op.insert(guid, true);
        } else {
            // Kind mismatch on removal must not matter for endpoints.
            cache.remove_entity(guid, kind);
            last_op.insert(guid, false);
        }
    }
    last_op
}

#[test]
fn concurrent_writers_and_snapshot_readers() {
    let cache = Arc::new(DiscoveryGraphCache::new(local_guid(), "stress_self", "/"));
    let done = Arc::new(AtomicBool::new(false));
    let snapshots = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            let snapshots = Arc::clone(&snapshots);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let names = cache.snapshot_named_participants();
                    assert_eq!(names[0].name, "stress_self");

                    let snapshot = cache.snapshot();
                    assert!(snapshot.participants[0].is_local());
                    assert!(snapshot
                        .entities
                        .windows(2)
                        .all(|pair| pair[0].guid < pair[1].guid));

                    // No endpoint without a tracked owner.
                    for record in &snapshot.entities {
                        let owner = snapshot
                            .participants
                            .iter()
                            .find(|info| info.guid == record.owning_participant_guid)
                            .expect("owner in snapshot");
                        if record.kind != EntityKind::Participant {
                            assert!(owner.endpoints.contains(&record.guid));
                        }
                    }
                    snapshots.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || run_writer(&cache, writer))
        })
        .collect();

    let mut expected = HashMap::new();
    for handle in writers {
        expected.extend(handle.join().expect("writer thread"));
    }
    done.store(true, Ordering::Release);
    for handle in readers {
        handle.join().expect("reader thread");
    }

    for (guid, alive) in &expected {
        assert_eq!(cache.contains(guid), *alive, "endpoint {}", guid);
    }

    let alive_endpoints = expected.values().filter(|alive| **alive).count();
    assert_eq!(cache.len(), alive_endpoints + WRITERS);
    assert_eq!(cache.snapshot_named_participants().len(), WRITERS + 1);
    assert!(snapshots.load(Ordering::Relaxed) > 0);
}

#[test]
fn concurrent_batches_keep_per_guid_order() {
    let cache = Arc::new(DiscoveryGraphCache::new(local_guid(), "stress_self", "/"));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let guid = GUID::participant(writer_prefix(writer));
                for round in 0..100 {
                    let identity = NodeIdentity {
                        name: Some(format!("node_{}_{}", writer, round)),
                        namespace: Some("/".to_string()),
                        enclave: None,
                    };
                    cache.apply_batch(vec![
                        GraphEvent::ParticipantAlive {
                            guid,
                            identity: identity.clone(),
                        },
                        GraphEvent::Gone {
                            guid,
                            kind: EntityKind::Participant,
                        },
                        GraphEvent::ParticipantAlive { guid, identity },
                    ]);
                }
                guid
            })
        })
        .collect();

    for handle in handles {
        let guid = handle.join().expect("writer thread");
        let info = cache.participant(&guid).expect("participant alive");
        assert!(info.name.as_deref().is_some_and(|name| name.ends_with("_99")));
    }
    assert_eq!(cache.snapshot_named_participants().len(), WRITERS + 1);
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::key_value::{parse_key_value, NodeIdentity};
use crate::NodeName;

fn local_guid() -> GUID {
    GUID::participant([0x42; 12])
}

#[test]
fn rejects_invalid_identity() {
    assert!(matches!(
        GraphContext::new(local_guid(), "", "/"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        GraphContext::new(local_guid(), "talker", "relative"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        GraphContext::new(GUID::zero(), "talker", "/"),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn self_record_pinned_in_cache() {
    let ctx = GraphContext::new(local_guid(), "talker", "/demo").expect("context");
    assert_eq!(
        ctx.graph_cache().snapshot_named_participants(),
        vec![NodeName::new("talker", "/demo")]
    );
    assert_eq!(ctx.graph_cache().local_guid(), local_guid());
}

#[test]
fn user_data_round_trips_through_resolver() {
    let config = EnvConfig {
        enclave: Some("/fleet".to_string()),
        ..EnvConfig::default()
    };
    let ctx = GraphContext::with_config(local_guid(), "talker", "/demo", config).expect("context");

    let blob = ctx.user_data();
    assert_eq!(parse_key_value(&blob)["enclave"], b"/fleet");

    let identity = NodeIdentity::resolve(&blob, None);
    assert_eq!(identity.name.as_deref(), Some("talker"));
    assert_eq!(identity.namespace.as_deref(), Some("/demo"));
}

#[test]
fn listeners_inherit_take_limit() {
    let config = EnvConfig {
        discovery_take_limit: Some(16),
        ..EnvConfig::default()
    };
    let ctx = GraphContext::with_config(local_guid(), "talker", "/", config).expect("context");
    assert_eq!(ctx.participant_listener().take_limit(), Some(16));
    assert_eq!(ctx.publisher_listener().take_limit(), Some(16));
    assert_eq!(ctx.subscriber_listener().take_limit(), Some(16));
}

#[test]
fn local_endpoints_trigger_guard_on_change() {
    let ctx = GraphContext::new(local_guid(), "talker", "/").expect("context");
    let guard = ctx.graph_guard();
    let writer = GUID::new([0x42; 12], [0, 0, 1, 0x03]);

    ctx.register_local_endpoint(writer, "rt/chatter", "String", EntityKind::Publisher)
        .expect("register");
    assert!(guard.take_trigger());

    // Same registration again is not a graph change.
    ctx.register_local_endpoint(writer, "rt/chatter", "String", EntityKind::Publisher)
        .expect("register");
    assert!(!guard.take_trigger());

    assert_eq!(
        ctx.graph_cache()
            .count_endpoints("rt/chatter", EntityKind::Publisher),
        1
    );

    ctx.unregister_local_endpoint(writer, EntityKind::Publisher);
    assert!(guard.take_trigger());
    assert!(ctx.graph_cache().is_empty());

    assert!(ctx
        .register_local_endpoint(writer, "t", "T", EntityKind::Participant)
        .is_err());
}

#[test]
fn drop_clears_shared_cache() {
    let ctx = GraphContext::new(local_guid(), "talker", "/").expect("context");
    let cache = ctx.graph_cache();
    cache.add_participant(GUID::participant([1; 12]), Some("other"), None);
    assert_eq!(cache.len(), 1);

    drop(ctx);
    assert!(cache.is_empty());
}

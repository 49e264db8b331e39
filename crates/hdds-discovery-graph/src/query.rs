// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Graph introspection queries.
//!
//! Every query validates the node handle first, then works on a copy taken
//! from the graph cache; outputs are only written once the whole result was
//! built, so a failing query leaves them untouched.

use crate::context::GraphContext;
use crate::graph::{EntityKind, NamesAndTypes};
use crate::{Error, HandleFault, Result};
use std::sync::Arc;

/// Implementation identifier stamped on every node handle.
pub const IMPLEMENTATION_IDENTIFIER: &str = "rmw_hdds_cpp";

/// Output string array.
///
/// The zero state (no storage at all) is the only state a query accepts as
/// output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringArray {
    data: Vec<String>,
}

impl StringArray {
    /// Zero-initialized array.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.data.is_empty() && self.data.capacity() == 0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Release the storage and return to the zero state.
    pub fn fini(&mut self) {
        self.data = Vec::new();
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.data
    }
}

impl From<Vec<String>> for StringArray {
    fn from(data: Vec<String>) -> Self {
        Self { data }
    }
}

/// Handle of a node created by this middleware.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub implementation_identifier: &'static str,
    pub context: Arc<GraphContext>,
}

fn check_node(node: Option<&NodeHandle>) -> Result<&GraphContext> {
    let node = node.ok_or(Error::InvalidHandle(HandleFault::Null))?;
    if node.implementation_identifier != IMPLEMENTATION_IDENTIFIER {
        return Err(Error::InvalidHandle(HandleFault::ForeignImplementation));
    }
    Ok(node.context.as_ref())
}

fn check_zero(array: &StringArray, what: &'static str) -> Result<()> {
    if array.is_zero() {
        Ok(())
    } else {
        Err(Error::PreconditionViolated(what))
    }
}

fn reserved<T>(len: usize) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted)?;
    Ok(out)
}

/// List every named node in the graph.
///
/// Index 0 is the calling node; `namespaces[i]` belongs to `names[i]`.
/// Both outputs must be zero-initialized.
pub fn get_node_names(
    node: Option<&NodeHandle>,
    node_names: &mut StringArray,
    node_namespaces: &mut StringArray,
) -> Result<()> {
    let context = check_node(node)?;
    check_zero(node_names, "node_names must be zero initialized")?;
    check_zero(node_namespaces, "node_namespaces must be zero initialized")?;

    let nodes = context.graph_cache().snapshot_named_participants();

    let mut names = reserved(nodes.len())?;
    let mut namespaces = reserved(nodes.len())?;
    for node in nodes {
        names.push(node.name);
        namespaces.push(node.namespace);
    }

    log::debug!("[graph] get_node_names: {} nodes", names.len());
    node_names.data = names;
    node_namespaces.data = namespaces;
    Ok(())
}

/// Number of publishers on `topic_name`.
pub fn count_publishers(node: Option<&NodeHandle>, topic_name: &str) -> Result<usize> {
    count_endpoints(node, topic_name, EntityKind::Publisher)
}

/// Number of subscribers on `topic_name`.
pub fn count_subscribers(node: Option<&NodeHandle>, topic_name: &str) -> Result<usize> {
    count_endpoints(node, topic_name, EntityKind::Subscriber)
}

fn count_endpoints(node: Option<&NodeHandle>, topic_name: &str, kind: EntityKind) -> Result<usize> {
    let context = check_node(node)?;
    if topic_name.is_empty() {
        return Err(Error::InvalidArgument("topic name is empty".to_string()));
    }
    Ok(context.graph_cache().count_endpoints(topic_name, kind))
}

/// Every topic with at least one endpoint, and the types seen on it.
pub fn get_topic_names_and_types(node: Option<&NodeHandle>) -> Result<NamesAndTypes> {
    let context = check_node(node)?;
    Ok(context.graph_cache().topic_names_and_types())
}

/// Topics published by the node `node_name` in `node_namespace`.
pub fn get_publisher_names_and_types_by_node(
    node: Option<&NodeHandle>,
    node_name: &str,
    node_namespace: &str,
) -> Result<NamesAndTypes> {
    endpoints_by_node(node, node_name, node_namespace, EntityKind::Publisher)
}

/// Topics subscribed by the node `node_name` in `node_namespace`.
pub fn get_subscriber_names_and_types_by_node(
    node: Option<&NodeHandle>,
    node_name: &str,
    node_namespace: &str,
) -> Result<NamesAndTypes> {
    endpoints_by_node(node, node_name, node_namespace, EntityKind::Subscriber)
}

fn endpoints_by_node(
    node: Option<&NodeHandle>,
    node_name: &str,
    node_namespace: &str,
    kind: EntityKind,
) -> Result<NamesAndTypes> {
    let context = check_node(node)?;
    if node_name.is_empty() {
        return Err(Error::InvalidArgument("node name is empty".to_string()));
    }
    context
        .graph_cache()
        .endpoints_by_node(node_name, node_namespace, kind)
        .ok_or_else(|| Error::NodeNameNonExistent {
            name: node_name.to_string(),
            namespace: node_namespace.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GUID;

    fn context() -> Arc<GraphContext> {
        GraphContext::new(GUID::participant([0xAB; 12]), "self_node", "/local").expect("context")
    }

    #[test]
    fn node_names_self_first_then_discovered() {
        let ctx = context();
        let node = ctx.node_handle();
        let cache = ctx.graph_cache();
        cache.add_participant(GUID::participant([1; 12]), Some("a"), Some("/x"));
        cache.add_participant(GUID::participant([2; 12]), None, None);
        cache.add_participant(GUID::participant([3; 12]), Some("pname"), None);

        let mut names = StringArray::zeroed();
        let mut namespaces = StringArray::zeroed();
        get_node_names(Some(&node), &mut names, &mut namespaces).expect("query");

        assert_eq!(names.as_slice(), ["self_node", "a", "pname"]);
        assert_eq!(namespaces.as_slice(), ["/local", "/x", ""]);

        names.fini();
        assert!(names.is_zero());
    }

    #[test]
    fn node_names_scenario_steps() {
        let ctx = context();
        let node = ctx.node_handle();
        let cache = ctx.graph_cache();
        let p1 = GUID::participant([1; 12]);
        let e1 = GUID::new([1; 12], [0, 0, 1, 0x03]);

        let query = || {
            let mut names = StringArray::zeroed();
            let mut namespaces = StringArray::zeroed();
            get_node_names(Some(&node), &mut names, &mut namespaces).expect("query");
            names
                .into_vec()
                .into_iter()
                .zip(namespaces.into_vec())
                .collect::<Vec<_>>()
        };
        let me = ("self_node".to_string(), "/local".to_string());
        let a = ("a".to_string(), "/x".to_string());

        cache.add_participant(p1, Some("a"), Some("/x"));
        assert_eq!(query(), vec![me.clone(), a.clone()]);

        cache.add_entity(e1, p1, "rt/chatter", "String", EntityKind::Publisher);
        assert_eq!(query(), vec![me.clone(), a]);

        cache.remove_entity(p1, EntityKind::Participant);
        assert_eq!(query(), vec![me]);
        assert!(!cache.contains(&e1));
    }

    #[test]
    fn null_and_foreign_handles_rejected() {
        let ctx = context();
        let mut names = StringArray::zeroed();
        let mut namespaces = StringArray::zeroed();

        let err = get_node_names(None, &mut names, &mut namespaces).expect_err("null");
        assert!(matches!(err, Error::InvalidHandle(HandleFault::Null)));

        let foreign = NodeHandle {
            implementation_identifier: "rmw_fastrtps_cpp",
            context: Arc::clone(&ctx),
        };
        let err = get_node_names(Some(&foreign), &mut names, &mut namespaces).expect_err("foreign");
        assert!(matches!(
            err,
            Error::InvalidHandle(HandleFault::ForeignImplementation)
        ));
        assert!(names.is_zero());
        assert!(namespaces.is_zero());

        assert!(count_publishers(Some(&foreign), "rt/x").is_err());
        assert!(get_topic_names_and_types(None).is_err());
    }

    #[test]
    fn non_zero_output_rejected_and_untouched() {
        let ctx = context();
        let node = ctx.node_handle();
        let version = ctx.graph_cache().version();

        let mut names = StringArray::from(vec!["stale".to_string()]);
        let mut namespaces = StringArray::zeroed();
        let err = get_node_names(Some(&node), &mut names, &mut namespaces).expect_err("dirty");
        assert!(matches!(err, Error::PreconditionViolated(_)));
        assert_eq!(names.as_slice(), ["stale"]);
        assert!(namespaces.is_zero());

        let mut names = StringArray::zeroed();
        let mut namespaces = StringArray::from(Vec::<String>::with_capacity(4));
        assert!(get_node_names(Some(&node), &mut names, &mut namespaces).is_err());
        assert!(names.is_zero());

        assert_eq!(ctx.graph_cache().version(), version);
    }

    #[test]
    fn endpoint_counts_and_topics() {
        let ctx = context();
        let node = ctx.node_handle();
        let cache = ctx.graph_cache();
        let p1 = GUID::participant([1; 12]);
        cache.add_participant(p1, Some("talker"), Some("/demo"));
        cache.add_entity(
            GUID::new([1; 12], [0, 0, 1, 0x03]),
            p1,
            "rt/chatter",
            "String",
            EntityKind::Publisher,
        );
        cache.add_entity(
            GUID::new([2; 12], [0, 0, 1, 0x04]),
            GUID::participant([2; 12]),
            "rt/chatter",
            "String",
            EntityKind::Subscriber,
        );

        assert_eq!(count_publishers(Some(&node), "rt/chatter").expect("count"), 1);
        assert_eq!(count_subscribers(Some(&node), "rt/chatter").expect("count"), 1);
        assert_eq!(count_subscribers(Some(&node), "rt/none").expect("count"), 0);
        assert!(matches!(
            count_publishers(Some(&node), ""),
            Err(Error::InvalidArgument(_))
        ));

        let topics = get_topic_names_and_types(Some(&node)).expect("topics");
        assert_eq!(topics.len(), 1);
        assert!(topics["rt/chatter"].contains("String"));
    }

    #[test]
    fn names_and_types_by_node() {
        let ctx = context();
        let node = ctx.node_handle();
        let cache = ctx.graph_cache();
        let p1 = GUID::participant([1; 12]);
        cache.add_participant(p1, Some("talker"), Some("/demo"));
        cache.add_entity(
            GUID::new([1; 12], [0, 0, 1, 0x03]),
            p1,
            "rt/chatter",
            "String",
            EntityKind::Publisher,
        );

        let pubs =
            get_publisher_names_and_types_by_node(Some(&node), "talker", "/demo").expect("pubs");
        assert!(pubs["rt/chatter"].contains("String"));

        let subs =
            get_subscriber_names_and_types_by_node(Some(&node), "talker", "/demo").expect("subs");
        assert!(subs.is_empty());

        // The calling node itself is a known node.
        let own = get_publisher_names_and_types_by_node(Some(&node), "self_node", "/local")
            .expect("self");
        assert!(own.is_empty());

        let err = get_subscriber_names_and_types_by_node(Some(&node), "ghost", "/")
            .expect_err("unknown node");
        assert!(matches!(err, Error::NodeNameNonExistent { .. }));
    }
}

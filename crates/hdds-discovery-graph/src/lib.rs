// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ROS 2 discovery graph for the HDDS rmw layer.
//!
//! Builtin discovery readers (participants, publications, subscriptions) feed
//! a [`DiscoveryGraphCache`] through the listeners in [`listener`]. Graph
//! introspection queries such as [`query::get_node_names`] read point-in-time
//! copies of that cache. [`GraphContext`] ties the pieces together for one
//! node, and [`ffi`] exposes the node-name query over the C ABI.
//!
//! ```
//! use hdds_discovery_graph::{query, GraphContext, StringArray, GUID};
//!
//! let ctx = GraphContext::new(GUID::participant([1; 12]), "talker", "/demo").unwrap();
//! ctx.graph_cache()
//!     .add_participant(GUID::participant([2; 12]), Some("listener"), Some("/demo"));
//!
//! let node = ctx.node_handle();
//! let mut names = StringArray::zeroed();
//! let mut namespaces = StringArray::zeroed();
//! query::get_node_names(Some(&node), &mut names, &mut namespaces).unwrap();
//! assert_eq!(names.as_slice(), ["talker", "listener"]);
//! ```

pub mod builtin;
pub mod context;
pub mod env_config;
pub mod event;
pub mod ffi;
pub mod graph;
pub mod guard;
pub mod guid;
pub mod key_value;
pub mod listener;
pub mod query;

pub use context::GraphContext;
pub use env_config::EnvConfig;
pub use event::GraphEvent;
pub use graph::{
    DiscoveryGraphCache, EntityKind, EntityRecord, GraphSnapshot, NamesAndTypes, NodeName,
    ParticipantInfo,
};
pub use guard::{GraphGuardCondition, GraphSignal};
pub use guid::{participant_guid_of, to_guid, BuiltinTopicKey, InstanceHandle, GUID};
pub use key_value::{encode_key_value, parse_key_value, NodeIdentity};
pub use listener::{
    BuiltinReader, DiscoveryListener, DiscoveryReader, DrainReport, ParticipantListener,
    PublisherListener, SubscriberListener, TakeError,
};
pub use query::{NodeHandle, StringArray, IMPLEMENTATION_IDENTIFIER};

use std::fmt;
use thiserror::Error;

/// rmw return code.
pub type RmwRet = i32;

pub const RMW_RET_OK: RmwRet = 0;
pub const RMW_RET_ERROR: RmwRet = 1;
pub const RMW_RET_BAD_ALLOC: RmwRet = 10;
pub const RMW_RET_INVALID_ARGUMENT: RmwRet = 11;
pub const RMW_RET_INCORRECT_RMW_IMPLEMENTATION: RmwRet = 12;
pub const RMW_RET_NODE_NAME_NON_EXISTENT: RmwRet = 203;

/// What is wrong with a node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFault {
    Null,
    ForeignImplementation,
}

impl fmt::Display for HandleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "node handle is null"),
            Self::ForeignImplementation => {
                write!(f, "node handle is not from this rmw implementation")
            }
        }
    }
}

/// Errors emitted by graph queries and context setup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidHandle(HandleFault),
    #[error("precondition violated: {0}")]
    PreconditionViolated(&'static str),
    #[error("out of memory")]
    ResourceExhausted,
    #[error("transport error: {0}")]
    TransportError(#[from] TakeError),
    #[error("node '{name}' in namespace '{namespace}' not found")]
    NodeNameNonExistent { name: String, namespace: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// rmw return code for this error.
    #[must_use]
    pub fn to_ret(&self) -> RmwRet {
        match self {
            Self::InvalidHandle(HandleFault::Null) => RMW_RET_INVALID_ARGUMENT,
            Self::InvalidHandle(HandleFault::ForeignImplementation) => {
                RMW_RET_INCORRECT_RMW_IMPLEMENTATION
            }
            Self::PreconditionViolated(_) | Self::TransportError(_) => RMW_RET_ERROR,
            Self::ResourceExhausted => RMW_RET_BAD_ALLOC,
            Self::NodeNameNonExistent { .. } => RMW_RET_NODE_NAME_NON_EXISTENT,
            Self::InvalidArgument(_) => RMW_RET_INVALID_ARGUMENT,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

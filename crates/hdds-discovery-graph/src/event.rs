// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Immutable discovery events exchanged between listeners and the graph cache.

use crate::graph::EntityKind;
use crate::guid::GUID;
use crate::key_value::NodeIdentity;

/// One decoded discovery sample, ready to be applied to the graph cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphEvent {
    /// A remote participant is alive (identity already resolved).
    ParticipantAlive { guid: GUID, identity: NodeIdentity },
    /// A publisher or subscriber endpoint is alive.
    EndpointAlive {
        guid: GUID,
        participant: GUID,
        topic_name: String,
        type_name: String,
        kind: EntityKind,
    },
    /// The instance is no longer alive (disposed, or no writers left).
    Gone { guid: GUID, kind: EntityKind },
}

impl GraphEvent {
    /// GUID the event refers to.
    pub fn guid(&self) -> GUID {
        match self {
            Self::ParticipantAlive { guid, .. }
            | Self::EndpointAlive { guid, .. }
            | Self::Gone { guid, .. } => *guid,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ParticipantAlive { .. } => EntityKind::Participant,
            Self::EndpointAlive { kind, .. } | Self::Gone { kind, .. } => *kind,
        }
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self, Self::Gone { .. })
    }
}

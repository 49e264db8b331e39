// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builtin discovery topic data, as delivered by the transport readers.

use crate::event::GraphEvent;
use crate::graph::EntityKind;
use crate::guid::{participant_guid_of, to_guid, BuiltinTopicKey, InstanceHandle};
use crate::key_value::NodeIdentity;
use crate::listener::{BuiltinReader, DiscoveryReader};

/// Instance state reported with each sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InstanceState {
    #[default]
    Alive,
    NotAliveDisposed,
    NotAliveNoWriters,
}

/// Per-sample metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SampleInfo {
    pub instance_handle: InstanceHandle,
    pub instance_state: InstanceState,
    /// False for dispose/unregister notifications that carry no payload.
    pub valid_data: bool,
}

impl SampleInfo {
    /// Sample with payload on an alive instance.
    pub fn alive(instance_handle: InstanceHandle) -> Self {
        Self {
            instance_handle,
            instance_state: InstanceState::Alive,
            valid_data: true,
        }
    }

    /// Payload-less notification that the instance went away.
    pub fn not_alive(instance_handle: InstanceHandle, instance_state: InstanceState) -> Self {
        Self {
            instance_handle,
            instance_state,
            valid_data: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.valid_data && self.instance_state == InstanceState::Alive
    }
}

/// One taken sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample<T> {
    pub data: T,
    pub info: SampleInfo,
}

/// DCPSParticipant sample.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticipantBuiltinTopicData {
    pub key: BuiltinTopicKey,
    /// Transport-level participant name (participant QoS), if any.
    pub participant_name: Option<String>,
    /// Raw USER_DATA bytes (`key=value;` list).
    pub user_data: Vec<u8>,
}

/// DCPSPublication sample.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicationBuiltinTopicData {
    pub key: BuiltinTopicKey,
    pub participant_key: BuiltinTopicKey,
    pub topic_name: String,
    pub type_name: String,
}

/// DCPSSubscription sample.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionBuiltinTopicData {
    pub key: BuiltinTopicKey,
    pub participant_key: BuiltinTopicKey,
    pub topic_name: String,
    pub type_name: String,
}

/// Data type of one of the three builtin discovery topics.
pub trait BuiltinTopicData: Sized + Send + Sync + 'static {
    /// Entity kind the topic announces.
    const KIND: EntityKind;
    /// Builtin topic name, used in logs.
    const TOPIC: &'static str;

    /// Narrow a generic discovery reader to this topic's typed reader.
    fn narrow(reader: &dyn DiscoveryReader) -> Option<&dyn BuiltinReader<Self>>;

    /// Event for an alive sample of instance `handle`.
    fn alive_event(&self, handle: &InstanceHandle) -> GraphEvent;
}

impl BuiltinTopicData for ParticipantBuiltinTopicData {
    const KIND: EntityKind = EntityKind::Participant;
    const TOPIC: &'static str = "DCPSParticipant";

    fn narrow(reader: &dyn DiscoveryReader) -> Option<&dyn BuiltinReader<Self>> {
        reader.as_participant_reader()
    }

    fn alive_event(&self, handle: &InstanceHandle) -> GraphEvent {
        GraphEvent::ParticipantAlive {
            guid: to_guid(handle),
            identity: NodeIdentity::resolve(&self.user_data, self.participant_name.as_deref()),
        }
    }
}

impl BuiltinTopicData for PublicationBuiltinTopicData {
    const KIND: EntityKind = EntityKind::Publisher;
    const TOPIC: &'static str = "DCPSPublication";

    fn narrow(reader: &dyn DiscoveryReader) -> Option<&dyn BuiltinReader<Self>> {
        reader.as_publication_reader()
    }

    fn alive_event(&self, handle: &InstanceHandle) -> GraphEvent {
        GraphEvent::EndpointAlive {
            guid: to_guid(handle),
            participant: participant_guid_of(&self.participant_key),
            topic_name: self.topic_name.clone(),
            type_name: self.type_name.clone(),
            kind: Self::KIND,
        }
    }
}

impl BuiltinTopicData for SubscriptionBuiltinTopicData {
    const KIND: EntityKind = EntityKind::Subscriber;
    const TOPIC: &'static str = "DCPSSubscription";

    fn narrow(reader: &dyn DiscoveryReader) -> Option<&dyn BuiltinReader<Self>> {
        reader.as_subscription_reader()
    }

    fn alive_event(&self, handle: &InstanceHandle) -> GraphEvent {
        GraphEvent::EndpointAlive {
            guid: to_guid(handle),
            participant: participant_guid_of(&self.participant_key),
            topic_name: self.topic_name.clone(),
            type_name: self.type_name.clone(),
            kind: Self::KIND,
        }
    }
}

/// Decode one sample into the event it implies for the cache.
///
/// Alive samples with data become adds; everything else is a removal keyed by
/// the sample's instance handle.
pub fn sample_event<T: BuiltinTopicData>(sample: &Sample<T>) -> GraphEvent {
    if sample.info.is_alive() {
        sample.data.alive_event(&sample.info.instance_handle)
    } else {
        GraphEvent::Gone {
            guid: to_guid(&sample.info.instance_handle),
            kind: T::KIND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GUID;

    #[test]
    fn participant_sample_resolves_identity() {
        let guid = GUID::participant([3; 12]);
        let sample = Sample {
            data: ParticipantBuiltinTopicData {
                key: BuiltinTopicKey::from_guid(&guid),
                participant_name: Some("pname".into()),
                user_data: b"namespace=/fleet;".to_vec(),
            },
            info: SampleInfo::alive(InstanceHandle::from_guid(&guid)),
        };

        match sample_event(&sample) {
            GraphEvent::ParticipantAlive { guid: got, identity } => {
                assert_eq!(got, guid);
                assert_eq!(identity.name.as_deref(), Some("pname"));
                assert_eq!(identity.namespace.as_deref(), Some("/fleet"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn publication_sample_carries_owner() {
        let owner = GUID::participant([4; 12]);
        let writer = GUID::new([4; 12], [0, 0, 1, 0x03]);
        let sample = Sample {
            data: PublicationBuiltinTopicData {
                key: BuiltinTopicKey::from_guid(&writer),
                participant_key: BuiltinTopicKey::from_guid(&owner),
                topic_name: "rt/chatter".into(),
                type_name: "std_msgs::msg::dds_::String_".into(),
            },
            info: SampleInfo::alive(InstanceHandle::from_guid(&writer)),
        };

        assert_eq!(
            sample_event(&sample),
            GraphEvent::EndpointAlive {
                guid: writer,
                participant: owner,
                topic_name: "rt/chatter".into(),
                type_name: "std_msgs::msg::dds_::String_".into(),
                kind: EntityKind::Publisher,
            }
        );
    }

    #[test]
    fn not_alive_or_invalid_data_is_removal() {
        let reader = GUID::new([5; 12], [0, 0, 2, 0x04]);
        let handle = InstanceHandle::from_guid(&reader);

        let disposed = Sample {
            data: SubscriptionBuiltinTopicData::default(),
            info: SampleInfo::not_alive(handle, InstanceState::NotAliveDisposed),
        };
        assert_eq!(
            sample_event(&disposed),
            GraphEvent::Gone {
                guid: reader,
                kind: EntityKind::Subscriber
            }
        );

        let alive_without_data = Sample {
            data: SubscriptionBuiltinTopicData::default(),
            info: SampleInfo {
                instance_handle: handle,
                instance_state: InstanceState::Alive,
                valid_data: false,
            },
        };
        assert!(!sample_event(&alive_without_data).is_alive());
    }
}

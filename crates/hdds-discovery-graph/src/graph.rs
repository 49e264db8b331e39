// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery graph cache.
//!
//! Holds every remote participant and endpoint currently alive according to
//! the builtin discovery readers, keyed by GUID and grouped by owning
//! participant. The local participant is pinned at construction and never
//! touched by discovery events.
//!
//! Listener threads mutate the cache while application threads query it, so
//! all state sits behind a single exclusive lock that is only held for the
//! in-memory update or copy.

use crate::event::GraphEvent;
use crate::guid::GUID;
use crate::key_value::NodeIdentity;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Kind of discoverable entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Participant,
    Publisher,
    Subscriber,
}

/// One discovered participant or endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    pub guid: GUID,
    /// Owning participant (the GUID itself for participant records).
    pub owning_participant_guid: GUID,
    pub topic_name: String,
    pub type_name: String,
    pub kind: EntityKind,
}

impl EntityRecord {
    fn participant(guid: GUID) -> Self {
        Self {
            guid,
            owning_participant_guid: guid,
            topic_name: String::new(),
            type_name: String::new(),
            kind: EntityKind::Participant,
        }
    }
}

/// Per-participant aggregate (identity + child endpoints).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub guid: GUID,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub enclave: Option<String>,
    /// Endpoint GUIDs owned by this participant.
    pub endpoints: BTreeSet<GUID>,
    placeholder: bool,
    local: bool,
    discovery_seq: u64,
}

impl ParticipantInfo {
    fn placeholder(guid: GUID) -> Self {
        Self {
            guid,
            name: None,
            namespace: None,
            enclave: None,
            endpoints: BTreeSet::new(),
            placeholder: true,
            local: false,
            discovery_seq: 0,
        }
    }

    /// Created from an endpoint sample; the participant itself was not seen yet.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// The pinned self-record.
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Has a non-empty resolved name.
    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }

    fn node_name(&self) -> Option<NodeName> {
        let name = self.name.as_deref().filter(|name| !name.is_empty())?;
        Some(NodeName {
            name: name.to_string(),
            namespace: self.namespace.clone().unwrap_or_default(),
        })
    }

    fn matches_node(&self, name: &str, namespace: &str) -> bool {
        self.name.as_deref() == Some(name) && self.namespace.as_deref().unwrap_or("") == namespace
    }
}

/// `(name, namespace)` pair as returned by node listings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeName {
    pub name: String,
    pub namespace: String,
}

impl NodeName {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// Topic name -> set of type names.
pub type NamesAndTypes = BTreeMap<String, BTreeSet<String>>;

/// Point-in-time copy of the whole cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub version: u64,
    /// Self-record first, then discovered participants in discovery order,
    /// then placeholder owners ordered by GUID. Every entity's owner is here.
    pub participants: Vec<ParticipantInfo>,
    /// Every record, ordered by GUID.
    pub entities: Vec<EntityRecord>,
}

struct GraphState {
    version: u64,
    next_seq: u64,
    local: ParticipantInfo,
    participants: HashMap<GUID, ParticipantInfo>,
    entities: HashMap<GUID, EntityRecord>,
}

impl GraphState {
    fn new(local: ParticipantInfo) -> Self {
        Self {
            version: 0,
            next_seq: 1,
            local,
            participants: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    fn is_local(&self, guid: &GUID) -> bool {
        self.local.guid == *guid
    }

    fn participant(&self, guid: &GUID) -> Option<&ParticipantInfo> {
        if self.is_local(guid) {
            Some(&self.local)
        } else {
            self.participants.get(guid)
        }
    }

    fn owner_entry(&mut self, owner: GUID) -> &mut ParticipantInfo {
        if self.local.guid == owner {
            &mut self.local
        } else {
            self.participants
                .entry(owner)
                .or_insert_with(|| ParticipantInfo::placeholder(owner))
        }
    }

    fn ordered_participants(&self) -> impl Iterator<Item = &ParticipantInfo> {
        let mut discovered: Vec<_> = self
            .participants
            .values()
            .filter(|info| !info.placeholder)
            .collect();
        discovered.sort_by_key(|info| info.discovery_seq);
        std::iter::once(&self.local).chain(discovered)
    }

    fn apply(&mut self, event: GraphEvent) -> bool {
        match event {
            GraphEvent::ParticipantAlive { guid, identity } => {
                self.add_participant(guid, identity)
            }
            GraphEvent::EndpointAlive {
                guid,
                participant,
                topic_name,
                type_name,
                kind,
            } => self.add_entity(guid, participant, topic_name, type_name, kind),
            GraphEvent::Gone { guid, kind } => self.remove_entity(guid, kind),
        }
    }

    fn add_participant(&mut self, guid: GUID, identity: NodeIdentity) -> bool {
        if self.is_local(&guid) {
            log::trace!("[graph] ignoring discovery sample for local participant {}", guid);
            return false;
        }

        let info = self
            .participants
            .entry(guid)
            .or_insert_with(|| ParticipantInfo::placeholder(guid));

        let mut changed = false;
        if info.placeholder {
            info.placeholder = false;
            info.discovery_seq = self.next_seq;
            self.next_seq += 1;
            changed = true;
        }
        if info.name != identity.name
            || info.namespace != identity.namespace
            || info.enclave != identity.enclave
        {
            info.name = identity.name;
            info.namespace = identity.namespace;
            info.enclave = identity.enclave;
            changed = true;
        }
        if changed {
            log::debug!(
                "[graph] participant {} name={:?} namespace={:?}",
                guid,
                info.name,
                info.namespace
            );
        }

        let record = EntityRecord::participant(guid);
        if self.entities.get(&guid) != Some(&record) {
            self.entities.insert(guid, record);
            changed = true;
        }

        if changed {
            self.version += 1;
        }
        changed
    }

    fn add_entity(
        &mut self,
        guid: GUID,
        owner: GUID,
        topic_name: String,
        type_name: String,
        kind: EntityKind,
    ) -> bool {
        if kind == EntityKind::Participant {
            let identity = self
                .participant(&guid)
                .map(|info| NodeIdentity {
                    name: info.name.clone(),
                    namespace: info.namespace.clone(),
                    enclave: info.enclave.clone(),
                })
                .unwrap_or_default();
            return self.add_participant(guid, identity);
        }

        let record = EntityRecord {
            guid,
            owning_participant_guid: owner,
            topic_name,
            type_name,
            kind,
        };

        let previous_owner = match self.entities.get(&guid) {
            Some(existing) if *existing == record => return false,
            Some(existing) => Some(existing.owning_participant_guid),
            None => None,
        };
        if let Some(previous_owner) = previous_owner.filter(|prev| *prev != owner) {
            self.detach_child(previous_owner, &guid);
        }

        self.owner_entry(owner).endpoints.insert(guid);
        log::debug!(
            "[graph] {:?} {} on '{}' ({}) owned by {}",
            kind,
            guid,
            record.topic_name,
            record.type_name,
            owner
        );
        self.entities.insert(guid, record);
        self.version += 1;
        true
    }

    fn remove_entity(&mut self, guid: GUID, kind: EntityKind) -> bool {
        // The stored record decides; the sample's kind only matters for a
        // participant known solely as a placeholder owner.
        let is_participant = match self.entities.get(&guid) {
            Some(record) => record.kind == EntityKind::Participant,
            None => kind == EntityKind::Participant,
        };

        let changed = if is_participant {
            self.remove_participant(guid)
        } else {
            self.remove_endpoint(guid)
        };

        if changed {
            self.version += 1;
        }
        changed
    }

    fn remove_participant(&mut self, guid: GUID) -> bool {
        if self.is_local(&guid) {
            return false;
        }

        let mut removed = self.entities.remove(&guid).is_some();
        if let Some(info) = self.participants.remove(&guid) {
            for child in &info.endpoints {
                self.entities.remove(child);
            }
            log::debug!(
                "[graph] participant {} gone ({} endpoints released)",
                guid,
                info.endpoints.len()
            );
            removed = true;
        }
        removed
    }

    fn remove_endpoint(&mut self, guid: GUID) -> bool {
        let Some(record) = self.entities.remove(&guid) else {
            return false;
        };
        self.detach_child(record.owning_participant_guid, &guid);
        log::debug!("[graph] {:?} {} gone", record.kind, guid);
        true
    }

    fn detach_child(&mut self, owner: GUID, child: &GUID) {
        if self.is_local(&owner) {
            self.local.endpoints.remove(child);
            return;
        }
        if let Some(info) = self.participants.get_mut(&owner) {
            info.endpoints.remove(child);
            if info.placeholder && info.endpoints.is_empty() {
                self.participants.remove(&owner);
            }
        }
    }

    fn clear(&mut self) -> usize {
        let released = self.entities.len();
        let had_state = released > 0 || !self.participants.is_empty();
        self.entities.clear();
        self.participants.clear();
        self.local.endpoints.clear();
        if had_state {
            self.version += 1;
        }
        released
    }
}

/// Concurrent discovery graph cache (see module docs).
pub struct DiscoveryGraphCache {
    local_guid: GUID,
    state: Mutex<GraphState>,
}

impl DiscoveryGraphCache {
    /// Create a cache with the local participant pinned as the self-record.
    pub fn new(local_guid: GUID, name: &str, namespace: &str) -> Self {
        Self::with_enclave(local_guid, name, namespace, None)
    }

    pub fn with_enclave(
        local_guid: GUID,
        name: &str,
        namespace: &str,
        enclave: Option<&str>,
    ) -> Self {
        let local = ParticipantInfo {
            guid: local_guid,
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            enclave: enclave.map(str::to_string),
            endpoints: BTreeSet::new(),
            placeholder: false,
            local: true,
            discovery_seq: 0,
        };

        Self {
            local_guid,
            state: Mutex::new(GraphState::new(local)),
        }
    }

    /// GUID of the pinned self-record.
    pub fn local_guid(&self) -> GUID {
        self.local_guid
    }

    /// Insert or overwrite an entity record.
    ///
    /// Unknown owners get a placeholder participant so endpoints are never
    /// orphaned. Returns `true` if the cache changed.
    pub fn add_entity(
        &self,
        guid: GUID,
        owning_participant_guid: GUID,
        topic_name: &str,
        type_name: &str,
        kind: EntityKind,
    ) -> bool {
        self.state.lock().add_entity(
            guid,
            owning_participant_guid,
            topic_name.to_string(),
            type_name.to_string(),
            kind,
        )
    }

    /// Create or update a discovered participant.
    pub fn add_participant(&self, guid: GUID, name: Option<&str>, namespace: Option<&str>) -> bool {
        let identity = NodeIdentity {
            name: name.map(str::to_string),
            namespace: namespace.map(str::to_string),
            enclave: None,
        };
        self.state.lock().add_participant(guid, identity)
    }

    /// Create or update a discovered participant from a resolved identity.
    pub fn add_participant_identity(&self, guid: GUID, identity: NodeIdentity) -> bool {
        self.state.lock().add_participant(guid, identity)
    }

    /// Remove an entity; participants cascade to their endpoints.
    ///
    /// Absent GUIDs are a silent no-op (duplicate not-alive samples are normal).
    pub fn remove_entity(&self, guid: GUID, kind: EntityKind) -> bool {
        self.state.lock().remove_entity(guid, kind)
    }

    /// Apply a single discovery event.
    pub fn apply(&self, event: GraphEvent) -> bool {
        self.state.lock().apply(event)
    }

    /// Apply events in delivery order under one lock acquisition.
    pub fn apply_batch<I>(&self, events: I) -> bool
    where
        I: IntoIterator<Item = GraphEvent>,
    {
        let mut guard = self.state.lock();
        let mut changed = false;
        for event in events {
            changed |= guard.apply(event);
        }
        changed
    }

    /// Self first, then every named discovered participant in discovery order.
    pub fn snapshot_named_participants(&self) -> Vec<NodeName> {
        let guard = self.state.lock();
        guard
            .ordered_participants()
            .filter_map(ParticipantInfo::node_name)
            .collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let guard = self.state.lock();
        let mut placeholders: Vec<_> = guard
            .participants
            .values()
            .filter(|info| info.placeholder)
            .cloned()
            .collect();
        placeholders.sort_by(|a, b| a.guid.cmp(&b.guid));
        let participants = guard
            .ordered_participants()
            .cloned()
            .chain(placeholders)
            .collect();
        let mut entities: Vec<_> = guard.entities.values().cloned().collect();
        entities.sort_by(|a, b| a.guid.cmp(&b.guid));

        GraphSnapshot {
            version: guard.version,
            participants,
            entities,
        }
    }

    pub fn contains(&self, guid: &GUID) -> bool {
        self.state.lock().entities.contains_key(guid)
    }

    pub fn entity(&self, guid: &GUID) -> Option<EntityRecord> {
        self.state.lock().entities.get(guid).cloned()
    }

    /// Participant aggregate (placeholders and the self-record included).
    pub fn participant(&self, guid: &GUID) -> Option<ParticipantInfo> {
        self.state.lock().participant(guid).cloned()
    }

    /// Number of entity records (the self-record is not counted).
    pub fn len(&self) -> usize {
        self.state.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Number of alive endpoints of `kind` on `topic`.
    pub fn count_endpoints(&self, topic: &str, kind: EntityKind) -> usize {
        self.state
            .lock()
            .entities
            .values()
            .filter(|record| record.kind == kind && record.topic_name == topic)
            .count()
    }

    /// Every topic with at least one endpoint, with the types seen on it.
    pub fn topic_names_and_types(&self) -> NamesAndTypes {
        let guard = self.state.lock();
        let mut topics = NamesAndTypes::new();
        for record in guard.entities.values() {
            if record.kind == EntityKind::Participant {
                continue;
            }
            topics
                .entry(record.topic_name.clone())
                .or_default()
                .insert(record.type_name.clone());
        }
        topics
    }

    /// Topics/types of `kind` endpoints owned by node `name` in `namespace`.
    ///
    /// Returns `None` when no such node is known.
    pub fn endpoints_by_node(
        &self,
        name: &str,
        namespace: &str,
        kind: EntityKind,
    ) -> Option<NamesAndTypes> {
        let guard = self.state.lock();
        let mut found = false;
        let mut topics = NamesAndTypes::new();

        for info in guard.ordered_participants() {
            if !info.matches_node(name, namespace) {
                continue;
            }
            found = true;
            for child in &info.endpoints {
                let Some(record) = guard.entities.get(child) else {
                    continue;
                };
                if record.kind == kind {
                    topics
                        .entry(record.topic_name.clone())
                        .or_default()
                        .insert(record.type_name.clone());
                }
            }
        }

        found.then_some(topics)
    }

    /// Release every discovered record; the self-record survives.
    pub fn clear(&self) -> usize {
        self.state.lock().clear()
    }
}

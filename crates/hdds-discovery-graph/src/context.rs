// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-node owner of the discovery graph.
//!
//! The middleware creates one context per node. It pins the node's own
//! identity in a fresh graph cache, owns the graph guard condition, and
//! hands out the discovery listeners and node handles that share them.

use crate::env_config::EnvConfig;
use crate::graph::{DiscoveryGraphCache, EntityKind};
use crate::guard::GraphGuardCondition;
use crate::guid::GUID;
use crate::key_value::{encode_key_value, KEY_ENCLAVE, KEY_NAME, KEY_NAMESPACE};
use crate::listener::{ParticipantListener, PublisherListener, SubscriberListener};
use crate::query::{NodeHandle, IMPLEMENTATION_IDENTIFIER};
use crate::{Error, Result};
use std::sync::Arc;

/// Graph context - owns the graph cache and the graph guard condition.
pub struct GraphContext {
    local_guid: GUID,
    name: String,
    namespace: String,
    config: EnvConfig,
    graph_cache: Arc<DiscoveryGraphCache>,
    graph_guard: Arc<GraphGuardCondition>,
}

impl GraphContext {
    /// Create a context with the default configuration.
    pub fn new(local_guid: GUID, name: &str, namespace: &str) -> Result<Arc<Self>> {
        Self::with_config(local_guid, name, namespace, EnvConfig::default())
    }

    /// Create a context; `name` must be non-empty and `namespace` absolute.
    pub fn with_config(
        local_guid: GUID,
        name: &str,
        namespace: &str,
        config: EnvConfig,
    ) -> Result<Arc<Self>> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("node name is empty".to_string()));
        }
        if !namespace.starts_with('/') {
            return Err(Error::InvalidArgument(format!(
                "node namespace '{}' must start with '/'",
                namespace
            )));
        }
        if local_guid.is_zero() {
            return Err(Error::InvalidArgument("local GUID is zero".to_string()));
        }

        let graph_cache = Arc::new(DiscoveryGraphCache::with_enclave(
            local_guid,
            name,
            namespace,
            config.enclave.as_deref(),
        ));

        log::info!(
            "[graph] context for node '{}' in '{}' (participant {}, domain {})",
            name,
            namespace,
            local_guid,
            config.domain_id
        );

        Ok(Arc::new(Self {
            local_guid,
            name: name.to_string(),
            namespace: namespace.to_string(),
            config,
            graph_cache,
            graph_guard: Arc::new(GraphGuardCondition::new()),
        }))
    }

    #[must_use]
    pub fn local_guid(&self) -> GUID {
        self.local_guid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Access the local graph cache.
    #[must_use]
    pub fn graph_cache(&self) -> Arc<DiscoveryGraphCache> {
        Arc::clone(&self.graph_cache)
    }

    #[must_use]
    pub fn graph_guard(&self) -> Arc<GraphGuardCondition> {
        Arc::clone(&self.graph_guard)
    }

    /// USER_DATA blob the local participant announces.
    #[must_use]
    pub fn user_data(&self) -> Vec<u8> {
        let mut pairs = vec![
            (KEY_NAME, self.name.as_bytes()),
            (KEY_NAMESPACE, self.namespace.as_bytes()),
        ];
        if let Some(enclave) = &self.config.enclave {
            pairs.push((KEY_ENCLAVE, enclave.as_bytes()));
        }
        encode_key_value(pairs)
    }

    #[must_use]
    pub fn participant_listener(&self) -> ParticipantListener {
        ParticipantListener::new(self.graph_cache(), self.graph_guard.clone())
            .with_take_limit(self.config.discovery_take_limit)
    }

    #[must_use]
    pub fn publisher_listener(&self) -> PublisherListener {
        PublisherListener::new(self.graph_cache(), self.graph_guard.clone())
            .with_take_limit(self.config.discovery_take_limit)
    }

    #[must_use]
    pub fn subscriber_listener(&self) -> SubscriberListener {
        SubscriberListener::new(self.graph_cache(), self.graph_guard.clone())
            .with_take_limit(self.config.discovery_take_limit)
    }

    /// Node handle for graph queries against this context.
    #[must_use]
    pub fn node_handle(self: &Arc<Self>) -> NodeHandle {
        NodeHandle {
            implementation_identifier: IMPLEMENTATION_IDENTIFIER,
            context: Arc::clone(self),
        }
    }

    /// Track a publisher or subscriber created by this node.
    pub fn register_local_endpoint(
        &self,
        guid: GUID,
        topic_name: &str,
        type_name: &str,
        kind: EntityKind,
    ) -> Result<()> {
        if kind == EntityKind::Participant {
            return Err(Error::InvalidArgument(
                "local endpoint cannot be a participant".to_string(),
            ));
        }
        if self
            .graph_cache
            .add_entity(guid, self.local_guid, topic_name, type_name, kind)
        {
            self.graph_guard.set_trigger_value(true);
        }
        Ok(())
    }

    pub fn unregister_local_endpoint(&self, guid: GUID, kind: EntityKind) {
        if self.graph_cache.remove_entity(guid, kind) {
            self.graph_guard.set_trigger_value(true);
        }
    }
}

impl Drop for GraphContext {
    fn drop(&mut self) {
        let released = self.graph_cache.clear();
        log::info!(
            "[graph] context for node '{}' closed ({} records released)",
            self.name,
            released
        );
    }
}

impl std::fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphContext")
            .field("local_guid", &self.local_guid)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests;

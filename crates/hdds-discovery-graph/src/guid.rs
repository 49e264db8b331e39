// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GUID codec for discovery samples.
//!
//! The transport reports entities through two native forms: the instance
//! handle attached to every sample (a 16-byte key hash with a length and a
//! validity flag) and the builtin topic key (four 32-bit words) carried inside
//! endpoint data to name the owning participant. Both are folded into the
//! canonical 16-byte [`GUID`] used as the graph cache key.

use std::fmt;

/// Entity id of a participant (RTPS `ENTITYID_PARTICIPANT`).
pub const ENTITYID_PARTICIPANT: [u8; 4] = [0x00, 0x00, 0x01, 0xC1];

/// RTPS GUID (Globally Unique Identifier)
///
/// 16-byte identifier: 12-byte prefix (participant) + 4-byte entity id.
/// Ordering is byte-wise over the prefix then the entity id, which is the
/// same as ordering the 16 raw bytes.
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.c1"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct GUID {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl GUID {
    /// Create GUID from raw bytes (16 bytes total)
    ///
    /// # Examples
    /// ```
    /// use hdds_discovery_graph::GUID;
    ///
    /// let bytes = [1, 15, 172, 16, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 193];
    /// let guid = GUID::from_bytes(bytes);
    /// assert!(guid.is_participant());
    /// ```
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Create GUID from separate prefix and entity ID
    pub fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    /// Participant GUID for a given prefix.
    pub fn participant(prefix: [u8; 12]) -> Self {
        Self::new(prefix, ENTITYID_PARTICIPANT)
    }

    /// Convert GUID to 16-byte array
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// Create GUID with all zeros (invalid/placeholder)
    pub fn zero() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    /// Check if GUID is zero (invalid)
    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }

    /// True when the entity id designates a participant.
    pub fn is_participant(&self) -> bool {
        self.entity_id == ENTITYID_PARTICIPANT
    }
}

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.prefix.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        for byte in &self.entity_id {
            write!(f, ".{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({})", self)
    }
}

/// Transport instance handle attached to each discovery sample.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceHandle {
    /// Key hash bytes (only the first `length` are meaningful).
    pub key_hash: [u8; 16],
    /// Number of valid bytes in `key_hash`.
    pub length: u32,
    /// Handle validity flag as reported by the transport.
    pub is_valid: bool,
}

impl InstanceHandle {
    /// Handle for a fully specified 16-byte key.
    pub fn from_guid(guid: &GUID) -> Self {
        Self {
            key_hash: guid.as_bytes(),
            length: 16,
            is_valid: true,
        }
    }

    /// The transport's `HANDLE_NIL`.
    pub fn nil() -> Self {
        Self::default()
    }
}

/// Builtin topic key as found in discovery data (`participant_key`, `key`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuiltinTopicKey {
    pub value: [u32; 4],
}

impl BuiltinTopicKey {
    /// Inverse of [`participant_guid_of`].
    pub fn from_guid(guid: &GUID) -> Self {
        let bytes = guid.as_bytes();
        let mut value = [0u32; 4];
        for (word, chunk) in value.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { value }
    }
}

/// Convert a sample instance handle into the cache GUID.
///
/// Invalid handles map to [`GUID::zero`]; short key hashes are zero-padded.
pub fn to_guid(handle: &InstanceHandle) -> GUID {
    if !handle.is_valid {
        return GUID::zero();
    }
    let len = (handle.length as usize).min(handle.key_hash.len());
    let mut bytes = [0u8; 16];
    bytes[..len].copy_from_slice(&handle.key_hash[..len]);
    GUID::from_bytes(bytes)
}

/// Extract the participant GUID from a builtin topic key (words are big-endian).
pub fn participant_guid_of(key: &BuiltinTopicKey) -> GUID {
    let mut bytes = [0u8; 16];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(key.value.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    GUID::from_bytes(bytes)
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant user-data key/value codec.
//!
//! ROS 2 nodes announce their identity in the participant USER_DATA QoS as a
//! flat `key=value;` list, e.g. `name=talker;namespace=/demo;`. Metadata is
//! advisory: decoding never returns an error. Input cut short after a complete
//! record keeps what was seen, and a malformed record discards the whole map.
//!
//! Framing rules:
//! - the key is one or more ASCII alphanumeric bytes up to the first `=`;
//! - the value runs up to a single `;`, and `;;` inside a value is a literal `;`;
//! - a NUL byte also terminates a record (NUL padding is ignored);
//! - the last duplicate key wins.
//!
//! An empty key, a non-alphanumeric key byte or an empty value makes the blob
//! malformed.

use std::collections::BTreeMap;

/// User-data key carrying the node name.
pub const KEY_NAME: &str = "name";
/// User-data key carrying the node namespace.
pub const KEY_NAMESPACE: &str = "namespace";
/// User-data key carrying the security enclave.
pub const KEY_ENCLAVE: &str = "enclave";

const SEPARATOR: u8 = b';';
const ASSIGN: u8 = b'=';
const NUL: u8 = 0;

/// Decode a user-data blob into a key -> value map.
///
/// Malformed input yields an empty map.
pub fn parse_key_value(data: &[u8]) -> BTreeMap<String, Vec<u8>> {
    match parse_records(data) {
        Some(map) => map,
        None => {
            log::debug!("[key_value] malformed user-data ({} bytes) ignored", data.len());
            BTreeMap::new()
        }
    }
}

fn parse_records(data: &[u8]) -> Option<BTreeMap<String, Vec<u8>>> {
    let mut map = BTreeMap::new();
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut key_found = false;
    let mut prev = NUL;

    for &byte in data {
        if byte == NUL {
            if key_found {
                commit(&mut map, &mut key, &mut value)?;
            }
            // A key cut off by NUL is dropped like a key cut off by end of input.
            key.clear();
            key_found = false;
            prev = NUL;
            continue;
        }

        if key_found {
            if byte == SEPARATOR && prev != SEPARATOR {
                prev = byte;
                continue;
            } else if byte != SEPARATOR && prev == SEPARATOR {
                commit(&mut map, &mut key, &mut value)?;
                key_found = false;
            } else if byte == SEPARATOR {
                // `;;` escape: keep one separator and re-arm.
                value.push(byte);
                prev = NUL;
                continue;
            } else {
                value.push(byte);
            }
        }

        if !key_found {
            if byte == ASSIGN {
                if key.is_empty() {
                    return None;
                }
                key_found = true;
            } else if byte.is_ascii_alphanumeric() {
                key.push(byte);
            } else {
                return None;
            }
        }
        prev = byte;
    }

    if key_found {
        commit(&mut map, &mut key, &mut value)?;
    }
    Some(map)
}

fn commit(
    map: &mut BTreeMap<String, Vec<u8>>,
    key: &mut Vec<u8>,
    value: &mut Vec<u8>,
) -> Option<()> {
    if value.is_empty() {
        return None;
    }
    // Keys are ASCII alphanumeric, so the conversion cannot fail.
    let key = String::from_utf8(std::mem::take(key)).ok()?;
    map.insert(key, std::mem::take(value));
    Some(())
}

/// Encode `key=value;` records, escaping `;` inside values.
///
/// Keys must not contain `=`, `;` or NUL; values must not contain NUL.
pub fn encode_key_value<'a, I>(pairs: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut out = Vec::new();
    for (key, value) in pairs {
        out.extend_from_slice(key.as_bytes());
        out.push(ASSIGN);
        for &byte in value {
            out.push(byte);
            if byte == SEPARATOR {
                out.push(SEPARATOR);
            }
        }
        out.push(SEPARATOR);
    }
    out
}

/// Node identity recovered from a participant announcement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Resolved node name; `None` means the participant is unnamed.
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub enclave: Option<String>,
}

impl NodeIdentity {
    /// Resolve the identity of a discovered participant.
    ///
    /// `name` comes from user-data; when absent or empty the transport-level
    /// participant name is used instead. If both are empty the participant is
    /// unnamed.
    pub fn resolve(user_data: &[u8], participant_name: Option<&str>) -> Self {
        let map = parse_key_value(user_data);
        let text = |key: &str| {
            map.get(key)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        };

        let name = text(KEY_NAME)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                participant_name
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            });

        Self {
            name,
            namespace: text(KEY_NAMESPACE),
            enclave: text(KEY_ENCLAVE),
        }
    }

    /// True when the identity would appear in node-name listings.
    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

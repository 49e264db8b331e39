// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for the discovery graph.
//!
//! - `HDDS_DOMAIN_ID`: DDS domain ID (default: 0, or ROS_DOMAIN_ID if set)
//! - `HDDS_LOG_LEVEL`: Logging level (default: "info")
//! - `HDDS_DISCOVERY_TAKE_LIMIT`: Max samples per discovery take (default: unlimited)
//!
//! ## ROS 2 Compatibility
//! - `ROS_DOMAIN_ID`: Fallback for HDDS_DOMAIN_ID
//! - `ROS_SECURITY_ENCLAVE`: Security enclave announced in participant user-data
//!
//! # Example
//!
//! ```bash
//! export HDDS_DOMAIN_ID=42
//! export HDDS_LOG_LEVEL=debug
//! export HDDS_DISCOVERY_TAKE_LIMIT=64
//! ```

use std::env;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "HDDS_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "HDDS_LOG_LEVEL";
pub const ENV_DISCOVERY_TAKE_LIMIT: &str = "HDDS_DISCOVERY_TAKE_LIMIT";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";
/// ROS 2 security enclave (compatibility)
pub const ENV_ROS_SECURITY_ENCLAVE: &str = "ROS_SECURITY_ENCLAVE";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// DDS domain ID (0-232)
    pub domain_id: u32,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// ROS 2 security enclave (for SROS2 compatibility)
    pub enclave: Option<String>,

    /// Max samples per builtin reader take; `None` takes everything available
    pub discovery_take_limit: Option<usize>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            enclave: None,
            discovery_take_limit: None,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. HDDS_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EnvConfig::from_env`] with a caller-supplied variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let domain_id = non_empty(ENV_DOMAIN_ID)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .or_else(|| {
                non_empty(ENV_ROS_DOMAIN_ID).and_then(|s| s.trim().parse::<u32>().ok())
            })
            .unwrap_or(0);

        let log_level = non_empty(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let enclave = non_empty(ENV_ROS_SECURITY_ENCLAVE);

        // 0 or garbage means unlimited
        let discovery_take_limit = non_empty(ENV_DISCOVERY_TAKE_LIMIT)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0);

        Self {
            domain_id,
            log_level,
            enclave,
            discovery_take_limit,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        *self != Self::default()
    }

    /// Parsed log level; unknown names fall back to `Info`.
    #[must_use]
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Install the `env_logger` backend at the configured level.
    ///
    /// `RUST_LOG` still overrides per-module filters. Returns `false` if a
    /// logger was already installed.
    pub fn init_logging(&self) -> bool {
        env_logger::Builder::new()
            .filter_level(self.level_filter())
            .parse_env("RUST_LOG")
            .format_timestamp_millis()
            .try_init()
            .is_ok()
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration of the operator.
//!
//! Every flag falls back to an environment variable so the operator can be
//! configured from a Deployment manifest alone.

use crate::cache::CacheConfig;
use crate::constants::{
    DEFAULT_CACHE_CLEAN_WINDOW_SECS, DEFAULT_CACHE_LIFE_WINDOW_SECS, DEFAULT_CACHE_MAX_BYTES,
    DEFAULT_CACHE_SHARDS, DEFAULT_METRICS_BIND_ADDRESS, DEFAULT_PROVIDER_CALL_TIMEOUT_SECS,
};
use crate::context::OperatorSettings;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Route53 DNS operator for Cluster API workload clusters
#[derive(Parser, Debug, Clone)]
#[command(name = "route53-dns-operator")]
#[command(version)]
pub struct OperatorArgs {
    /// Parent domain; each cluster gets the zone `<cluster>.<base-domain>`
    #[arg(long, env = "BASE_DOMAIN")]
    pub base_domain: String,

    /// Name of this management cluster, recorded in zone comments
    #[arg(long, env = "MANAGEMENT_CLUSTER")]
    pub management_cluster: String,

    /// Metrics server address
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Lifetime of a cache entry in seconds
    #[arg(long, env = "CACHE_LIFE_WINDOW_SECS", default_value_t = DEFAULT_CACHE_LIFE_WINDOW_SECS)]
    pub cache_life_window_secs: u64,

    /// Interval between sweeps of expired cache entries in seconds
    #[arg(long, env = "CACHE_CLEAN_WINDOW_SECS", default_value_t = DEFAULT_CACHE_CLEAN_WINDOW_SECS)]
    pub cache_clean_window_secs: u64,

    /// Number of cache shards, a power of two
    #[arg(long, env = "CACHE_SHARDS", default_value_t = DEFAULT_CACHE_SHARDS)]
    pub cache_shards: usize,

    /// Cache byte budget
    #[arg(long, env = "CACHE_MAX_BYTES", default_value_t = DEFAULT_CACHE_MAX_BYTES)]
    pub cache_max_bytes: usize,

    /// Deadline of a single Route53 call in seconds; 0 disables it
    #[arg(long, env = "PROVIDER_CALL_TIMEOUT_SECS", default_value_t = DEFAULT_PROVIDER_CALL_TIMEOUT_SECS)]
    pub provider_call_timeout_secs: u64,

    /// AWS region of the Route53 client; Route53 itself is global
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,
}

impl OperatorArgs {
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            shards: self.cache_shards,
            life_window: Duration::from_secs(self.cache_life_window_secs),
            clean_window: Duration::from_secs(self.cache_clean_window_secs),
            max_bytes: self.cache_max_bytes,
        }
    }

    #[must_use]
    pub fn settings(&self) -> OperatorSettings {
        OperatorSettings {
            base_domain: self.base_domain.clone(),
            management_cluster: self.management_cluster.clone(),
            provider_call_timeout: (self.provider_call_timeout_secs > 0)
                .then(|| Duration::from_secs(self.provider_call_timeout_secs)),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context passed to the cluster controller.
//!
//! One [`Context`] is built in `main` and shared by every reconciliation.
//! It holds the management cluster client, the Route53 client and DNS cache
//! shared by all clusters, the operator settings, and the per-cluster
//! throttling backoff state.

use crate::cache::DnsCache;
use crate::controller::retry::{throttle_backoff, ExponentialBackoff};
use crate::logging::TracingLogger;
use crate::provider::Route53Api;
use crate::route53::Route53Service;
use dashmap::DashMap;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;

/// Operator-wide settings every cluster is reconciled with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorSettings {
    /// Parent domain; cluster zones are `<cluster>.<base_domain>`
    pub base_domain: String,
    /// Name recorded in the comment of every zone this operator creates
    pub management_cluster: String,
    /// Deadline of a single Route53 call
    pub provider_call_timeout: Option<Duration>,
}

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for the management cluster
    pub client: Client,

    /// Route53 client shared by all clusters
    pub route53: Arc<dyn Route53Api>,

    /// DNS cache shared by all clusters
    pub cache: Arc<DnsCache>,

    pub settings: OperatorSettings,

    /// Requeue backoff of clusters currently being throttled
    pub throttle: Arc<ThrottleTracker>,
}

impl Context {
    #[must_use]
    pub fn new(
        client: Client,
        route53: Arc<dyn Route53Api>,
        cache: Arc<DnsCache>,
        settings: OperatorSettings,
    ) -> Self {
        Self {
            client,
            route53,
            cache,
            settings,
            throttle: Arc::new(ThrottleTracker::default()),
        }
    }

    /// Reconciliation engine whose log events carry `cluster`.
    #[must_use]
    pub fn engine(&self, cluster: &str) -> Route53Service {
        let engine = Route53Service::new(
            Arc::clone(&self.route53),
            Arc::clone(&self.cache),
            Arc::new(TracingLogger::new(cluster)),
        );
        match self.settings.provider_call_timeout {
            Some(timeout) => engine.with_call_timeout(timeout),
            None => engine,
        }
    }
}

/// Per-cluster exponential backoff for throttled reconciliations.
///
/// Keys are `<namespace>/<name>`. A cluster's entry exists only while it is
/// being throttled.
#[derive(Debug, Default)]
pub struct ThrottleTracker {
    backoffs: DashMap<String, ExponentialBackoff>,
}

impl ThrottleTracker {
    /// Next requeue delay of `key`, growing on every call.
    #[must_use]
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut backoff = self
            .backoffs
            .entry(key.to_string())
            .or_insert_with(throttle_backoff);
        backoff
            .next_backoff()
            .unwrap_or(backoff.max_interval)
    }

    /// Forget the backoff of `key` once it gets through.
    pub fn reset(&self, key: &str) {
        self.backoffs.remove(key);
    }

    #[must_use]
    pub fn is_throttled(&self, key: &str) -> bool {
        self.backoffs.contains_key(key)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;

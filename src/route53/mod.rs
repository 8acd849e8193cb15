// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route53 reconciliation engine.
//!
//! [`Route53Service`] converges a cluster's hosted zone, its delegation in the
//! base zone, and its address records. Both entry points are level-triggered:
//! every call starts from what the provider reports and resumes from wherever
//! a previous call stopped.
//!
//! ## Reconcile
//!
//! 1. Resolve or create the hosted zone `<cluster>.<base-domain>` ([`zones`])
//! 2. Mirror the zone's NS set into the base zone ([`delegation`])
//! 3. Upsert the API, bastion and ingress records, delete orphans ([`records`])
//!
//! ## Delete
//!
//! 1. Remove every non-apex record
//! 2. Remove the delegation from the base zone
//! 3. Delete the hosted zone
//!
//! Every provider call goes through [`Route53Service::call`], which applies the
//! per-call deadline and classifies failures.

pub mod delegation;
pub mod records;
pub mod zones;

use crate::cache::{CacheCategory, DnsCache};
use crate::dns_errors::{classify_provider_error, deadline_exceeded, ProviderError, Route53Error};
use crate::logging::DnsLogger;
use crate::provider::{normalize_fqdn, ChangeAction, Route53Api};
use crate::scope::ClusterScope;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Reconciliation engine for one provider account.
///
/// Cheap to share: the client, cache and logger are reference counted. The
/// engine takes no lock of its own; concurrent reconciliations of different
/// clusters only share the cache.
#[derive(Clone)]
pub struct Route53Service {
    client: Arc<dyn Route53Api>,
    cache: Arc<DnsCache>,
    logger: Arc<dyn DnsLogger>,
    call_timeout: Option<Duration>,
}

impl Route53Service {
    /// Engine without a per-call deadline
    #[must_use]
    pub fn new(
        client: Arc<dyn Route53Api>,
        cache: Arc<DnsCache>,
        logger: Arc<dyn DnsLogger>,
    ) -> Self {
        Self {
            client,
            cache,
            logger,
            call_timeout: None,
        }
    }

    /// Abandon any single provider call that runs longer than `timeout`
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Converge the cluster's zone, delegation and records.
    ///
    /// Safe to repeat. A second call with no external change issues no
    /// mutating provider call.
    ///
    /// # Errors
    ///
    /// Returns a classified [`Route53Error`]. Not-ready kinds mean "try again
    /// later" rather than failure; see [`Route53Error::is_not_ready`].
    pub async fn reconcile(&self, scope: &ClusterScope) -> Result<(), Route53Error> {
        let domain = scope.cluster_domain();
        self.logger
            .info("Reconciling cluster DNS", &[("domain", domain)]);

        let result = self.reconcile_zone(scope).await;
        if let Err(Route53Error::HostedZoneNotFound { zone }) = &result {
            if self.is_cluster_zone(zone, domain) {
                // The cached zone id points at a zone that no longer exists
                self.cache.delete(CacheCategory::HostedZoneId, domain);
            }
        }
        result
    }

    /// Whether `zone` (a name or an id) designates the cluster zone of `domain`.
    fn is_cluster_zone(&self, zone: &str, domain: &str) -> bool {
        if normalize_fqdn(zone) == normalize_fqdn(domain) {
            return true;
        }
        match self.cache.get_string(CacheCategory::HostedZoneId, domain) {
            Ok(cached) => cached.as_deref() == Some(zone),
            Err(_) => true,
        }
    }

    async fn reconcile_zone(&self, scope: &ClusterScope) -> Result<(), Route53Error> {
        let zone_id = self.ensure_cluster_zone(scope).await?;
        self.sync_delegation(scope, ChangeAction::Upsert, &zone_id)
            .await?;
        self.sync_records(scope, &zone_id).await
    }

    /// Tear down the cluster's records, delegation and zone.
    ///
    /// A domain without a hosted zone is already deleted; the call then
    /// succeeds without any mutating provider call.
    ///
    /// # Errors
    ///
    /// Returns a classified [`Route53Error`] for anything that is not already
    /// converged.
    pub async fn delete(&self, scope: &ClusterScope) -> Result<(), Route53Error> {
        let domain = scope.cluster_domain();
        self.logger.info("Deleting cluster DNS", &[("domain", domain)]);

        // Always look the zone up: a cached id may predate an external deletion
        let zone = match self.find_zone(domain).await {
            Ok(zone) => zone,
            Err(err) if err.is_hosted_zone_not_found() => {
                self.cache.delete(CacheCategory::HostedZoneId, domain);
                self.logger
                    .info("Hosted zone already deleted", &[("domain", domain)]);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.delete_cluster_records(scope, &zone.id).await?;
        self.sync_delegation(scope, ChangeAction::Delete, &zone.id)
            .await?;
        self.delete_zone(domain, &zone.id).await
    }

    /// Run one provider call under the deadline and classify its failure.
    pub(crate) async fn call<T, F>(
        &self,
        operation: &'static str,
        zone_id: Option<&str>,
        request: F,
    ) -> Result<T, Route53Error>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let result = match self.call_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, request).await {
                Ok(result) => result,
                Err(_) => return Err(deadline_exceeded(operation, zone_id)),
            },
            None => request.await,
        };
        result.map_err(|err| classify_provider_error(zone_id, err))
    }

    /// Populate the cache, tolerating a rejected entry.
    pub(crate) fn remember(&self, category: CacheCategory, suffix: &str, value: &str) {
        if let Err(err) = self.cache.set_string(category, suffix, value) {
            self.warn_cache_rejected(&err.to_string(), category, suffix);
        }
    }

    /// Populate the cache with a JSON value, tolerating a rejected entry.
    pub(crate) fn remember_json<T: Serialize + ?Sized>(
        &self,
        category: CacheCategory,
        suffix: &str,
        value: &T,
    ) {
        if let Err(err) = self.cache.set_json(category, suffix, value) {
            self.warn_cache_rejected(&err.to_string(), category, suffix);
        }
    }

    fn warn_cache_rejected(&self, error: &str, category: CacheCategory, suffix: &str) {
        self.logger.warn(
            "Cache rejected entry",
            &[("key", category.key(suffix).as_str()), ("error", error)],
        );
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! NS delegation of a cluster zone from the base zone.
//!
//! The base zone carries an NS record named after the cluster domain whose
//! values are exactly the cluster zone's apex NS values, in the order the
//! provider lists them.

use super::Route53Service;
use crate::cache::CacheCategory;
use crate::constants::RECORD_TTL_SECS;
use crate::dns_errors::Route53Error;
use crate::provider::operations::{CHANGE_RESOURCE_RECORD_SETS, LIST_RESOURCE_RECORD_SETS};
use crate::provider::{ChangeAction, ChangeBatch, RecordType, ResourceRecordSet};
use crate::scope::ClusterScope;

impl Route53Service {
    /// Upsert or delete the delegation of `child_zone_id` in the base zone.
    pub(crate) async fn sync_delegation(
        &self,
        scope: &ClusterScope,
        action: ChangeAction,
        child_zone_id: &str,
    ) -> Result<(), Route53Error> {
        let domain = scope.cluster_domain();
        let base_domain = scope.base_domain();

        let name_servers = match action {
            ChangeAction::Upsert => self.child_name_servers(child_zone_id, domain).await?,
            // Deletion must match the live values exactly
            ChangeAction::Delete => self.fresh_child_name_servers(child_zone_id, domain).await?,
        };

        let base_zone_id = match self.resolve_zone_id(base_domain).await {
            Ok(zone_id) => zone_id,
            Err(err) if err.is_hosted_zone_not_found() && action == ChangeAction::Delete => {
                self.logger.info(
                    "Base zone not found, nothing to undelegate",
                    &[("base_domain", base_domain)],
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let batch = delegation_batch(&base_zone_id, action, domain, name_servers);
        let fingerprint = batch.fingerprint();
        if action == ChangeAction::Upsert
            && self
                .cache
                .get_string(CacheCategory::DelegationFingerprint, domain)?
                .as_deref()
                == Some(fingerprint.as_str())
        {
            self.logger.debug(
                "Delegation unchanged, skipping",
                &[("domain", domain), ("base_zone_id", base_zone_id.as_str())],
            );
            return Ok(());
        }

        self.cache
            .delete(CacheCategory::DelegationFingerprint, domain);
        self.logger.info(
            "Synchronizing delegation",
            &[
                ("action", action.as_str()),
                ("domain", domain),
                ("base_zone_id", base_zone_id.as_str()),
            ],
        );

        match self
            .call(
                CHANGE_RESOURCE_RECORD_SETS,
                Some(base_zone_id.as_str()),
                self.client.change_resource_record_sets(&batch),
            )
            .await
        {
            Ok(()) => {}
            Err(err) if action == ChangeAction::Delete && err.is_not_found() => {
                self.logger
                    .debug("Delegation already removed", &[("domain", domain)]);
            }
            Err(err) if action == ChangeAction::Upsert && err.is_already_exists() => {
                self.logger
                    .debug("Delegation already present", &[("domain", domain)]);
            }
            Err(err) if err.is_hosted_zone_not_found() => {
                self.cache.delete(CacheCategory::HostedZoneId, base_domain);
                if action == ChangeAction::Delete {
                    return Ok(());
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        if action == ChangeAction::Upsert {
            self.remember(CacheCategory::DelegationFingerprint, domain, &fingerprint);
        }
        Ok(())
    }

    /// Apex NS values of the child zone, read through the cache.
    async fn child_name_servers(
        &self,
        zone_id: &str,
        domain: &str,
    ) -> Result<Vec<String>, Route53Error> {
        if let Some(servers) = self
            .cache
            .get_json::<Vec<String>>(CacheCategory::NameServers, zone_id)?
        {
            return Ok(servers);
        }

        let record_sets = self.zone_record_sets(zone_id).await?;
        let servers = apex_name_servers(&record_sets, domain).ok_or_else(|| {
            Route53Error::MissingNameServers {
                zone_id: zone_id.to_string(),
            }
        })?;
        self.remember_json(CacheCategory::NameServers, zone_id, &servers);
        Ok(servers)
    }

    async fn fresh_child_name_servers(
        &self,
        zone_id: &str,
        domain: &str,
    ) -> Result<Vec<String>, Route53Error> {
        let record_sets = self
            .call(
                LIST_RESOURCE_RECORD_SETS,
                Some(zone_id),
                self.client.list_resource_record_sets(zone_id),
            )
            .await?;
        apex_name_servers(&record_sets, domain).ok_or_else(|| Route53Error::MissingNameServers {
            zone_id: zone_id.to_string(),
        })
    }
}

/// Values of the NS set at the apex of `domain`, selected by type and name.
#[must_use]
pub fn apex_name_servers(record_sets: &[ResourceRecordSet], domain: &str) -> Option<Vec<String>> {
    record_sets
        .iter()
        .find(|set| set.record_type == RecordType::Ns && set.is_named(domain))
        .map(|set| set.values.clone())
        .filter(|values| !values.is_empty())
}

/// Single-change batch against the base zone delegating `domain`.
#[must_use]
pub fn delegation_batch(
    base_zone_id: &str,
    action: ChangeAction,
    domain: &str,
    name_servers: Vec<String>,
) -> ChangeBatch {
    let mut batch = ChangeBatch::new(base_zone_id);
    batch.push(
        action,
        ResourceRecordSet::new(domain, RecordType::Ns, Some(RECORD_TTL_SECS), name_servers),
    );
    batch
}

#[cfg(test)]
#[path = "delegation_tests.rs"]
mod delegation_tests;

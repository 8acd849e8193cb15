// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address records of a cluster zone.
//!
//! Managed records, relative to the cluster domain:
//!
//! | Name       | Type  | Present while                           |
//! |------------|-------|-----------------------------------------|
//! | `api`      | A     | always (AAAA or CNAME, see below)       |
//! | `bastion1` | A     | a bastion address is observed           |
//! | `ingress`  | A     | an ingress address is observed          |
//! | `*`        | CNAME | an ingress address is observed          |
//!
//! An IPv6 API endpoint is published as AAAA and a host name as CNAME.
//!
//! Each pass diffs the desired records against the zone snapshot and submits
//! at most one change batch.

use super::Route53Service;
use crate::cache::CacheCategory;
use crate::constants::{
    API_RECORD_LABEL, BASTION_RECORD_LABEL, INGRESS_RECORD_LABEL, RECORD_TTL_SECS,
    WILDCARD_RECORD_LABEL,
};
use crate::dns_errors::{classify_ingress_error, IngressError, Route53Error};
use crate::provider::operations::{CHANGE_RESOURCE_RECORD_SETS, LIST_RESOURCE_RECORD_SETS};
use crate::provider::{normalize_fqdn, ChangeBatch, RecordType, ResourceRecordSet};
use crate::scope::{ClusterScope, IngressAddress};
use std::net::IpAddr;

const AAAA: &str = "AAAA";

impl Route53Service {
    /// Every record set of `zone_id`, read through the cache.
    pub(crate) async fn zone_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<ResourceRecordSet>, Route53Error> {
        if let Some(record_sets) = self
            .cache
            .get_json::<Vec<ResourceRecordSet>>(CacheCategory::ZoneRecords, zone_id)?
        {
            return Ok(record_sets);
        }

        let record_sets = self
            .call(
                LIST_RESOURCE_RECORD_SETS,
                Some(zone_id),
                self.client.list_resource_record_sets(zone_id),
            )
            .await?;
        self.remember_json(CacheCategory::ZoneRecords, zone_id, &record_sets);
        Ok(record_sets)
    }

    /// Converge the address records of the cluster zone.
    ///
    /// Returns [`Route53Error::ServiceNotReady`] without touching records while
    /// the API endpoint is unknown. When the ingress has no address yet the
    /// remaining records are still converged and
    /// [`Route53Error::IngressNotReady`] is returned afterwards.
    pub(crate) async fn sync_records(
        &self,
        scope: &ClusterScope,
        zone_id: &str,
    ) -> Result<(), Route53Error> {
        let domain = scope.cluster_domain();
        let api_endpoint = scope.api_endpoint();
        if api_endpoint.is_empty() {
            self.logger.info(
                "API endpoint not assigned yet, deferring record changes",
                &[("domain", domain)],
            );
            return Err(Route53Error::ServiceNotReady {
                cluster: scope.name().to_string(),
                reason: "API endpoint is not assigned yet".to_string(),
            });
        }

        let (ingress_ip, pending) = match self.lookup_ingress(scope).await {
            Ok(IngressAddress::Installed(ip)) => (Some(ip), None),
            Ok(IngressAddress::NotInstalled) => (None, None),
            Err(err) => {
                let err = classify_ingress_error(scope.name(), err);
                if !err.is_not_ready() {
                    return Err(err);
                }
                self.logger.info(
                    "Ingress address not ready yet",
                    &[("domain", domain), ("reason", err.status_reason())],
                );
                (None, Some(err))
            }
        };

        let mut desired = core_records(domain, api_endpoint, scope.bastion_ip());
        let ingress = ingress_records(domain, ingress_ip.as_deref(), scope.cname_override());
        let ingress_fingerprint = ingress_fingerprint(zone_id, &ingress);
        let ingress_unchanged = match &ingress_fingerprint {
            Some(fingerprint) => {
                self.cache
                    .get_string(CacheCategory::IngressFingerprint, zone_id)?
                    .as_deref()
                    == Some(fingerprint.as_str())
            }
            None => false,
        };
        if !ingress_unchanged {
            desired.extend(ingress);
        }

        let existing = self.zone_record_sets(zone_id).await?;
        let orphans = orphaned_records(domain, scope.bastion_ip(), &existing);
        let batch = plan_record_changes(zone_id, &desired, &existing, orphans);

        if batch.is_empty() {
            self.logger
                .debug("Records up to date", &[("zone_id", zone_id)]);
        } else {
            let changes = batch.len().to_string();
            self.logger.info(
                "Applying record changes",
                &[("zone_id", zone_id), ("changes", changes.as_str())],
            );
            self.cache.delete(CacheCategory::ZoneRecords, zone_id);
            self.cache.delete(CacheCategory::IngressFingerprint, zone_id);
            self.call(
                CHANGE_RESOURCE_RECORD_SETS,
                Some(zone_id),
                self.client.change_resource_record_sets(&batch),
            )
            .await?;
        }

        if !ingress_unchanged {
            if let Some(fingerprint) = ingress_fingerprint {
                self.remember(CacheCategory::IngressFingerprint, zone_id, &fingerprint);
            }
        }

        pending.map_or(Ok(()), Err)
    }

    /// Ingress lookup under the per-call deadline. An expired deadline means
    /// the workload cluster is not reachable yet.
    async fn lookup_ingress(&self, scope: &ClusterScope) -> Result<IngressAddress, IngressError> {
        let Some(deadline) = self.call_timeout else {
            return scope.ingress().await;
        };
        match tokio::time::timeout(deadline, scope.ingress()).await {
            Ok(result) => result,
            Err(_) => Err(IngressError::WorkloadUnavailable {
                reason: format!("ingress lookup did not answer within {deadline:?}"),
            }),
        }
    }

    /// Remove every record except the apex NS and SOA sets.
    pub(crate) async fn delete_cluster_records(
        &self,
        scope: &ClusterScope,
        zone_id: &str,
    ) -> Result<(), Route53Error> {
        let domain = scope.cluster_domain();
        let existing = self
            .call(
                LIST_RESOURCE_RECORD_SETS,
                Some(zone_id),
                self.client.list_resource_record_sets(zone_id),
            )
            .await?;

        self.cache.delete(CacheCategory::ZoneRecords, zone_id);
        self.cache.delete(CacheCategory::IngressFingerprint, zone_id);

        let batch = plan_zone_cleanup(zone_id, domain, &existing);
        if batch.is_empty() {
            return Ok(());
        }

        let changes = batch.len().to_string();
        self.logger.info(
            "Deleting cluster records",
            &[("zone_id", zone_id), ("changes", changes.as_str())],
        );
        match self
            .call(
                CHANGE_RESOURCE_RECORD_SETS,
                Some(zone_id),
                self.client.change_resource_record_sets(&batch),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                self.logger
                    .debug("Records already deleted", &[("zone_id", zone_id)]);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// `<label>.<domain>` as a normalized FQDN
#[must_use]
pub fn record_fqdn(label: &str, domain: &str) -> String {
    normalize_fqdn(&format!("{label}.{domain}"))
}

/// API endpoint record, plus the bastion record when a bastion is observed.
///
/// An API endpoint that is a host name rather than an address is published
/// as a CNAME.
#[must_use]
pub fn core_records(
    domain: &str,
    api_endpoint: &str,
    bastion_ip: Option<&str>,
) -> Vec<ResourceRecordSet> {
    let api_name = record_fqdn(API_RECORD_LABEL, domain);
    let api = match api_endpoint.parse::<IpAddr>() {
        Ok(address) => address_record(&api_name, address),
        Err(_) => ResourceRecordSet::new(
            &api_name,
            RecordType::Cname,
            Some(RECORD_TTL_SECS),
            vec![normalize_fqdn(api_endpoint)],
        ),
    };

    let mut records = vec![api];
    if let Some(address) = bastion_ip.and_then(|ip| ip.parse::<IpAddr>().ok()) {
        records.push(address_record(
            &record_fqdn(BASTION_RECORD_LABEL, domain),
            address,
        ));
    }
    records
}

/// A record for an IPv4 address, AAAA for IPv6
fn address_record(name: &str, address: IpAddr) -> ResourceRecordSet {
    let record_type = match address {
        IpAddr::V4(_) => RecordType::A,
        IpAddr::V6(_) => RecordType::Other(AAAA.to_string()),
    };
    ResourceRecordSet::new(
        name,
        record_type,
        Some(RECORD_TTL_SECS),
        vec![address.to_string()],
    )
}

fn is_address_type(record_type: &RecordType) -> bool {
    match record_type {
        RecordType::A | RecordType::Cname => true,
        RecordType::Other(other) => other == AAAA,
        RecordType::Ns | RecordType::Soa => false,
    }
}

/// Ingress A record and wildcard CNAME, or nothing while no ingress address
/// is observed.
#[must_use]
pub fn ingress_records(
    domain: &str,
    ingress_ip: Option<&str>,
    cname_override: Option<&str>,
) -> Vec<ResourceRecordSet> {
    let Some(ip) = ingress_ip else {
        return Vec::new();
    };

    let ingress_name = record_fqdn(INGRESS_RECORD_LABEL, domain);
    let wildcard_target = cname_override.map_or_else(|| ingress_name.clone(), normalize_fqdn);
    vec![
        ResourceRecordSet::new(
            &ingress_name,
            RecordType::A,
            Some(RECORD_TTL_SECS),
            vec![ip.to_string()],
        ),
        ResourceRecordSet::new(
            &record_fqdn(WILDCARD_RECORD_LABEL, domain),
            RecordType::Cname,
            Some(RECORD_TTL_SECS),
            vec![wildcard_target],
        ),
    ]
}

fn ingress_fingerprint(zone_id: &str, ingress: &[ResourceRecordSet]) -> Option<String> {
    if ingress.is_empty() {
        return None;
    }
    let mut batch = ChangeBatch::new(zone_id);
    for record in ingress {
        batch.upsert(record.clone());
    }
    Some(batch.fingerprint())
}

/// The bastion record when no bastion is observed any more, with its exact
/// current values.
#[must_use]
pub fn orphaned_records(
    domain: &str,
    bastion_ip: Option<&str>,
    existing: &[ResourceRecordSet],
) -> Vec<ResourceRecordSet> {
    if bastion_ip.is_some() {
        return Vec::new();
    }
    let bastion_name = record_fqdn(BASTION_RECORD_LABEL, domain);
    existing
        .iter()
        .filter(|set| set.name == bastion_name && is_address_type(&set.record_type))
        .cloned()
        .collect()
}

/// Minimal batch turning `existing` into `desired` plus removal of `orphans`.
///
/// A desired record whose name currently holds an address record of another
/// type (A, AAAA or CNAME) replaces it in the same batch.
#[must_use]
pub fn plan_record_changes(
    zone_id: &str,
    desired: &[ResourceRecordSet],
    existing: &[ResourceRecordSet],
    orphans: Vec<ResourceRecordSet>,
) -> ChangeBatch {
    let mut batch = ChangeBatch::new(zone_id);

    for record in desired {
        for conflicting in existing.iter().filter(|set| {
            set.name == record.name
                && set.record_type != record.record_type
                && is_address_type(&set.record_type)
        }) {
            batch.delete(conflicting.clone());
        }

        let current = existing.iter().find(|set| set.same_identity(record));
        if current.is_none_or(|set| !same_content(set, record)) {
            batch.upsert(record.clone());
        }
    }

    for orphan in orphans {
        batch.delete(orphan);
    }
    batch
}

/// Batch deleting every record set except the apex NS and SOA sets.
///
/// Alias sets carry no values and cannot be deleted from a value list; they
/// are left alone.
#[must_use]
pub fn plan_zone_cleanup(
    zone_id: &str,
    domain: &str,
    existing: &[ResourceRecordSet],
) -> ChangeBatch {
    let mut batch = ChangeBatch::new(zone_id);
    for set in existing {
        let apex_managed =
            set.is_named(domain) && matches!(set.record_type, RecordType::Ns | RecordType::Soa);
        if !apex_managed && !set.values.is_empty() {
            batch.delete(set.clone());
        }
    }
    batch
}

fn same_content(current: &ResourceRecordSet, desired: &ResourceRecordSet) -> bool {
    if current.ttl != desired.ttl || current.values.len() != desired.values.len() {
        return false;
    }
    let mut current_values: Vec<String> = current
        .values
        .iter()
        .map(|v| v.trim_end_matches('.').to_ascii_lowercase())
        .collect();
    let mut desired_values: Vec<String> = desired
        .values
        .iter()
        .map(|v| v.trim_end_matches('.').to_ascii_lowercase())
        .collect();
    current_values.sort();
    desired_values.sort();
    current_values == desired_values
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted zone lookup, creation, attribution and deletion.

use super::Route53Service;
use crate::cache::CacheCategory;
use crate::constants::ZONE_COMMENT_PREFIX;
use crate::dns_errors::Route53Error;
use crate::provider::operations::{
    CREATE_HOSTED_ZONE, DELETE_HOSTED_ZONE, LIST_HOSTED_ZONES_BY_NAME, UPDATE_HOSTED_ZONE_COMMENT,
};
use crate::provider::{normalize_fqdn, CreateHostedZone, HostedZone};
use crate::scope::ClusterScope;
use chrono::{DateTime, Utc};

impl Route53Service {
    /// Find the hosted zone named exactly `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`Route53Error::HostedZoneNotFound`] when no zone matches exactly,
    /// even if the provider returned neighbouring zones.
    pub async fn find_zone(&self, domain: &str) -> Result<HostedZone, Route53Error> {
        let zones = self
            .call(
                LIST_HOSTED_ZONES_BY_NAME,
                None,
                self.client.list_hosted_zones_by_name(domain),
            )
            .await?;

        select_exact_zone(zones, domain).ok_or_else(|| Route53Error::HostedZoneNotFound {
            zone: domain.to_string(),
        })
    }

    /// Zone id of `domain`, read through the cache.
    pub(crate) async fn resolve_zone_id(&self, domain: &str) -> Result<String, Route53Error> {
        if let Some(zone_id) = self.cache.get_string(CacheCategory::HostedZoneId, domain)? {
            return Ok(zone_id);
        }
        let zone = self.find_zone(domain).await?;
        self.remember(CacheCategory::HostedZoneId, domain, &zone.id);
        Ok(zone.id)
    }

    /// Resolve the cluster zone, creating it when missing and healing its
    /// attribution comment. Returns the zone id.
    pub(crate) async fn ensure_cluster_zone(
        &self,
        scope: &ClusterScope,
    ) -> Result<String, Route53Error> {
        let domain = scope.cluster_domain();
        if let Some(zone_id) = self.cache.get_string(CacheCategory::HostedZoneId, domain)? {
            return Ok(zone_id);
        }

        let comment = zone_comment(scope.management_cluster());
        let zone = match self.find_zone(domain).await {
            Ok(zone) => zone,
            Err(err) if err.is_hosted_zone_not_found() => {
                self.create_zone(domain, comment.clone()).await?
            }
            Err(err) => return Err(err),
        };

        if let Some(expected) = &comment {
            self.ensure_zone_comment(&zone, expected).await?;
        }

        self.remember(CacheCategory::HostedZoneId, domain, &zone.id);
        Ok(zone.id)
    }

    async fn create_zone(
        &self,
        domain: &str,
        comment: Option<String>,
    ) -> Result<HostedZone, Route53Error> {
        let request = CreateHostedZone {
            name: domain.to_string(),
            caller_reference: caller_reference(Utc::now()),
            comment,
        };
        self.logger
            .info("Creating hosted zone", &[("domain", domain)]);

        match self
            .call(
                CREATE_HOSTED_ZONE,
                None,
                self.client.create_hosted_zone(&request),
            )
            .await
        {
            Ok(zone) => {
                self.logger.info(
                    "Created hosted zone",
                    &[("domain", domain), ("zone_id", zone.id.as_str())],
                );
                Ok(zone)
            }
            Err(err) if err.is_already_exists() => {
                self.logger.debug(
                    "Hosted zone was created concurrently, looking it up again",
                    &[("domain", domain)],
                );
                self.find_zone(domain).await
            }
            Err(err) => Err(err),
        }
    }

    async fn ensure_zone_comment(
        &self,
        zone: &HostedZone,
        expected: &str,
    ) -> Result<(), Route53Error> {
        if zone.comment.as_deref() == Some(expected) {
            return Ok(());
        }

        self.logger.info(
            "Updating hosted zone comment",
            &[("zone_id", zone.id.as_str()), ("comment", expected)],
        );
        self.call(
            UPDATE_HOSTED_ZONE_COMMENT,
            Some(zone.id.as_str()),
            self.client.update_hosted_zone_comment(&zone.id, expected),
        )
        .await
    }

    /// Delete the cluster zone and forget everything cached about it.
    pub(crate) async fn delete_zone(&self, domain: &str, zone_id: &str) -> Result<(), Route53Error> {
        self.logger.info(
            "Deleting hosted zone",
            &[("domain", domain), ("zone_id", zone_id)],
        );

        match self
            .call(
                DELETE_HOSTED_ZONE,
                Some(zone_id),
                self.client.delete_hosted_zone(zone_id),
            )
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_hosted_zone_not_found() => {
                self.logger
                    .debug("Hosted zone already deleted", &[("zone_id", zone_id)]);
            }
            Err(err) => return Err(err),
        }

        self.cache.delete(CacheCategory::HostedZoneId, domain);
        self.cache.delete(CacheCategory::ZoneRecords, zone_id);
        self.cache.delete(CacheCategory::NameServers, zone_id);
        self.cache.delete(CacheCategory::IngressFingerprint, zone_id);
        self.cache.delete(CacheCategory::DelegationFingerprint, domain);
        Ok(())
    }
}

/// The zone named exactly `domain`, ignoring case and trailing dot.
#[must_use]
pub fn select_exact_zone(zones: Vec<HostedZone>, domain: &str) -> Option<HostedZone> {
    let wanted = normalize_fqdn(domain);
    zones
        .into_iter()
        .find(|zone| normalize_fqdn(&zone.name) == wanted)
}

/// Attribution comment for zones owned by `management_cluster`.
#[must_use]
pub fn zone_comment(management_cluster: &str) -> Option<String> {
    if management_cluster.is_empty() {
        None
    } else {
        Some(format!("{ZONE_COMMENT_PREFIX}{management_cluster}"))
    }
}

/// Idempotency token of a zone creation: the UTC timestamp of the attempt.
#[must_use]
pub fn caller_reference(now: DateTime<Utc>) -> String {
    now.to_string()
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod zones_tests;

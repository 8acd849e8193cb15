// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route53 provider seam.
//!
//! [`Route53Api`] is the only way the reconciliation engine talks to the DNS
//! provider. [`aws::AwsRoute53Client`] implements it on top of
//! `aws-sdk-route53`; tests substitute an in-memory fake.
//!
//! The model types here are provider-neutral. Record names are kept as fully
//! qualified, lowercase names with a trailing dot, the way Route53 lists them.

pub mod aws;

use crate::constants::ESCAPED_WILDCARD;
use crate::dns_errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Provider operation names, used in errors, logs and metrics labels
pub mod operations {
    pub const LIST_HOSTED_ZONES_BY_NAME: &str = "ListHostedZonesByName";
    pub const CREATE_HOSTED_ZONE: &str = "CreateHostedZone";
    pub const UPDATE_HOSTED_ZONE_COMMENT: &str = "UpdateHostedZoneComment";
    pub const DELETE_HOSTED_ZONE: &str = "DeleteHostedZone";
    pub const LIST_RESOURCE_RECORD_SETS: &str = "ListResourceRecordSets";
    pub const CHANGE_RESOURCE_RECORD_SETS: &str = "ChangeResourceRecordSets";
}

/// A hosted zone as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id without the `/hostedzone/` prefix
    pub id: String,
    /// Fully qualified zone name with trailing dot
    pub name: String,
    /// Zone comment, used for management-cluster attribution
    pub comment: Option<String>,
    /// Number of record sets in the zone
    pub record_count: Option<i64>,
}

/// DNS record type.
///
/// The operator writes A, CNAME and NS records; SOA and anything else are
/// only ever read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Cname,
    Ns,
    Soa,
    Other(String),
}

impl RecordType {
    /// Wire name of the record type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
            Self::Ns => "NS",
            Self::Soa => "SOA",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "CNAME" => Self::Cname,
            "NS" => Self::Ns,
            "SOA" => Self::Soa,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of records of one type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Fully qualified name, lowercase, trailing dot
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// TTL in seconds; absent for alias records
    pub ttl: Option<i64>,
    /// Record values in provider order
    pub values: Vec<String>,
}

impl ResourceRecordSet {
    /// Build a record set, normalizing `name`.
    #[must_use]
    pub fn new(name: &str, record_type: RecordType, ttl: Option<i64>, values: Vec<String>) -> Self {
        Self {
            name: normalize_fqdn(name),
            record_type,
            ttl,
            values,
        }
    }

    /// Whether this set is named `fqdn` (compared after normalization)
    #[must_use]
    pub fn is_named(&self, fqdn: &str) -> bool {
        self.name == normalize_fqdn(fqdn)
    }

    /// Whether this set has the same name and type as `other`
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.record_type == other.record_type
    }
}

/// Kind of change applied to a record set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Upsert,
    Delete,
}

impl ChangeAction {
    /// Wire name of the action
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change in a [`ChangeBatch`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub record_set: ResourceRecordSet,
}

/// Ordered changes applied atomically to exactly one hosted zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    zone_id: String,
    changes: Vec<Change>,
}

impl ChangeBatch {
    /// Empty batch against `zone_id`
    #[must_use]
    pub fn new(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            changes: Vec::new(),
        }
    }

    /// Append an UPSERT of `record_set`
    pub fn upsert(&mut self, record_set: ResourceRecordSet) {
        self.push(ChangeAction::Upsert, record_set);
    }

    /// Append a DELETE of `record_set`
    pub fn delete(&mut self, record_set: ResourceRecordSet) {
        self.push(ChangeAction::Delete, record_set);
    }

    /// Append a change
    pub fn push(&mut self, action: ChangeAction, record_set: ResourceRecordSet) {
        self.changes.push(Change { action, record_set });
    }

    /// Zone this batch applies to
    #[must_use]
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Changes in submission order
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Stable SHA-256 digest of the zone id and changes, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.zone_id.as_bytes());
        for change in &self.changes {
            hasher.update(b"\n");
            hasher.update(change.action.as_str().as_bytes());
            hasher.update(b" ");
            hasher.update(change.record_set.name.as_bytes());
            hasher.update(b" ");
            hasher.update(change.record_set.record_type.as_str().as_bytes());
            hasher.update(b" ");
            hasher.update(change.record_set.ttl.unwrap_or_default().to_string().as_bytes());
            for value in &change.record_set.values {
                hasher.update(b" ");
                hasher.update(value.as_bytes());
            }
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

/// Parameters of a hosted zone creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostedZone {
    /// Domain name of the zone
    pub name: String,
    /// Idempotency token of the request
    pub caller_reference: String,
    /// Optional zone comment
    pub comment: Option<String>,
}

/// Route53 operations the engine relies on.
///
/// Implementations report failures as raw [`ProviderError`] values and never
/// interpret them. Zone ids are passed and returned without the
/// `/hostedzone/` prefix.
#[async_trait]
pub trait Route53Api: Send + Sync {
    /// Zones in name order starting at `dns_name`; the first entry may be a
    /// different zone when no exact match exists.
    async fn list_hosted_zones_by_name(&self, dns_name: &str)
        -> Result<Vec<HostedZone>, ProviderError>;

    /// Create a public hosted zone.
    async fn create_hosted_zone(
        &self,
        request: &CreateHostedZone,
    ) -> Result<HostedZone, ProviderError>;

    /// Replace the comment of a hosted zone.
    async fn update_hosted_zone_comment(
        &self,
        zone_id: &str,
        comment: &str,
    ) -> Result<(), ProviderError>;

    /// Delete an empty hosted zone.
    async fn delete_hosted_zone(&self, zone_id: &str) -> Result<(), ProviderError>;

    /// Every record set of a zone, following pagination to the end.
    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<ResourceRecordSet>, ProviderError>;

    /// Apply a change batch atomically.
    async fn change_resource_record_sets(&self, batch: &ChangeBatch)
        -> Result<(), ProviderError>;
}

/// Normalize a DNS name to lowercase, unescaped wildcard, trailing dot.
#[must_use]
pub fn normalize_fqdn(name: &str) -> String {
    let mut normalized = name.trim().replace(ESCAPED_WILDCARD, "*").to_ascii_lowercase();
    if !normalized.ends_with('.') {
        normalized.push('.');
    }
    normalized
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;

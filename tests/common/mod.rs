// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for engine integration tests
//!
//! [`FakeRoute53`] keeps hosted zones in memory and answers with the same error
//! codes and messages Route53 uses, so the real classifier runs unchanged.

#![allow(dead_code)]

use async_trait::async_trait;
use route53_dns_operator::cache::{CacheConfig, DnsCache};
use route53_dns_operator::dns_errors::ProviderError;
use route53_dns_operator::logging::{DnsLogger, LogLevel};
use route53_dns_operator::provider::operations::{
    CHANGE_RESOURCE_RECORD_SETS, CREATE_HOSTED_ZONE, DELETE_HOSTED_ZONE,
    LIST_HOSTED_ZONES_BY_NAME, LIST_RESOURCE_RECORD_SETS, UPDATE_HOSTED_ZONE_COMMENT,
};
use route53_dns_operator::provider::{
    normalize_fqdn, ChangeAction, ChangeBatch, CreateHostedZone, HostedZone, RecordType,
    ResourceRecordSet, Route53Api,
};
use route53_dns_operator::route53::Route53Service;
use route53_dns_operator::scope::{ClusterScope, ClusterScopeParams, IngressAddress, IngressResolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const BASE_DOMAIN: &str = "example.com";
pub const MANAGEMENT_CLUSTER: &str = "mgmt";

const MUTATING_OPERATIONS: &[&str] = &[
    CREATE_HOSTED_ZONE,
    UPDATE_HOSTED_ZONE_COMMENT,
    DELETE_HOSTED_ZONE,
    CHANGE_RESOURCE_RECORD_SETS,
];

#[derive(Clone, Debug)]
struct FakeZone {
    id: String,
    name: String,
    comment: Option<String>,
    records: Vec<ResourceRecordSet>,
}

#[derive(Default)]
struct State {
    zones: Vec<FakeZone>,
    next_zone: usize,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, Vec<ProviderError>>,
    batches: Vec<ChangeBatch>,
    name_servers: Vec<String>,
}

/// In-memory Route53 with call counters and one-shot failure injection.
#[derive(Clone)]
pub struct FakeRoute53 {
    state: Arc<Mutex<State>>,
}

impl Default for FakeRoute53 {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRoute53 {
    /// Fake whose new zones get `ns1.fake-dns.net.` .. `ns4.fake-dns.net.`
    pub fn new() -> Self {
        Self::with_name_servers(&[
            "ns1.fake-dns.net.",
            "ns2.fake-dns.net.",
            "ns3.fake-dns.net.",
            "ns4.fake-dns.net.",
        ])
    }

    pub fn with_name_servers(name_servers: &[&str]) -> Self {
        let state = State {
            name_servers: name_servers.iter().map(ToString::to_string).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Seed a zone directly, bypassing counters. Returns its id.
    pub fn seed_zone(&self, name: &str, comment: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        insert_zone(&mut state, name, comment.map(ToString::to_string)).id
    }

    /// Seed a record set into an existing zone, bypassing counters.
    pub fn seed_record(&self, zone_id: &str, record: ResourceRecordSet) {
        let mut state = self.state.lock().unwrap();
        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .expect("seeded zone exists");
        upsert(&mut zone.records, record);
    }

    /// Remove a zone behind the engine's back.
    pub fn remove_zone_externally(&self, zone_id: &str) {
        self.state.lock().unwrap().zones.retain(|z| z.id != zone_id);
    }

    /// Remove a record set behind the engine's back.
    pub fn remove_record_externally(&self, zone_id: &str, name: &str, record_type: RecordType) {
        let mut state = self.state.lock().unwrap();
        if let Some(zone) = state.zones.iter_mut().find(|z| z.id == zone_id) {
            let name = normalize_fqdn(name);
            zone.records
                .retain(|r| !(r.name == name && r.record_type == record_type));
        }
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push(error);
    }

    /// Make the next call of `operation` fail with a service error `code`.
    pub fn fail_next_with_code(&self, operation: &'static str, code: &str, message: &str) {
        self.fail_next(
            operation,
            ProviderError::Service {
                operation,
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn mutating_calls(&self) -> usize {
        MUTATING_OPERATIONS.iter().map(|op| self.calls(op)).sum()
    }

    pub fn list_calls(&self) -> usize {
        self.calls(LIST_HOSTED_ZONES_BY_NAME) + self.calls(LIST_RESOURCE_RECORD_SETS)
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.batches.clear();
    }

    /// Change batches accepted so far
    pub fn batches(&self) -> Vec<ChangeBatch> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn zone_id(&self, name: &str) -> Option<String> {
        let wanted = normalize_fqdn(name);
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|z| z.name == wanted)
            .map(|z| z.id.clone())
    }

    pub fn zone_count(&self, name: &str) -> usize {
        let wanted = normalize_fqdn(name);
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .filter(|z| z.name == wanted)
            .count()
    }

    pub fn zone_comment(&self, zone_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .and_then(|z| z.comment.clone())
    }

    /// Record set `name`/`record_type` of a zone, if present.
    pub fn record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Option<ResourceRecordSet> {
        let name = normalize_fqdn(name);
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .and_then(|z| {
                z.records
                    .iter()
                    .find(|r| r.name == name && r.record_type == record_type)
                    .cloned()
            })
    }

    pub fn records(&self, zone_id: &str) -> Vec<ResourceRecordSet> {
        self.state
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.records.clone())
            .unwrap_or_default()
    }

    fn begin(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(queue) = state.failures.get_mut(operation) {
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }
        Ok(state)
    }
}

fn insert_zone(state: &mut State, name: &str, comment: Option<String>) -> FakeZone {
    state.next_zone += 1;
    let id = format!("Z{:04}", state.next_zone);
    let name = normalize_fqdn(name);
    let zone = FakeZone {
        records: vec![
            ResourceRecordSet::new(
                &name,
                RecordType::Soa,
                Some(900),
                vec![format!(
                    "{} awsdns-hostmaster.amazon.com. 1 7200 900 1209600 86400",
                    state.name_servers.first().cloned().unwrap_or_default()
                )],
            ),
            ResourceRecordSet::new(&name, RecordType::Ns, Some(172_800), state.name_servers.clone()),
        ],
        id,
        name,
        comment,
    };
    state.zones.push(zone.clone());
    zone
}

fn upsert(records: &mut Vec<ResourceRecordSet>, record: ResourceRecordSet) {
    match records.iter_mut().find(|r| r.same_identity(&record)) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

fn service_error(operation: &'static str, code: &str, message: String) -> ProviderError {
    ProviderError::Service {
        operation,
        code: code.to_string(),
        message,
    }
}

fn no_such_zone(operation: &'static str, zone_id: &str) -> ProviderError {
    service_error(
        operation,
        "NoSuchHostedZone",
        format!("No hosted zone found with ID: {zone_id}"),
    )
}

fn to_hosted_zone(zone: &FakeZone) -> HostedZone {
    HostedZone {
        id: zone.id.clone(),
        name: zone.name.clone(),
        comment: zone.comment.clone(),
        record_count: Some(zone.records.len() as i64),
    }
}

#[async_trait]
impl Route53Api for FakeRoute53 {
    async fn list_hosted_zones_by_name(
        &self,
        dns_name: &str,
    ) -> Result<Vec<HostedZone>, ProviderError> {
        let state = self.begin(LIST_HOSTED_ZONES_BY_NAME)?;
        let start = normalize_fqdn(dns_name);
        let mut zones: Vec<HostedZone> = state
            .zones
            .iter()
            .filter(|z| z.name >= start)
            .map(to_hosted_zone)
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn create_hosted_zone(
        &self,
        request: &CreateHostedZone,
    ) -> Result<HostedZone, ProviderError> {
        let mut state = self.begin(CREATE_HOSTED_ZONE)?;
        let name = normalize_fqdn(&request.name);
        if state.zones.iter().any(|z| z.name == name) {
            return Err(service_error(
                CREATE_HOSTED_ZONE,
                "HostedZoneAlreadyExists",
                format!("A hosted zone has already been created with the specified caller reference for {name}"),
            ));
        }
        let zone = insert_zone(&mut state, &name, request.comment.clone());
        Ok(to_hosted_zone(&zone))
    }

    async fn update_hosted_zone_comment(
        &self,
        zone_id: &str,
        comment: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.begin(UPDATE_HOSTED_ZONE_COMMENT)?;
        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| no_such_zone(UPDATE_HOSTED_ZONE_COMMENT, zone_id))?;
        zone.comment = Some(comment.to_string());
        Ok(())
    }

    async fn delete_hosted_zone(&self, zone_id: &str) -> Result<(), ProviderError> {
        let mut state = self.begin(DELETE_HOSTED_ZONE)?;
        let zone = state
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| no_such_zone(DELETE_HOSTED_ZONE, zone_id))?;
        let non_apex = zone.records.iter().any(|r| {
            !(r.name == zone.name && matches!(r.record_type, RecordType::Ns | RecordType::Soa))
        });
        if non_apex {
            return Err(service_error(
                DELETE_HOSTED_ZONE,
                "HostedZoneNotEmpty",
                "The hosted zone contains resource records that are not SOA or NS records."
                    .to_string(),
            ));
        }
        state.zones.retain(|z| z.id != zone_id);
        Ok(())
    }

    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let state = self.begin(LIST_RESOURCE_RECORD_SETS)?;
        state
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.records.clone())
            .ok_or_else(|| no_such_zone(LIST_RESOURCE_RECORD_SETS, zone_id))
    }

    async fn change_resource_record_sets(&self, batch: &ChangeBatch) -> Result<(), ProviderError> {
        let mut state = self.begin(CHANGE_RESOURCE_RECORD_SETS)?;
        let zone_id = batch.zone_id().to_string();
        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| no_such_zone(CHANGE_RESOURCE_RECORD_SETS, &zone_id))?;

        // All or nothing
        let mut records = zone.records.clone();
        for change in batch.changes() {
            let set = &change.record_set;
            match change.action {
                ChangeAction::Upsert => upsert(&mut records, set.clone()),
                ChangeAction::Delete => {
                    let Some(index) = records.iter().position(|r| r.same_identity(set)) else {
                        return Err(service_error(
                            CHANGE_RESOURCE_RECORD_SETS,
                            "InvalidChangeBatch",
                            format!(
                                "[Tried to delete resource record set [name='{}', type='{}'] but it was not found]",
                                set.name, set.record_type
                            ),
                        ));
                    };
                    if records[index].ttl != set.ttl || records[index].values != set.values {
                        return Err(service_error(
                            CHANGE_RESOURCE_RECORD_SETS,
                            "InvalidChangeBatch",
                            format!(
                                "[Tried to delete resource record set [name='{}', type='{}'] but the values provided do not match the current values]",
                                set.name, set.record_type
                            ),
                        ));
                    }
                    records.remove(index);
                }
            }
        }
        zone.records = records;
        state.batches.push(batch.clone());
        Ok(())
    }
}

/// Logger that keeps every event for assertions.
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl DnsLogger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, _fields: &[(&str, &str)]) {
        self.events.lock().unwrap().push((level, message.to_string()));
    }
}

/// Ingress resolver whose answer tests can change between reconciliations.
#[derive(Default)]
pub struct SwitchableIngress {
    answer: Mutex<Option<Result<IngressAddress, route53_dns_operator::dns_errors::IngressError>>>,
}

impl SwitchableIngress {
    pub fn set(&self, answer: Result<IngressAddress, route53_dns_operator::dns_errors::IngressError>) {
        *self.answer.lock().unwrap() = Some(answer);
    }
}

#[async_trait]
impl IngressResolver for SwitchableIngress {
    async fn resolve(
        &self,
    ) -> Result<IngressAddress, route53_dns_operator::dns_errors::IngressError> {
        self.answer
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(IngressAddress::NotInstalled))
    }
}

/// Ingress resolver that never answers, like a workload API that swallows
/// connections.
pub struct HangingIngress;

#[async_trait]
impl IngressResolver for HangingIngress {
    async fn resolve(
        &self,
    ) -> Result<IngressAddress, route53_dns_operator::dns_errors::IngressError> {
        std::future::pending().await
    }
}

pub fn default_cache() -> Arc<DnsCache> {
    Arc::new(DnsCache::new(CacheConfig::default()).unwrap())
}

pub fn engine(fake: &FakeRoute53, cache: Arc<DnsCache>) -> (Route53Service, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let engine = Route53Service::new(Arc::new(fake.clone()), cache, logger.clone());
    (engine, logger)
}

/// Scope of cluster `name` under [`BASE_DOMAIN`].
pub fn scope(
    name: &str,
    api_endpoint: &str,
    bastion_ip: Option<&str>,
    ingress: Arc<dyn IngressResolver>,
) -> ClusterScope {
    ClusterScope::new(ClusterScopeParams {
        name: name.to_string(),
        base_domain: BASE_DOMAIN.to_string(),
        management_cluster: MANAGEMENT_CLUSTER.to_string(),
        api_endpoint: api_endpoint.to_string(),
        bastion_ip: bastion_ip.map(ToString::to_string),
        cname_override: None,
        ingress,
    })
    .unwrap()
}

pub fn fixed_ingress(ip: &str) -> Arc<dyn IngressResolver> {
    Arc::new(IngressAddress::Installed(ip.to_string()))
}

pub fn no_ingress() -> Arc<dyn IngressResolver> {
    Arc::new(IngressAddress::NotInstalled)
}

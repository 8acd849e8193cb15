// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`Route53Api`] implementation backed by `aws-sdk-route53`.
//!
//! SDK failures are converted to raw [`ProviderError`] values: service errors
//! keep their error code and message, transport failures keep their kind.
//! Nothing here decides what an error means for reconciliation.

use super::operations::{
    CHANGE_RESOURCE_RECORD_SETS, CREATE_HOSTED_ZONE, DELETE_HOSTED_ZONE,
    LIST_HOSTED_ZONES_BY_NAME, LIST_RESOURCE_RECORD_SETS, UPDATE_HOSTED_ZONE_COMMENT,
};
use super::{
    normalize_fqdn, ChangeAction, ChangeBatch, CreateHostedZone, HostedZone, RecordType,
    ResourceRecordSet, Route53Api,
};
use crate::constants::HOSTED_ZONE_ID_PREFIX;
use crate::dns_errors::ProviderError;
use crate::metrics;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_route53::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::operation::change_resource_record_sets::ChangeResourceRecordSetsError;
use aws_sdk_route53::types as sdk;
use std::time::Instant;
use tracing::debug;

/// Route53 client over the AWS SDK.
#[derive(Clone, Debug)]
pub struct AwsRoute53Client {
    client: aws_sdk_route53::Client,
}

impl AwsRoute53Client {
    /// Wrap an already configured SDK client
    #[must_use]
    pub fn new(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (environment, profile,
    /// web identity). `region` overrides the resolved region.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        Self::new(aws_sdk_route53::Client::new(&sdk_config))
    }
}

#[async_trait]
impl Route53Api for AwsRoute53Client {
    async fn list_hosted_zones_by_name(
        &self,
        dns_name: &str,
    ) -> Result<Vec<HostedZone>, ProviderError> {
        let start = Instant::now();
        let result = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(dns_name)
            .send()
            .await
            .map(|output| output.hosted_zones().iter().map(convert_zone).collect())
            .map_err(|e| provider_error(LIST_HOSTED_ZONES_BY_NAME, e));
        observe(LIST_HOSTED_ZONES_BY_NAME, start, &result);
        result
    }

    async fn create_hosted_zone(
        &self,
        request: &CreateHostedZone,
    ) -> Result<HostedZone, ProviderError> {
        let start = Instant::now();
        let mut call = self
            .client
            .create_hosted_zone()
            .name(&request.name)
            .caller_reference(&request.caller_reference);
        if let Some(comment) = &request.comment {
            call = call
                .hosted_zone_config(sdk::HostedZoneConfig::builder().comment(comment).build());
        }

        let result = match call.send().await {
            Ok(output) => output.hosted_zone().map(convert_zone).ok_or(ProviderError::Other {
                operation: CREATE_HOSTED_ZONE,
                message: "response carried no hosted zone".to_string(),
            }),
            Err(e) => Err(provider_error(CREATE_HOSTED_ZONE, e)),
        };
        observe(CREATE_HOSTED_ZONE, start, &result);
        result
    }

    async fn update_hosted_zone_comment(
        &self,
        zone_id: &str,
        comment: &str,
    ) -> Result<(), ProviderError> {
        let start = Instant::now();
        let result = self
            .client
            .update_hosted_zone_comment()
            .id(zone_id)
            .comment(comment)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| provider_error(UPDATE_HOSTED_ZONE_COMMENT, e));
        observe(UPDATE_HOSTED_ZONE_COMMENT, start, &result);
        result
    }

    async fn delete_hosted_zone(&self, zone_id: &str) -> Result<(), ProviderError> {
        let start = Instant::now();
        let result = self
            .client
            .delete_hosted_zone()
            .id(zone_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| provider_error(DELETE_HOSTED_ZONE, e));
        observe(DELETE_HOSTED_ZONE, start, &result);
        result
    }

    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let start = Instant::now();
        let result = self.list_all_record_sets(zone_id).await;
        observe(LIST_RESOURCE_RECORD_SETS, start, &result);
        result
    }

    async fn change_resource_record_sets(&self, batch: &ChangeBatch) -> Result<(), ProviderError> {
        let start = Instant::now();
        let result = match to_sdk_change_batch(batch) {
            Ok(change_batch) => self
                .client
                .change_resource_record_sets()
                .hosted_zone_id(batch.zone_id())
                .change_batch(change_batch)
                .send()
                .await
                .map(|output| {
                    if let Some(info) = output.change_info() {
                        debug!(
                            change_id = info.id(),
                            status = info.status().as_str(),
                            "Change batch accepted"
                        );
                    }
                })
                .map_err(change_batch_error),
            Err(e) => Err(ProviderError::Construction {
                operation: CHANGE_RESOURCE_RECORD_SETS,
                message: e.to_string(),
            }),
        };
        observe(CHANGE_RESOURCE_RECORD_SETS, start, &result);
        result
    }
}

impl AwsRoute53Client {
    async fn list_all_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let mut record_sets = Vec::new();
        let mut next: Option<(String, sdk::RrType, Option<String>)> = None;

        loop {
            let mut call = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id);
            if let Some((name, record_type, identifier)) = next.take() {
                call = call
                    .start_record_name(name)
                    .start_record_type(record_type)
                    .set_start_record_identifier(identifier);
            }

            let output = call
                .send()
                .await
                .map_err(|e| provider_error(LIST_RESOURCE_RECORD_SETS, e))?;
            record_sets.extend(output.resource_record_sets().iter().map(convert_record_set));

            if !output.is_truncated() {
                break;
            }
            match (output.next_record_name(), output.next_record_type()) {
                (Some(name), Some(record_type)) => {
                    next = Some((
                        name.to_string(),
                        record_type.clone(),
                        output.next_record_identifier().map(str::to_string),
                    ));
                }
                _ => break,
            }
        }

        debug!(
            zone_id = zone_id,
            count = record_sets.len(),
            "Listed resource record sets"
        );
        Ok(record_sets)
    }
}

/// Strip the `/hostedzone/` prefix Route53 puts on zone ids.
#[must_use]
pub fn strip_zone_id_prefix(id: &str) -> &str {
    id.strip_prefix(HOSTED_ZONE_ID_PREFIX).unwrap_or(id)
}

fn convert_zone(zone: &sdk::HostedZone) -> HostedZone {
    HostedZone {
        id: strip_zone_id_prefix(zone.id()).to_string(),
        name: normalize_fqdn(zone.name()),
        comment: zone
            .config()
            .and_then(|config| config.comment())
            .map(str::to_string),
        record_count: zone.resource_record_set_count(),
    }
}

fn convert_record_set(record_set: &sdk::ResourceRecordSet) -> ResourceRecordSet {
    ResourceRecordSet::new(
        record_set.name(),
        RecordType::from(record_set.r#type().as_str()),
        record_set.ttl(),
        record_set
            .resource_records()
            .iter()
            .map(|record| record.value().to_string())
            .collect(),
    )
}

fn to_sdk_change_batch(batch: &ChangeBatch) -> Result<sdk::ChangeBatch, BuildError> {
    let changes = batch
        .changes()
        .iter()
        .map(|change| {
            let action = match change.action {
                ChangeAction::Upsert => sdk::ChangeAction::Upsert,
                ChangeAction::Delete => sdk::ChangeAction::Delete,
            };
            sdk::Change::builder()
                .action(action)
                .resource_record_set(to_sdk_record_set(&change.record_set)?)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;

    sdk::ChangeBatch::builder().set_changes(Some(changes)).build()
}

fn to_sdk_record_set(record_set: &ResourceRecordSet) -> Result<sdk::ResourceRecordSet, BuildError> {
    let mut builder = sdk::ResourceRecordSet::builder()
        .name(&record_set.name)
        .r#type(sdk::RrType::from(record_set.record_type.as_str()));
    if let Some(ttl) = record_set.ttl {
        builder = builder.ttl(ttl);
    }
    for value in &record_set.values {
        builder = builder.resource_records(sdk::ResourceRecord::builder().value(value).build()?);
    }
    builder.build()
}

fn provider_error<E>(operation: &'static str, err: SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(_) => ProviderError::Service {
            operation,
            code: err.code().unwrap_or("Unknown").to_string(),
            message: err.message().unwrap_or_default().to_string(),
        },
        SdkError::TimeoutError(_) => ProviderError::Timeout { operation },
        SdkError::DispatchFailure(_) => ProviderError::Dispatch {
            operation,
            message: detail,
        },
        SdkError::ConstructionFailure(_) => ProviderError::Construction {
            operation,
            message: detail,
        },
        _ => ProviderError::Other {
            operation,
            message: detail,
        },
    }
}

/// `InvalidChangeBatch` carries its reasons in a message list rather than the
/// top-level message.
fn change_batch_error(err: SdkError<ChangeResourceRecordSetsError>) -> ProviderError {
    if let SdkError::ServiceError(context) = &err {
        if let ChangeResourceRecordSetsError::InvalidChangeBatch(invalid) = context.err() {
            let message = invalid
                .message()
                .into_iter()
                .chain(invalid.messages().iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join("; ");
            return ProviderError::Service {
                operation: CHANGE_RESOURCE_RECORD_SETS,
                code: "InvalidChangeBatch".to_string(),
                message,
            };
        }
    }
    provider_error(CHANGE_RESOURCE_RECORD_SETS, err)
}

fn observe<T>(operation: &str, start: Instant, result: &Result<T, ProviderError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(ProviderError::Service { code, .. }) => code.as_str(),
        Err(ProviderError::Timeout { .. }) => "timeout",
        Err(ProviderError::Dispatch { .. }) => "dispatch_failure",
        Err(ProviderError::Construction { .. }) => "construction_failure",
        Err(ProviderError::Other { .. }) => "client_error",
    };
    metrics::record_provider_request(operation, outcome, start.elapsed());
}

#[cfg(test)]
#[path = "aws_tests.rs"]
mod aws_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route53 error types and the classifier that turns raw provider failures
//! into reconciliation-control signals.
//!
//! This module provides:
//! - [`ProviderError`] - a raw failure reported by the Route53 client, uninterpreted
//! - [`IngressError`] - a failure of the ingress address lookup
//! - [`Route53Error`] - the closed set of outcomes the engine and controller branch on
//!
//! Every provider call funnels through [`classify_provider_error`], so call sites
//! only ever match on classified kinds.

use crate::cache::CacheError;
use thiserror::Error;

/// Service error codes that mean the hosted zone does not exist
const ZONE_NOT_FOUND_CODES: &[&str] = &["HostedZoneNotFound", "NoSuchHostedZone"];

/// Service error codes that mean the caller is being rate limited
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "PriorRequestNotComplete",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Service error codes worth retrying without backoff escalation
const TRANSIENT_PROVIDER_CODES: &[&str] = &[
    "DispatchFailure",
    "ServiceUnavailable",
    "InternalFailure",
    "InternalError",
];

/// Raw failure reported by a Route53 client.
///
/// The client never interprets these; [`classify_provider_error`] does.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The service answered with an error code
    #[error("{operation}: {code}: {message}")]
    Service {
        /// Provider operation name (e.g., `ChangeResourceRecordSets`)
        operation: &'static str,
        /// Service error code (e.g., `InvalidChangeBatch`)
        code: String,
        /// Service error message
        message: String,
    },

    /// The transport gave up waiting for an answer
    #[error("{operation}: request timed out")]
    Timeout {
        /// Provider operation name
        operation: &'static str,
    },

    /// The request never reached the service
    #[error("{operation}: dispatch failure: {message}")]
    Dispatch {
        /// Provider operation name
        operation: &'static str,
        /// Connector message
        message: String,
    },

    /// The request could not be built
    #[error("{operation}: invalid request: {message}")]
    Construction {
        /// Provider operation name
        operation: &'static str,
        /// Builder message
        message: String,
    },

    /// Any other client-side failure (e.g., an unparseable response)
    #[error("{operation}: {message}")]
    Other {
        /// Provider operation name
        operation: &'static str,
        /// Description of the failure
        message: String,
    },
}

impl ProviderError {
    /// Provider operation this error came from
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Service { operation, .. }
            | Self::Timeout { operation }
            | Self::Dispatch { operation, .. }
            | Self::Construction { operation, .. }
            | Self::Other { operation, .. } => operation,
        }
    }

    /// Service error code, if the service answered
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Failure of the ingress address lookup on a workload cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngressError {
    /// The ingress load balancer exists but has no address yet
    #[error("Ingress service '{service}' has no load balancer address yet")]
    NotReady {
        /// Name of the ingress service
        service: String,
    },

    /// More than one ingress load balancer service matched
    #[error("Found {count} ingress load balancer services, expected at most one")]
    TooManyServices {
        /// Number of matching services
        count: usize,
    },

    /// The workload cluster cannot be reached yet (e.g., kubeconfig not published)
    #[error("Workload cluster is not reachable yet: {reason}")]
    WorkloadUnavailable {
        /// Why the workload cluster is unreachable
        reason: String,
    },

    /// Any other lookup failure
    #[error("Ingress lookup failed: {reason}")]
    Lookup {
        /// Description of the failure
        reason: String,
    },
}

/// Classified outcome of a Route53 reconciliation step.
///
/// Not-ready kinds ([`Route53Error::IngressNotReady`], [`Route53Error::ServiceNotReady`])
/// ask the caller to requeue; [`Route53Error::ThrottlingRateExceeded`] asks it to back
/// off; everything else unhandled by the engine is a hard failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Route53Error {
    /// No hosted zone with the exact name exists
    #[error("Hosted zone '{zone}' not found")]
    HostedZoneNotFound {
        /// Domain name or zone id that was looked up
        zone: String,
    },

    /// A change batch referenced a record that does not exist
    #[error("{operation}{}: record not found: {message}", zone_suffix(.zone_id))]
    NotFound {
        /// Provider operation name
        operation: &'static str,
        /// Zone the operation targeted
        zone_id: Option<String>,
        /// Provider message
        message: String,
    },

    /// The requested state already exists
    #[error("{operation}{}: already exists: {message}", zone_suffix(.zone_id))]
    AlreadyExists {
        /// Provider operation name
        operation: &'static str,
        /// Zone the operation targeted
        zone_id: Option<String>,
        /// Provider message
        message: String,
    },

    /// The ingress load balancer has no address yet
    #[error("Ingress of cluster '{cluster}' is not ready")]
    IngressNotReady {
        /// Cluster name
        cluster: String,
    },

    /// A workload cluster precondition is not met yet
    #[error("Cluster '{cluster}' is not ready: {reason}")]
    ServiceNotReady {
        /// Cluster name
        cluster: String,
        /// Which precondition is missing
        reason: String,
    },

    /// The provider is rate limiting this account
    #[error("{operation}{}: rate exceeded: {message}", zone_suffix(.zone_id))]
    ThrottlingRateExceeded {
        /// Provider operation name
        operation: &'static str,
        /// Zone the operation targeted
        zone_id: Option<String>,
        /// Provider message
        message: String,
    },

    /// A provider call exceeded its deadline
    #[error("{operation}{}: timed out", zone_suffix(.zone_id))]
    Timeout {
        /// Provider operation name
        operation: &'static str,
        /// Zone the operation targeted
        zone_id: Option<String>,
    },

    /// A hosted zone has no NS record set at its apex
    #[error("Hosted zone '{zone_id}' has no NS record set at its apex")]
    MissingNameServers {
        /// Zone that is missing its NS set
        zone_id: String,
    },

    /// More than one ingress load balancer service matched on the workload cluster
    #[error("Cluster '{cluster}' has {count} ingress load balancer services, expected at most one")]
    TooManyIngressServices {
        /// Cluster name
        cluster: String,
        /// Number of matching services
        count: usize,
    },

    /// The ingress lookup failed for a reason other than readiness
    #[error("Ingress lookup for cluster '{cluster}' failed: {reason}")]
    Ingress {
        /// Cluster name
        cluster: String,
        /// Description of the failure
        reason: String,
    },

    /// A cached value could not be read or written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Unclassified provider failure
    #[error("{operation}{}: {code}: {message}", zone_suffix(.zone_id))]
    Provider {
        /// Provider operation name
        operation: &'static str,
        /// Zone the operation targeted
        zone_id: Option<String>,
        /// Provider error code, or the client failure kind
        code: String,
        /// Provider message
        message: String,
    },
}

fn zone_suffix(zone_id: &Option<String>) -> String {
    zone_id
        .as_deref()
        .map(|id| format!(" on zone {id}"))
        .unwrap_or_default()
}

impl Route53Error {
    /// Returns true for not-ready conditions that should requeue without an error log.
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            Self::IngressNotReady { .. } | Self::ServiceNotReady { .. }
        )
    }

    /// Returns true when the provider is rate limiting.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::ThrottlingRateExceeded { .. })
    }

    /// Returns true for [`Route53Error::HostedZoneNotFound`].
    #[must_use]
    pub fn is_hosted_zone_not_found(&self) -> bool {
        matches!(self, Self::HostedZoneNotFound { .. })
    }

    /// Returns true for [`Route53Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`Route53Error::AlreadyExists`].
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns true if this error is transient and the reconciliation should be retried.
    ///
    /// Not-ready conditions, throttling, timeouts and connectivity failures are
    /// transient. Structural errors and unclassified service errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::IngressNotReady { .. }
            | Self::ServiceNotReady { .. }
            | Self::ThrottlingRateExceeded { .. }
            | Self::Timeout { .. } => true,
            Self::Provider { code, .. } => TRANSIENT_PROVIDER_CODES.contains(&code.as_str()),
            Self::HostedZoneNotFound { .. }
            | Self::NotFound { .. }
            | Self::AlreadyExists { .. }
            | Self::MissingNameServers { .. }
            | Self::TooManyIngressServices { .. }
            | Self::Ingress { .. }
            | Self::Cache(_) => false,
        }
    }

    /// Returns a stable reason code, used for metrics labels and log fields.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::HostedZoneNotFound { .. } => "HostedZoneNotFound",
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::IngressNotReady { .. } => "IngressNotReady",
            Self::ServiceNotReady { .. } => "ServiceNotReady",
            Self::ThrottlingRateExceeded { .. } => "ThrottlingRateExceeded",
            Self::Timeout { .. } => "Timeout",
            Self::MissingNameServers { .. } => "MissingNameServers",
            Self::TooManyIngressServices { .. } => "TooManyIngressServices",
            Self::Ingress { .. } => "IngressLookupFailed",
            Self::Cache(_) => "CacheError",
            Self::Provider { .. } => "ProviderError",
        }
    }
}

/// Map a raw provider failure to its classified kind.
///
/// `zone_id` is the zone the call targeted, when known; it is carried into
/// the classified error for diagnostics.
#[must_use]
pub fn classify_provider_error(zone_id: Option<&str>, err: ProviderError) -> Route53Error {
    let zone_id = zone_id.map(str::to_string);
    match err {
        ProviderError::Service {
            operation,
            code,
            message,
        } => classify_service_error(operation, zone_id, code, message),
        ProviderError::Timeout { operation } => Route53Error::Timeout { operation, zone_id },
        ProviderError::Dispatch { operation, message } => Route53Error::Provider {
            operation,
            zone_id,
            code: "DispatchFailure".to_string(),
            message,
        },
        ProviderError::Construction { operation, message } => Route53Error::Provider {
            operation,
            zone_id,
            code: "ConstructionFailure".to_string(),
            message,
        },
        ProviderError::Other { operation, message } => Route53Error::Provider {
            operation,
            zone_id,
            code: "ClientError".to_string(),
            message,
        },
    }
}

fn classify_service_error(
    operation: &'static str,
    zone_id: Option<String>,
    code: String,
    message: String,
) -> Route53Error {
    let lowered = message.to_lowercase();

    if ZONE_NOT_FOUND_CODES.contains(&code.as_str()) {
        return Route53Error::HostedZoneNotFound {
            zone: zone_id.unwrap_or_else(|| "<unknown>".to_string()),
        };
    }
    if code == "InvalidChangeBatch" {
        return if lowered.contains("not found") {
            Route53Error::NotFound {
                operation,
                zone_id,
                message,
            }
        } else {
            Route53Error::AlreadyExists {
                operation,
                zone_id,
                message,
            }
        };
    }
    if code == "HostedZoneAlreadyExists" {
        return Route53Error::AlreadyExists {
            operation,
            zone_id,
            message,
        };
    }
    if THROTTLING_CODES.contains(&code.as_str()) || lowered.contains("rate exceeded") {
        return Route53Error::ThrottlingRateExceeded {
            operation,
            zone_id,
            message,
        };
    }

    Route53Error::Provider {
        operation,
        zone_id,
        code,
        message,
    }
}

/// Error raised when a provider call outlives its per-call deadline.
#[must_use]
pub fn deadline_exceeded(operation: &'static str, zone_id: Option<&str>) -> Route53Error {
    Route53Error::Timeout {
        operation,
        zone_id: zone_id.map(str::to_string),
    }
}

/// Map an ingress lookup failure for `cluster` to its classified kind.
#[must_use]
pub fn classify_ingress_error(cluster: &str, err: IngressError) -> Route53Error {
    let cluster = cluster.to_string();
    match err {
        IngressError::NotReady { .. } => Route53Error::IngressNotReady { cluster },
        IngressError::WorkloadUnavailable { reason } => {
            Route53Error::ServiceNotReady { cluster, reason }
        }
        IngressError::TooManyServices { count } => {
            Route53Error::TooManyIngressServices { cluster, count }
        }
        IngressError::Lookup { reason } => Route53Error::Ingress { cluster, reason },
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mirror of the Cluster API OpenStack infrastructure resource.
//!
//! `OpenStackCluster` is owned by the Cluster API OpenStack provider; this
//! crate never installs or writes its CRD. Only the fields the DNS controller
//! reads are modelled. Unknown fields are ignored on deserialization.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: infrastructure.cluster.x-k8s.io/v1alpha4
//! kind: OpenStackCluster
//! metadata:
//!   name: demo
//!   namespace: clusters
//!   annotations:
//!     route53-dns-operator.io/cname-override: edge.example.net
//! spec:
//!   controlPlaneEndpoint:
//!     host: 192.0.2.10
//!     port: 6443
//! status:
//!   ready: true
//!   bastion:
//!     floatingIP: 192.0.2.20
//!     ip: 10.6.0.4
//! ```

use crate::constants::{ANNOTATION_CNAME_OVERRIDE, ANNOTATION_PAUSED};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an `OpenStackCluster`, as far as DNS is concerned.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha4",
    kind = "OpenStackCluster",
    namespaced,
    doc = "OpenStackCluster is the Cluster API infrastructure object of a workload cluster running on OpenStack."
)]
#[kube(status = "OpenStackClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpenStackClusterSpec {
    /// Endpoint of the workload cluster's API server, set once the load
    /// balancer or floating IP exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,
}

/// Host and port of an API server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
}

/// Observed state of an `OpenStackCluster`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenStackClusterStatus {
    #[serde(default)]
    pub ready: bool,

    /// Bastion host, when the cluster has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion: Option<BastionInstance>,
}

/// Addresses of the bastion host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BastionInstance {
    /// Public address reachable from outside the cluster network
    #[serde(rename = "floatingIP", default, skip_serializing_if = "Option::is_none")]
    pub floating_ip: Option<String>,

    /// Address on the cluster network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl OpenStackCluster {
    /// API server host, empty until the control plane endpoint is assigned.
    #[must_use]
    pub fn api_endpoint_host(&self) -> String {
        self.spec
            .control_plane_endpoint
            .as_ref()
            .map(|endpoint| endpoint.host.trim().to_string())
            .unwrap_or_default()
    }

    /// Public bastion address, if any.
    #[must_use]
    pub fn bastion_floating_ip(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|status| status.bastion.as_ref())
            .and_then(|bastion| bastion.floating_ip.clone())
            .filter(|ip| !ip.trim().is_empty())
    }

    /// Whether Cluster API has paused reconciliation of this cluster.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.annotations().contains_key(ANNOTATION_PAUSED)
    }

    /// Wildcard CNAME target requested through annotation.
    #[must_use]
    pub fn cname_override(&self) -> Option<String> {
        self.annotations()
            .get(ANNOTATION_CNAME_OVERRIDE)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;

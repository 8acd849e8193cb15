// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress address discovery on a workload cluster.
//!
//! The workload cluster is reached through the kubeconfig Cluster API
//! publishes in the `<cluster>-kubeconfig` secret on the management cluster.
//! The ingress controller is the `LoadBalancer` service in `kube-system`
//! labelled `app.kubernetes.io/name=nginx-ingress-controller`.
//!
//! Every lookup is a single attempt. Retrying is left to the controller's
//! requeue, so an unreachable workload cluster never stalls a reconciliation.

use crate::constants::{
    INGRESS_NAMESPACE, INGRESS_SERVICE_SELECTOR, KUBECONFIG_SECRET_KEY, KUBECONFIG_SECRET_SUFFIX,
    LOAD_BALANCER_SERVICE_TYPE,
};
use crate::controller::retry::is_retryable_error;
use crate::dns_errors::IngressError;
use crate::scope::{IngressAddress, IngressResolver};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::net::Ipv4Addr;
use tracing::debug;

/// Resolves the ingress address of one workload cluster on demand.
#[derive(Clone)]
pub struct KubeIngressResolver {
    client: Client,
    namespace: String,
    cluster_name: String,
}

impl KubeIngressResolver {
    /// `client` talks to the management cluster; `namespace` holds the
    /// cluster's kubeconfig secret.
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>, cluster_name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            cluster_name: cluster_name.into(),
        }
    }

    async fn workload_client(&self) -> Result<Client, IngressError> {
        let secret_name = format!("{}{KUBECONFIG_SECRET_SUFFIX}", self.cluster_name);
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);

        let secret = secrets
            .get_opt(&secret_name)
            .await
            .map_err(|e| {
                classify_kube_error(&format!("get secret {}/{secret_name}", self.namespace), &e)
            })?
            .ok_or_else(|| IngressError::WorkloadUnavailable {
                reason: format!("secret {}/{secret_name} not found", self.namespace),
            })?;

        let raw = kubeconfig_bytes(&secret).ok_or_else(|| IngressError::WorkloadUnavailable {
            reason: format!(
                "secret {}/{secret_name} has no '{KUBECONFIG_SECRET_KEY}' key",
                self.namespace
            ),
        })?;
        let yaml = String::from_utf8(raw).map_err(|e| IngressError::Lookup {
            reason: format!("kubeconfig is not UTF-8: {e}"),
        })?;

        let kubeconfig = Kubeconfig::from_yaml(&yaml).map_err(|e| IngressError::Lookup {
            reason: format!("invalid kubeconfig: {e}"),
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| IngressError::Lookup {
                reason: format!("unusable kubeconfig: {e}"),
            })?;
        Client::try_from(config).map_err(|e| IngressError::Lookup {
            reason: format!("cannot build workload client: {e}"),
        })
    }
}

#[async_trait]
impl IngressResolver for KubeIngressResolver {
    async fn resolve(&self) -> Result<IngressAddress, IngressError> {
        let client = self.workload_client().await?;
        let services: Api<Service> = Api::namespaced(client, INGRESS_NAMESPACE);
        let params = ListParams::default().labels(INGRESS_SERVICE_SELECTOR);

        let list = services
            .list(&params)
            .await
            .map_err(|e| classify_kube_error("list ingress services", &e))?;

        let address = select_ingress_address(&list.items)?;
        debug!(cluster = %self.cluster_name, ?address, "Resolved ingress address");
        Ok(address)
    }
}

/// Raw kubeconfig from the secret's data or string data
fn kubeconfig_bytes(secret: &Secret) -> Option<Vec<u8>> {
    if let Some(value) = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
    {
        return Some(value.0.clone());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
        .map(|value| value.clone().into_bytes())
}

/// Map a failed Kubernetes call to an ingress error.
///
/// Connectivity failures, rate limiting and server errors mean the cluster is
/// not reachable yet. Anything else (RBAC denials, bad requests) is a lookup
/// failure.
#[must_use]
pub fn classify_kube_error(operation: &str, err: &kube::Error) -> IngressError {
    let reason = format!("{operation}: {err}");
    if is_retryable_error(err) {
        IngressError::WorkloadUnavailable { reason }
    } else {
        IngressError::Lookup { reason }
    }
}

/// Ingress address from the services matching the ingress selector.
///
/// Only `LoadBalancer` services count, and only an IPv4 address makes the
/// ingress installed: the address is published as an A record.
///
/// # Errors
///
/// - [`IngressError::TooManyServices`] when more than one load balancer matched
/// - [`IngressError::NotReady`] when the load balancer has no IPv4 address yet
pub fn select_ingress_address(services: &[Service]) -> Result<IngressAddress, IngressError> {
    let load_balancers: Vec<&Service> = services
        .iter()
        .filter(|svc| {
            svc.spec
                .as_ref()
                .and_then(|spec| spec.type_.as_deref())
                == Some(LOAD_BALANCER_SERVICE_TYPE)
        })
        .collect();

    let service = match load_balancers.as_slice() {
        [] => return Ok(IngressAddress::NotInstalled),
        [service] => *service,
        many => {
            return Err(IngressError::TooManyServices { count: many.len() });
        }
    };

    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .into_iter()
        .flatten()
        .find_map(|ingress| {
            ingress
                .ip
                .as_deref()
                .filter(|ip| ip.parse::<Ipv4Addr>().is_ok())
                .map(str::to_string)
        })
        .map(IngressAddress::Installed)
        .ok_or_else(|| IngressError::NotReady {
            service: service.name_any(),
        })
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;

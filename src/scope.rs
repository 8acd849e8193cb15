// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-only view of one cluster that the reconciliation engine works on.
//!
//! A [`ClusterScope`] carries everything the engine needs to know about a
//! cluster: its name and DNS domain, the management cluster it belongs to, the
//! observed API endpoint and bastion addresses, and a lazy ingress lookup.
//! Construction rejects scopes that cannot yield a cluster domain.

use crate::dns_errors::IngressError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building a [`ClusterScope`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The cluster name is empty
    #[error("Cluster name must not be empty")]
    EmptyName,

    /// The base domain is empty
    #[error("Base domain must not be empty for cluster '{cluster}'")]
    EmptyBaseDomain {
        /// Cluster name
        cluster: String,
    },
}

/// Observed state of the ingress load balancer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngressAddress {
    /// An ingress load balancer exists and has this address
    Installed(String),
    /// No ingress load balancer is deployed
    NotInstalled,
}

/// Lazy lookup of a cluster's ingress address.
///
/// A load balancer that exists but has no address yet is reported as
/// [`IngressError::NotReady`], distinct from [`IngressAddress::NotInstalled`].
#[async_trait]
pub trait IngressResolver: Send + Sync {
    async fn resolve(&self) -> Result<IngressAddress, IngressError>;
}

/// A fixed address resolves to itself.
#[async_trait]
impl IngressResolver for IngressAddress {
    async fn resolve(&self) -> Result<IngressAddress, IngressError> {
        Ok(self.clone())
    }
}

/// Inputs of [`ClusterScope::new`].
pub struct ClusterScopeParams {
    pub name: String,
    pub base_domain: String,
    pub management_cluster: String,
    pub api_endpoint: String,
    pub bastion_ip: Option<String>,
    pub cname_override: Option<String>,
    pub ingress: Arc<dyn IngressResolver>,
}

/// One cluster as seen by the reconciliation engine.
#[derive(Clone)]
pub struct ClusterScope {
    name: String,
    base_domain: String,
    cluster_domain: String,
    management_cluster: String,
    api_endpoint: String,
    bastion_ip: Option<String>,
    cname_override: Option<String>,
    ingress: Arc<dyn IngressResolver>,
}

impl ClusterScope {
    /// Validate `params` and compute the cluster domain `<name>.<base_domain>`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError`] when the name or base domain is empty.
    pub fn new(params: ClusterScopeParams) -> Result<Self, ScopeError> {
        let name = params.name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(ScopeError::EmptyName);
        }
        let base_domain = params
            .base_domain
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase();
        if base_domain.is_empty() {
            return Err(ScopeError::EmptyBaseDomain { cluster: name });
        }

        Ok(Self {
            cluster_domain: format!("{name}.{base_domain}"),
            name,
            base_domain,
            management_cluster: params.management_cluster.trim().to_string(),
            api_endpoint: params.api_endpoint.trim().to_string(),
            bastion_ip: non_empty(params.bastion_ip),
            cname_override: non_empty(params.cname_override),
            ingress: params.ingress,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// `<name>.<base_domain>`, without trailing dot
    #[must_use]
    pub fn cluster_domain(&self) -> &str {
        &self.cluster_domain
    }

    #[must_use]
    pub fn management_cluster(&self) -> &str {
        &self.management_cluster
    }

    /// Observed API endpoint host; empty until the control plane is reachable
    #[must_use]
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    #[must_use]
    pub fn bastion_ip(&self) -> Option<&str> {
        self.bastion_ip.as_deref()
    }

    #[must_use]
    pub fn cname_override(&self) -> Option<&str> {
        self.cname_override.as_deref()
    }

    /// Resolve the ingress address now.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's [`IngressError`].
    pub async fn ingress(&self) -> Result<IngressAddress, IngressError> {
        self.ingress.resolve().await
    }
}

impl fmt::Debug for ClusterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterScope")
            .field("name", &self.name)
            .field("cluster_domain", &self.cluster_domain)
            .field("management_cluster", &self.management_cluster)
            .field("api_endpoint", &self.api_endpoint)
            .field("bastion_ip", &self.bastion_ip)
            .field("cname_override", &self.cname_override)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod scope_tests;

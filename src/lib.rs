// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Route53 DNS Operator for Cluster API
//!
//! Gives every Cluster API workload cluster its own Route53 hosted zone
//! `<cluster>.<base-domain>`, delegated from the base zone, carrying the
//! records people use to reach the cluster:
//!
//! - `api.<cluster>.<base-domain>` - the control plane endpoint
//! - `bastion1.<cluster>.<base-domain>` - the bastion host, while there is one
//! - `ingress.<cluster>.<base-domain>` and `*.<cluster>.<base-domain>` - the
//!   ingress load balancer
//!
//! ## Modules
//!
//! - [`route53`] - the reconciliation engine (zones, delegation, records)
//! - [`provider`] - the Route53 seam and its AWS SDK implementation
//! - [`cache`] - sharded TTL cache shared by all reconciliations
//! - [`dns_errors`] - provider error classification
//! - [`scope`] - the engine's read-only view of one cluster
//! - [`controller`] - the `OpenStackCluster` controller around the engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use route53_dns_operator::cache::{CacheConfig, DnsCache};
//! use route53_dns_operator::logging::TracingLogger;
//! use route53_dns_operator::provider::aws::AwsRoute53Client;
//! use route53_dns_operator::route53::Route53Service;
//! use route53_dns_operator::scope::{ClusterScope, ClusterScopeParams, IngressAddress};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = Route53Service::new(
//!     Arc::new(AwsRoute53Client::from_env(None).await),
//!     Arc::new(DnsCache::new(CacheConfig::default())?),
//!     Arc::new(TracingLogger::new("demo")),
//! );
//!
//! let scope = ClusterScope::new(ClusterScopeParams {
//!     name: "demo".to_string(),
//!     base_domain: "example.com".to_string(),
//!     management_cluster: "mgmt".to_string(),
//!     api_endpoint: "192.0.2.10".to_string(),
//!     bastion_ip: None,
//!     cname_override: None,
//!     ingress: Arc::new(IngressAddress::NotInstalled),
//! })?;
//!
//! engine.reconcile(&scope).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod dns_errors;
pub mod ingress;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod route53;
pub mod scope;
pub mod server;

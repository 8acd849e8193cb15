// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Route53 DNS operator.
//!
//! Constants are organized by category: record naming, provider conventions,
//! cache defaults, and controller behaviour.

// ============================================================================
// DNS Record Constants
// ============================================================================

/// TTL applied to every record the operator writes (seconds)
pub const RECORD_TTL_SECS: i64 = 300;

/// Label of the A record pointing at the workload cluster API endpoint
pub const API_RECORD_LABEL: &str = "api";

/// Label of the A record pointing at the bastion host
pub const BASTION_RECORD_LABEL: &str = "bastion1";

/// Label of the A record pointing at the ingress load balancer
pub const INGRESS_RECORD_LABEL: &str = "ingress";

/// Label of the wildcard CNAME record
pub const WILDCARD_RECORD_LABEL: &str = "*";

/// Route53 escapes `*` as an octal sequence when listing record sets
pub const ESCAPED_WILDCARD: &str = "\\052";

// ============================================================================
// Route53 Constants
// ============================================================================

/// Prefix of the hosted zone comment that attributes a zone to a management cluster
pub const ZONE_COMMENT_PREFIX: &str = "management_cluster: ";

/// Prefix Route53 puts in front of hosted zone identifiers
pub const HOSTED_ZONE_ID_PREFIX: &str = "/hostedzone/";

/// Default per-call deadline for provider requests (seconds)
pub const DEFAULT_PROVIDER_CALL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Cache Constants
// ============================================================================

/// Default number of cache shards (must be a power of two)
pub const DEFAULT_CACHE_SHARDS: usize = 256;

/// Default lifetime of a cache entry (seconds)
pub const DEFAULT_CACHE_LIFE_WINDOW_SECS: u64 = 360;

/// Default interval between expired-entry sweeps (seconds)
pub const DEFAULT_CACHE_CLEAN_WINDOW_SECS: u64 = 300;

/// Default byte budget of the cache (24 MiB)
pub const DEFAULT_CACHE_MAX_BYTES: usize = 24 * 1024 * 1024;

// ============================================================================
// Ingress Discovery Constants
// ============================================================================

/// Namespace on the workload cluster that hosts the ingress controller service
pub const INGRESS_NAMESPACE: &str = "kube-system";

/// Label selector identifying the ingress controller service
pub const INGRESS_SERVICE_SELECTOR: &str = "app.kubernetes.io/name=nginx-ingress-controller";

/// Suffix of the secret holding a workload cluster's kubeconfig
pub const KUBECONFIG_SECRET_SUFFIX: &str = "-kubeconfig";

/// Key within the kubeconfig secret
pub const KUBECONFIG_SECRET_KEY: &str = "value";

/// Service type that receives a load balancer address
pub const LOAD_BALANCER_SERVICE_TYPE: &str = "LoadBalancer";

// ============================================================================
// Controller Constants
// ============================================================================

/// Finalizer placed on watched clusters until DNS cleanup completes
pub const FINALIZER_DNS: &str = "dns-operator-route53.finalizers.route53-dns-operator.io";

/// Annotation marking a Cluster API object as paused
pub const ANNOTATION_PAUSED: &str = "cluster.x-k8s.io/paused";

/// Annotation overriding the wildcard CNAME target
pub const ANNOTATION_CNAME_OVERRIDE: &str = "route53-dns-operator.io/cname-override";

/// Requeue interval after a converged reconciliation (5 minutes)
pub const REQUEUE_CONVERGED_SECS: u64 = 300;

/// Requeue interval while a precondition is not yet met
pub const REQUEUE_NOT_READY_SECS: u64 = 30;

/// Requeue interval after a hard failure
pub const REQUEUE_ERROR_SECS: u64 = 30;

/// Kind of the watched Cluster API infrastructure object
pub const KIND_OPENSTACK_CLUSTER: &str = "OpenStackCluster";

// ============================================================================
// Server Constants
// ============================================================================

/// Default bind address of the metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path of the Prometheus scrape endpoint
pub const METRICS_PATH: &str = "/metrics";

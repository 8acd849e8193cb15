// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OpenStackCluster` controller.
//!
//! Each watched cluster is turned into a [`ClusterScope`] and handed to the
//! Route53 engine. The controller owns everything Kubernetes-specific around
//! that: the DNS finalizer, pause handling, and mapping engine outcomes to
//! requeue intervals.
//!
//! | Outcome    | Requeue                                   |
//! |------------|-------------------------------------------|
//! | converged  | 5 minutes                                 |
//! | not ready  | 30 seconds                                |
//! | throttled  | per-cluster exponential backoff           |
//! | failed     | 30 seconds, through the error policy      |

pub mod finalizers;
pub mod retry;

use crate::constants::{
    FINALIZER_DNS, KIND_OPENSTACK_CLUSTER, REQUEUE_CONVERGED_SECS, REQUEUE_ERROR_SECS,
    REQUEUE_NOT_READY_SECS,
};
use crate::context::Context;
use crate::crd::OpenStackCluster;
use crate::dns_errors::Route53Error;
use crate::ingress::KubeIngressResolver;
use crate::metrics;
use crate::scope::{ClusterScope, ClusterScopeParams, ScopeError};
use finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Metrics operation label of a converging pass
const OPERATION_RECONCILE: &str = "reconcile";

/// Metrics operation label of a teardown pass
const OPERATION_DELETE: &str = "delete";

/// Failure of one controller pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Dns(#[from] Route53Error),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Kube(#[from] anyhow::Error),
}

/// How an engine pass ended, as far as scheduling is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Converged,
    NotReady,
    Throttled,
    Failed,
}

impl Outcome {
    /// Metrics label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "success",
            Self::NotReady => "not_ready",
            Self::Throttled => "throttled",
            Self::Failed => "error",
        }
    }
}

/// Classify the result of an engine pass.
#[must_use]
pub fn classify_outcome(result: &Result<(), Route53Error>) -> Outcome {
    match result {
        Ok(()) => Outcome::Converged,
        Err(err) if err.is_not_ready() => Outcome::NotReady,
        Err(err) if err.is_throttled() => Outcome::Throttled,
        Err(_) => Outcome::Failed,
    }
}

/// Fixed requeue delay of an outcome; throttling and failures have none.
#[must_use]
pub const fn requeue_delay(outcome: Outcome) -> Option<Duration> {
    match outcome {
        Outcome::Converged => Some(Duration::from_secs(REQUEUE_CONVERGED_SECS)),
        Outcome::NotReady => Some(Duration::from_secs(REQUEUE_NOT_READY_SECS)),
        Outcome::Throttled | Outcome::Failed => None,
    }
}

/// Watch every `OpenStackCluster` and reconcile its DNS until the stream ends.
///
/// # Errors
///
/// Never fails once started; the signature leaves room for startup checks.
pub async fn run(ctx: Arc<Context>) -> anyhow::Result<()> {
    info!("Starting OpenStackCluster DNS controller");

    let api = Api::<OpenStackCluster>::all(ctx.client.clone());

    Controller::new(api, Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(error = %e, "Controller event failed");
            }
            futures::future::ready(())
        })
        .await;

    Ok(())
}

/// Build the engine's view of `cluster`.
///
/// # Errors
///
/// Returns [`ScopeError`] when the cluster domain cannot be formed.
pub fn cluster_scope(cluster: &OpenStackCluster, ctx: &Context) -> Result<ClusterScope, ScopeError> {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_default();

    ClusterScope::new(ClusterScopeParams {
        ingress: Arc::new(KubeIngressResolver::new(
            ctx.client.clone(),
            namespace,
            name.clone(),
        )),
        name,
        base_domain: ctx.settings.base_domain.clone(),
        management_cluster: ctx.settings.management_cluster.clone(),
        api_endpoint: cluster.api_endpoint_host(),
        bastion_ip: cluster.bastion_floating_ip(),
        cname_override: cluster.cname_override(),
    })
}

/// Reconcile one `OpenStackCluster`.
///
/// # Errors
///
/// Returns [`ReconcileError`] for failures that are neither not-ready nor
/// throttling; the error policy requeues them.
pub async fn reconcile(
    cluster: Arc<OpenStackCluster>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();
    let key = format!("{namespace}/{name}");

    if cluster.is_paused() {
        debug!(cluster = %key, "Cluster is paused, skipping");
        return Ok(Action::await_change());
    }

    let scope = cluster_scope(&cluster, &ctx)?;
    let engine = ctx.engine(&name);

    if cluster.metadata.deletion_timestamp.is_some() {
        if !has_finalizer(cluster.as_ref(), FINALIZER_DNS) {
            return Ok(Action::await_change());
        }

        info!(cluster = %key, domain = %scope.cluster_domain(), "{} is being deleted", KIND_OPENSTACK_CLUSTER);
        let start = Instant::now();
        let result = engine.delete(&scope).await;
        let outcome = classify_outcome(&result);
        metrics::record_reconciliation(OPERATION_DELETE, outcome.as_str(), start.elapsed());

        return match result {
            Ok(()) => {
                ctx.throttle.reset(&key);
                remove_finalizer(&ctx.client, cluster.as_ref(), FINALIZER_DNS).await?;
                Ok(Action::await_change())
            }
            Err(err) => schedule_retry(&ctx, &key, outcome, err),
        };
    }

    ensure_finalizer(&ctx.client, cluster.as_ref(), FINALIZER_DNS).await?;

    let start = Instant::now();
    let result = engine.reconcile(&scope).await;
    let outcome = classify_outcome(&result);
    metrics::record_reconciliation(OPERATION_RECONCILE, outcome.as_str(), start.elapsed());

    match result {
        Ok(()) => {
            ctx.throttle.reset(&key);
            info!(cluster = %key, domain = %scope.cluster_domain(), "Cluster DNS converged");
            Ok(Action::requeue(Duration::from_secs(REQUEUE_CONVERGED_SECS)))
        }
        Err(err) => schedule_retry(&ctx, &key, outcome, err),
    }
}

fn schedule_retry(
    ctx: &Context,
    key: &str,
    outcome: Outcome,
    err: Route53Error,
) -> Result<Action, ReconcileError> {
    match outcome {
        Outcome::Throttled => {
            let delay = ctx.throttle.next_delay(key);
            warn!(cluster = %key, error = %err, retry_after = ?delay, "Route53 is throttling, backing off");
            Ok(Action::requeue(delay))
        }
        Outcome::NotReady | Outcome::Converged => {
            ctx.throttle.reset(key);
            info!(cluster = %key, reason = err.status_reason(), "Cluster DNS not ready: {err}");
            Ok(Action::requeue(
                requeue_delay(outcome).unwrap_or(Duration::from_secs(REQUEUE_NOT_READY_SECS)),
            ))
        }
        Outcome::Failed => {
            ctx.throttle.reset(key);
            error!(cluster = %key, reason = err.status_reason(), error = %err, "Failed to reconcile cluster DNS");
            Err(err.into())
        }
    }
}

/// Requeue failed passes after a fixed delay.
pub fn error_policy(
    cluster: Arc<OpenStackCluster>,
    err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    warn!(
        cluster = %cluster.name_any(),
        error = %err,
        "Reconciliation failed, requeueing in {REQUEUE_ERROR_SECS}s"
    );
    Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
}

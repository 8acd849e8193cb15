// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for watched clusters.
//!
//! The DNS finalizer keeps an `OpenStackCluster` around until its hosted zone,
//! delegation and records are gone. Both helpers patch `metadata.finalizers`
//! with a JSON merge patch and are idempotent.
//!
//! # Example
//!
//! ```rust,ignore
//! use route53_dns_operator::controller::finalizers::{ensure_finalizer, remove_finalizer};
//! use route53_dns_operator::constants::FINALIZER_DNS;
//!
//! async fn reconcile(client: Client, cluster: OpenStackCluster) -> Result<()> {
//!     if cluster.metadata.deletion_timestamp.is_some() {
//!         // tear down DNS, then let Kubernetes delete the object
//!         return remove_finalizer(&client, &cluster, FINALIZER_DNS).await;
//!     }
//!     ensure_finalizer(&client, &cluster, FINALIZER_DNS).await?;
//!     Ok(())
//! }
//! ```

use super::retry::retry_api_call;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|existing| existing == finalizer))
}

/// Finalizer list of `resource` with `finalizer` appended, or `None` when it
/// is already present.
#[must_use]
pub fn with_finalizer<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list of `resource` without `finalizer`, or `None` when it is
/// already absent.
#[must_use]
pub fn without_finalizer<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if !has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);
    Some(finalizers)
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails after retries.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = with_finalizer(resource, finalizer) else {
        return Ok(());
    };

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    patch_finalizers::<T>(client, &namespace, &name, finalizers).await
}

/// Remove a finalizer from a resource.
///
/// # Errors
///
/// Returns an error if the API patch operation fails after retries.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = without_finalizer(resource, finalizer) else {
        return Ok(());
    };

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    patch_finalizers::<T>(client, &namespace, &name, finalizers).await
}

async fn patch_finalizers<T>(
    client: &Client,
    namespace: &str,
    name: &str,
    finalizers: Vec<String>,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    let merge = Patch::Merge(&patch);
    let params = PatchParams::default();
    let operation = format!("patch finalizers of {namespace}/{name}");
    retry_api_call(
        || async { api.patch(name, &params, &merge).await },
        &operation,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::constants::FINALIZER_DNS;
    use crate::crd::OpenStackCluster;
    use serde_json::json;

    fn cluster_with(finalizers: Option<Vec<&str>>) -> OpenStackCluster {
        let mut metadata = json!({ "name": "demo", "namespace": "clusters" });
        if let Some(finalizers) = finalizers {
            metadata["finalizers"] = json!(finalizers);
        }
        serde_json::from_value(json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha4",
            "kind": "OpenStackCluster",
            "metadata": metadata,
            "spec": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&cluster_with(None), FINALIZER_DNS));
        assert!(!has_finalizer(
            &cluster_with(Some(vec!["other.io/cleanup"])),
            FINALIZER_DNS
        ));
        assert!(has_finalizer(
            &cluster_with(Some(vec!["other.io/cleanup", FINALIZER_DNS])),
            FINALIZER_DNS
        ));
    }

    #[test]
    fn test_with_finalizer_appends_once() {
        let added = with_finalizer(&cluster_with(Some(vec!["other.io/cleanup"])), FINALIZER_DNS);
        assert_eq!(
            added,
            Some(vec!["other.io/cleanup".to_string(), FINALIZER_DNS.to_string()])
        );

        let empty = with_finalizer(&cluster_with(None), FINALIZER_DNS);
        assert_eq!(empty, Some(vec![FINALIZER_DNS.to_string()]));

        assert_eq!(
            with_finalizer(&cluster_with(Some(vec![FINALIZER_DNS])), FINALIZER_DNS),
            None
        );
    }

    #[test]
    fn test_without_finalizer_keeps_foreign_finalizers() {
        let removed = without_finalizer(
            &cluster_with(Some(vec![FINALIZER_DNS, "other.io/cleanup"])),
            FINALIZER_DNS,
        );
        assert_eq!(removed, Some(vec!["other.io/cleanup".to_string()]));

        assert_eq!(without_finalizer(&cluster_with(None), FINALIZER_DNS), None);
        assert_eq!(
            without_finalizer(&cluster_with(Some(vec!["other.io/cleanup"])), FINALIZER_DNS),
            None
        );
    }
}

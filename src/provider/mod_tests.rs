// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the provider model types

#[cfg(test)]
mod tests {
    use super::super::*;

    fn a_record(name: &str, value: &str) -> ResourceRecordSet {
        ResourceRecordSet::new(name, RecordType::A, Some(300), vec![value.to_string()])
    }

    #[test]
    fn test_normalize_fqdn() {
        assert_eq!(normalize_fqdn("Demo.Example.com"), "demo.example.com.");
        assert_eq!(normalize_fqdn("demo.example.com."), "demo.example.com.");
        assert_eq!(normalize_fqdn("\\052.demo.example.com."), "*.demo.example.com.");
    }

    #[test]
    fn test_record_type_parsing() {
        assert_eq!(RecordType::from("cname"), RecordType::Cname);
        assert_eq!(RecordType::from("NS"), RecordType::Ns);
        assert_eq!(RecordType::from("TXT"), RecordType::Other("TXT".to_string()));
        assert_eq!(RecordType::Cname.to_string(), "CNAME");
    }

    #[test]
    fn test_record_set_identity() {
        let first = a_record("api.demo.example.com", "10.0.0.1");
        let second = a_record("API.demo.example.com.", "10.0.0.2");
        assert!(first.same_identity(&second));
        assert!(first.is_named("api.demo.example.com"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_change_batch_preserves_order() {
        let mut batch = ChangeBatch::new("Z1");
        batch.upsert(a_record("api.demo.example.com", "10.0.0.1"));
        batch.delete(a_record("bastion1.demo.example.com", "10.0.0.9"));

        assert_eq!(batch.zone_id(), "Z1");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.changes()[0].action, ChangeAction::Upsert);
        assert_eq!(batch.changes()[1].action, ChangeAction::Delete);
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let mut first = ChangeBatch::new("Z1");
        first.upsert(a_record("ingress.demo.example.com", "10.0.0.1"));
        let mut same = ChangeBatch::new("Z1");
        same.upsert(a_record("ingress.demo.example.com", "10.0.0.1"));
        let mut changed = ChangeBatch::new("Z1");
        changed.upsert(a_record("ingress.demo.example.com", "10.0.0.2"));
        let mut other_zone = ChangeBatch::new("Z2");
        other_zone.upsert(a_record("ingress.demo.example.com", "10.0.0.1"));

        assert_eq!(first.fingerprint(), same.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
        assert_ne!(first.fingerprint(), changed.fingerprint());
        assert_ne!(first.fingerprint(), other_zone.fingerprint());
    }

    #[test]
    fn test_record_set_json_round_trip() {
        let sets = vec![
            a_record("api.demo.example.com", "10.0.0.1"),
            ResourceRecordSet::new(
                "demo.example.com",
                RecordType::Ns,
                Some(172_800),
                vec!["ns-1.awsdns-1.org.".to_string()],
            ),
        ];
        let json = serde_json::to_vec(&sets).unwrap();
        let decoded: Vec<ResourceRecordSet> = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, sets);
    }
}

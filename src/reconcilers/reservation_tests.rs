// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reservation.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::reconcilers::testing::{application_error, Call, FakeRegistry};

    fn subnet() -> SubnetHandle {
        SubnetHandle {
            id: "7".to_string(),
            cidr: "10.0.0.0/24".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_missing_reservation() {
        let registry = FakeRegistry::new();
        let mut cache = OwnershipCache::new();
        let owner = OwnerId::new("default", "web");

        let outcome = sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &owner)
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Created(_)));
        assert_eq!(
            registry.calls(),
            vec![
                Call::Find("10.0.0.5".to_string()),
                Call::Create {
                    address: "10.0.0.5".to_string(),
                    subnet_id: "7".to_string(),
                    owner: "default/web".to_string(),
                },
            ]
        );
        assert_eq!(cache.owner_of("10.0.0.5"), Some(&owner));
    }

    #[tokio::test]
    async fn test_second_sync_is_idempotent() {
        let registry = FakeRegistry::new();
        let mut cache = OwnershipCache::new();
        let owner = OwnerId::new("default", "web");

        sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &owner)
            .await
            .unwrap();
        let second = sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &owner)
            .await
            .unwrap();

        assert!(matches!(second, SyncOutcome::Unchanged { .. }));
        assert_eq!(registry.creates(), 1);
        assert_eq!(registry.updates(), 0);
        assert_eq!(registry.reservations().len(), 1);
    }

    #[tokio::test]
    async fn test_owner_change_issues_single_update() {
        let registry = FakeRegistry::new();
        let mut cache = OwnershipCache::new();
        let first = OwnerId::new("default", "web");
        let second = OwnerId::new("default", "web-v2");

        sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &first)
            .await
            .unwrap();
        let outcome = sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &second)
            .await
            .unwrap();

        match outcome {
            SyncOutcome::Updated { previous_owner, .. } => {
                assert_eq!(previous_owner.as_deref(), Some("default/web"));
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(registry.creates(), 1);
        assert_eq!(registry.updates(), 1);
        assert_eq!(
            registry.reservations()[0].hostname.as_deref(),
            Some("default/web-v2")
        );
        assert_eq!(cache.owner_of("10.0.0.5"), Some(&second));
    }

    #[tokio::test]
    async fn test_existing_correct_reservation_recovers_cache() {
        let registry = FakeRegistry::new().with_reservation("10.0.0.5", "42", Some("default/web"));
        let mut cache = OwnershipCache::new();
        let owner = OwnerId::new("default", "web");

        let outcome = sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &owner)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Unchanged {
                record_id: "42".to_string()
            }
        );
        assert_eq!(registry.creates() + registry.updates(), 0);
        assert_eq!(cache.owner_of("10.0.0.5"), Some(&owner));
    }

    #[tokio::test]
    async fn test_reservation_without_hostname_is_updated() {
        let registry = FakeRegistry::new().with_reservation("10.0.0.5", "42", None);
        let mut cache = OwnershipCache::new();

        sync_reservation(
            &registry,
            &mut cache,
            "10.0.0.5",
            &subnet(),
            &OwnerId::new("default", "web"),
        )
        .await
        .unwrap();

        assert_eq!(
            registry.calls().last(),
            Some(&Call::Update {
                record_id: "42".to_string(),
                owner: "default/web".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_reservations_are_not_touched() {
        let registry = FakeRegistry::new()
            .with_reservation("10.0.0.5", "41", Some("default/a"))
            .with_reservation("10.0.0.5", "42", Some("default/b"));
        let mut cache = OwnershipCache::new();

        let err = sync_reservation(
            &registry,
            &mut cache,
            "10.0.0.5",
            &subnet(),
            &OwnerId::new("default", "web"),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            SyncError::DuplicateReservations {
                address: "10.0.0.5".to_string(),
                count: 2
            }
        );
        assert_eq!(registry.calls(), vec![Call::Find("10.0.0.5".to_string())]);
        assert!(cache.owner_of("10.0.0.5").is_none());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_cache_untouched() {
        let registry = FakeRegistry::new();
        registry.fail_create(Some(application_error("create")));
        let mut cache = OwnershipCache::new();

        let err = sync_reservation(
            &registry,
            &mut cache,
            "10.0.0.5",
            &subnet(),
            &OwnerId::new("default", "web"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.category(), "application");
        assert_eq!(registry.creates(), 1);
        assert_eq!(cache.owned_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_cache_entry() {
        let registry = FakeRegistry::new();
        let mut cache = OwnershipCache::new();
        let first = OwnerId::new("default", "web");

        sync_reservation(&registry, &mut cache, "10.0.0.5", &subnet(), &first)
            .await
            .unwrap();
        registry.fail_update(Some(application_error("update")));

        let err = sync_reservation(
            &registry,
            &mut cache,
            "10.0.0.5",
            &subnet(),
            &OwnerId::new("default", "other"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SyncError::Registry { action: "update", .. }));
        assert_eq!(cache.owner_of("10.0.0.5"), Some(&first));
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_address() {
        let registry = FakeRegistry::new();
        registry.fail_find(Some(RegistryError::Transport {
            operation: "search".to_string(),
            reason: "connection refused".to_string(),
        }));
        let mut cache = OwnershipCache::new();

        let err = sync_reservation(
            &registry,
            &mut cache,
            "10.0.0.5",
            &subnet(),
            &OwnerId::new("default", "web"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.category(), "transport");
        assert_eq!(registry.creates(), 0);
    }
}

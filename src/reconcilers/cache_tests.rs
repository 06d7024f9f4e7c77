// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `cache.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::reconcilers::testing::FakeRegistry;

    #[tokio::test]
    async fn test_subnet_resolved_once() {
        let registry = FakeRegistry::new().with_subnet("203.0.113.0/24", "7");
        let mut cache = OwnershipCache::new();

        let first = cache.resolve_subnet(&registry, "203.0.113.0/24").await.unwrap();
        let second = cache.resolve_subnet(&registry, "203.0.113.0/24").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id, "7");
        assert_eq!(registry.lookups(), 1);
        assert!(cache.cached_subnet("203.0.113.0/24").is_some());
    }

    #[tokio::test]
    async fn test_failed_resolution_not_cached() {
        let registry = FakeRegistry::new()
            .with_subnet("10.0.0.0/24", "1")
            .with_subnet("10.0.0.0/24", "2");
        let mut cache = OwnershipCache::new();

        for _ in 0..2 {
            let err = cache.resolve_subnet(&registry, "10.0.0.0/24").await.unwrap_err();
            assert!(matches!(err, RegistryError::AmbiguousSubnet { count: 2, .. }));
        }
        assert_eq!(registry.lookups(), 2);
        assert!(cache.cached_subnet("10.0.0.0/24").is_none());
    }

    #[tokio::test]
    async fn test_missing_subnet_retried_next_time() {
        let registry = FakeRegistry::new();
        let mut cache = OwnershipCache::new();

        assert!(cache
            .resolve_subnet(&registry, "198.51.100.0/24")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(cache
            .resolve_subnet(&registry, "198.51.100.0/24")
            .await
            .is_err());
        assert_eq!(registry.lookups(), 2);
    }

    #[test]
    fn test_ownership_lookup() {
        let mut cache = OwnershipCache::new();
        let web = OwnerId::new("default", "web");
        let api = OwnerId::new("default", "api");

        cache.record_owner("10.0.0.5", &web);
        cache.record_owner("10.0.0.6", &api);
        cache.record_owner("203.0.113.10", &web);

        assert_eq!(cache.owner_of("10.0.0.5"), Some(&web));
        assert_eq!(
            cache.addresses_owned_by(&web),
            vec!["10.0.0.5".to_string(), "203.0.113.10".to_string()]
        );
        assert_eq!(cache.owned_count(), 3);

        assert_eq!(cache.forget_address("10.0.0.5"), Some(web.clone()));
        assert_eq!(cache.addresses_owned_by(&web), vec!["203.0.113.10".to_string()]);
        assert!(cache.forget_address("10.0.0.5").is_none());
    }

    #[test]
    fn test_record_owner_overwrites_previous_owner() {
        let mut cache = OwnershipCache::new();
        cache.record_owner("10.0.0.5", &OwnerId::new("default", "old"));
        cache.record_owner("10.0.0.5", &OwnerId::new("default", "new"));

        assert_eq!(cache.owner_of("10.0.0.5").unwrap().as_str(), "default/new");
        assert!(cache
            .addresses_owned_by(&OwnerId::new("default", "old"))
            .is_empty());
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `state`

#[cfg(test)]
mod tests {
    use crate::state::{object_id, Store};

    #[test]
    fn test_object_id_format() {
        assert_eq!(object_id("default", "pg1"), "default/pg1");
        assert_eq!(object_id("team-a", "db"), "team-a/db");
    }

    #[test]
    fn test_object_id_distinguishes_namespaces() {
        // Same name in two namespaces must never collide in the tracked set
        assert_ne!(object_id("ns-a", "pg1"), object_id("ns-b", "pg1"));
    }

    #[tokio::test]
    async fn test_store_put_get_remove() {
        let store: Store<String> = Store::new();
        assert!(store.is_empty().await);

        store.put("default/pg1", "tracked".to_string()).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("default/pg1").await.as_deref(), Some("tracked"));

        let removed = store.remove("default/pg1").await;
        assert_eq!(removed.as_deref(), Some("tracked"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_get_missing() {
        let store: Store<String> = Store::new();
        assert!(store.get("default/absent").await.is_none());
        assert!(store.remove("default/absent").await.is_none());
    }

    #[tokio::test]
    async fn test_store_put_replaces() {
        let store: Store<i32> = Store::new();
        store.put("default/pg1", 1).await;
        store.put("default/pg1", 2).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("default/pg1").await, Some(2));
    }

    #[tokio::test]
    async fn test_store_clones_share_state() {
        let store: Store<i32> = Store::new();
        let clone = store.clone();

        store.put("default/pg1", 7).await;
        assert_eq!(clone.get("default/pg1").await, Some(7));

        clone.remove("default/pg1").await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_lock_gives_map_access() {
        let store: Store<i32> = Store::new();

        {
            let mut tracked = store.lock().await;
            tracked.insert("default/a".to_string(), 1);
            tracked.insert("default/b".to_string(), 2);
        }

        assert_eq!(store.len().await, 2);

        let mut seen = Vec::new();
        store
            .for_each(|id, value| seen.push((id.to_string(), *value)))
            .await;
        assert_eq!(
            seen,
            vec![("default/a".to_string(), 1), ("default/b".to_string(), 2)]
        );
    }
}

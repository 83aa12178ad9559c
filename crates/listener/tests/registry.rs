//! Concurrent access to the request registry.

use std::sync::Arc;

use compilebot_core::RequestId;
use compilebot_listener::RequestRegistry;

// ---------------------------------------------------------------------------
// Test: lookups miss for ids never registered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_miss() {
    let registry: RequestRegistry<u32> = RequestRegistry::new();
    assert!(registry.is_empty().await);
    assert_eq!(registry.lookup("abc1234567").await, None);
}

// ---------------------------------------------------------------------------
// Test: registering an existing id replaces the handle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_overwrites() {
    let registry: RequestRegistry<u32> = RequestRegistry::new();
    registry.register(RequestId::from("aaaaaaaaaa"), 1).await;
    registry.register(RequestId::from("aaaaaaaaaa"), 2).await;

    assert_eq!(registry.lookup("aaaaaaaaaa").await, Some(2));
    assert_eq!(registry.len().await, 1);
}

// ---------------------------------------------------------------------------
// Test: concurrent writers and readers see a consistent map
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_and_lookup() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 50;

    fn id_for(writer: usize, n: usize) -> RequestId {
        RequestId::from(format!("{writer:02}{n:08}"))
    }

    let registry: Arc<RequestRegistry<usize>> = Arc::new(RequestRegistry::new());

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            for n in 0..PER_WRITER {
                registry.register(id_for(writer, n), writer * PER_WRITER + n).await;
            }
        }));
    }
    for reader in 0..WRITERS {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            // Each reader follows a different writer's ids; any hit must
            // carry exactly the value written for that id.
            let writer = (reader + 1) % WRITERS;
            for n in 0..PER_WRITER {
                if let Some(value) = registry.lookup(id_for(writer, n).as_str()).await {
                    assert_eq!(value, writer * PER_WRITER + n);
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.len().await, WRITERS * PER_WRITER);
    for writer in 0..WRITERS {
        for n in 0..PER_WRITER {
            assert_eq!(
                registry.lookup(id_for(writer, n).as_str()).await,
                Some(writer * PER_WRITER + n),
                "entry {writer}/{n}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Test: every registered id resolves to its own handle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_id_resolves_to_its_handle() {
    let registry: RequestRegistry<usize> = RequestRegistry::new();
    let ids: Vec<RequestId> = (0..100).map(|_| RequestId::generate()).collect();

    for (n, id) in ids.iter().enumerate() {
        registry.register(id.clone(), n).await;
    }
    for (n, id) in ids.iter().enumerate() {
        assert_eq!(registry.lookup(id.as_str()).await, Some(n));
    }
}

//! Per-document mutual exclusion.
//!
//! Processing and deletion of the same document must not interleave.
//! [`DocumentLocks`] hands out one async mutex per document id; entries
//! are dropped from the map once the last holder or waiter is gone, so the
//! map only contains ids that are currently busy.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document_id`.
    pub async fn acquire(&self, document_id: &str) -> DocumentGuard {
        let mutex = self
            .inner
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let guard = mutex.lock_owned().await;
        DocumentGuard {
            guard: Some(guard),
            id: document_id.to_string(),
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of document ids currently locked or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Held for the duration of one operation on a document.
pub struct DocumentGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        // Release first so the strong count no longer includes this guard.
        self.guard.take();
        self.locks
            .remove_if(&self.id, |_, m| Arc::strong_count(m) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = DocumentLocks::new();
        {
            let _g = locks.acquire("doc_a").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = DocumentLocks::new();
        let _a = locks.acquire("doc_a").await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire("doc_b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_id_is_serialized() {
        let locks = DocumentLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _g = locks.acquire("doc_same").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}

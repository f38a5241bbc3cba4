//! In-memory store for uploaded bundles.
//!
//! The store holds at most `capacity` bundles; inserting past that evicts the oldest upload.

use fhir::Bundle;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bundles kept by [`BundleStore::new`].
pub const DEFAULT_BUNDLE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Inner {
    bundles: HashMap<String, Bundle>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct BundleStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl Default for BundleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUNDLE_CAPACITY)
    }

    /// A store that keeps the `capacity` most recent uploads (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Store `bundle` under a fresh id and return the id.
    pub async fn insert(&self, bundle: Bundle) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut inner = self.inner.write().await;
        while inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.bundles.remove(&oldest);
                tracing::debug!(bundle_id = %oldest, "evicted stored bundle");
            }
        }
        inner.order.push_back(id.clone());
        inner.bundles.insert(id.clone(), bundle);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Bundle> {
        self.inner.read().await.bundles.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.bundles.len()
    }
}

//! Keyed in-memory collections
//!
//! Uses `Arc<RwLock<HashMap>>` for shared concurrent access. The closure
//! passed to [`Collection::update`] runs under the collection write lock and
//! is applied all-or-nothing: if it returns an error the stored entity is
//! left untouched.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::StoreError;

/// A storable entity with a primary key
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Send + Sync + fmt::Display + 'static;

    /// Collection name used in errors and logs
    const NAME: &'static str;

    /// Returns the entity's primary key
    fn key(&self) -> Self::Key;
}

/// A thread-safe keyed collection of one entity type
///
/// Cloning is cheap and shares the underlying map, so a collection handle can
/// be handed to several services (the ledger and the adjudication engine both
/// read members through their own clone of the same collection).
pub struct Collection<T: Entity> {
    items: Arc<RwLock<HashMap<T::Key, T>>>,
    closed: Arc<AtomicBool>,
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self::open()
    }
}

impl<T: Entity> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("entity", &T::NAME)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T: Entity> Collection<T> {
    /// Opens an empty collection
    pub fn open() -> Self {
        tracing::debug!(entity = T::NAME, "opening collection");
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Closes the collection; all subsequent operations fail with
    /// [`StoreError::Closed`]
    pub fn close(&self) {
        tracing::debug!(entity = T::NAME, "closing collection");
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns true once the collection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Gets an entity by key
    pub async fn get(&self, key: &T::Key) -> Result<T, StoreError> {
        self.try_get(key)
            .await?
            .ok_or_else(|| StoreError::not_found(T::NAME, key))
    }

    /// Gets an entity by key, returning `None` when absent
    pub async fn try_get(&self, key: &T::Key) -> Result<Option<T>, StoreError> {
        self.guard()?;
        let items = self.items.read().await;
        Ok(items.get(key).cloned())
    }

    /// Inserts a new entity, failing on a duplicate key
    pub async fn insert(&self, item: T) -> Result<(), StoreError> {
        self.guard()?;
        let key = item.key();
        let mut items = self.items.write().await;
        if items.contains_key(&key) {
            return Err(StoreError::duplicate(T::NAME, &key));
        }
        items.insert(key, item);
        Ok(())
    }

    /// Inserts or replaces an entity
    pub async fn put(&self, item: T) -> Result<(), StoreError> {
        self.guard()?;
        let mut items = self.items.write().await;
        items.insert(item.key(), item);
        Ok(())
    }

    /// Applies a fallible mutation to one entity under the write lock
    ///
    /// The closure receives a working copy; the store is only updated when
    /// the closure succeeds, so a failed precondition check leaves the
    /// entity exactly as it was.
    pub async fn update<R, E, F>(&self, key: &T::Key, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        self.guard().map_err(E::from)?;
        let mut items = self.items.write().await;
        let current = items
            .get(key)
            .ok_or_else(|| E::from(StoreError::not_found(T::NAME, key)))?;
        let mut working = current.clone();
        let result = f(&mut working)?;
        items.insert(key.clone(), working);
        Ok(result)
    }

    /// Removes an entity, returning it
    ///
    /// Removal is the "consume" half of a move between collections: once it
    /// succeeds, no concurrent caller can observe the record here again.
    pub async fn remove(&self, key: &T::Key) -> Result<T, StoreError> {
        self.guard()?;
        let mut items = self.items.write().await;
        items
            .remove(key)
            .ok_or_else(|| StoreError::not_found(T::NAME, key))
    }

    /// Returns all entities matching the predicate
    ///
    /// This is a full scan; collections here are small enough that indexing
    /// by foreign key is not worth the bookkeeping.
    pub async fn find<P>(&self, mut pred: P) -> Result<Vec<T>, StoreError>
    where
        P: FnMut(&T) -> bool,
    {
        self.guard()?;
        let items = self.items.read().await;
        Ok(items.values().filter(|t| pred(t)).cloned().collect())
    }

    /// Returns all entities
    pub async fn all(&self) -> Result<Vec<T>, StoreError> {
        self.find(|_| true).await
    }

    /// Number of stored entities
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns true if no entities are stored
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: u32,
        qty: i64,
    }

    impl Entity for Widget {
        type Key = u32;
        const NAME: &'static str = "widget";

        fn key(&self) -> u32 {
            self.id
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 1, qty: 5 }).await.unwrap();
        assert_eq!(col.get(&1).await.unwrap().qty, 5);
        assert!(col.try_get(&2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_key() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 1, qty: 5 }).await.unwrap();
        let err = col.insert(Widget { id: 1, qty: 9 }).await.unwrap_err();
        assert!(err.is_duplicate());
        // Original untouched
        assert_eq!(col.get(&1).await.unwrap().qty, 5);
    }

    #[tokio::test]
    async fn update_applies_on_success() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 1, qty: 5 }).await.unwrap();
        let new_qty: i64 = col
            .update(&1, |w| {
                w.qty += 3;
                Ok::<_, StoreError>(w.qty)
            })
            .await
            .unwrap();
        assert_eq!(new_qty, 8);
        assert_eq!(col.get(&1).await.unwrap().qty, 8);
    }

    #[tokio::test]
    async fn update_rolls_back_on_closure_error() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 1, qty: 5 }).await.unwrap();
        let result: Result<(), StoreError> = col
            .update(&1, |w| {
                w.qty = -100;
                Err(StoreError::not_found("widget", "forced"))
            })
            .await;
        assert!(result.is_err());
        // Mutation on the working copy was discarded
        assert_eq!(col.get(&1).await.unwrap().qty, 5);
    }

    #[tokio::test]
    async fn remove_consumes_exactly_once() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 7, qty: 1 }).await.unwrap();
        let taken = col.remove(&7).await.unwrap();
        assert_eq!(taken.id, 7);
        assert!(matches!(
            col.remove(&7).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_filters_by_predicate() {
        let col: Collection<Widget> = Collection::open();
        for id in 1..=5 {
            col.insert(Widget { id, qty: id as i64 }).await.unwrap();
        }
        let big = col.find(|w| w.qty >= 3).await.unwrap();
        assert_eq!(big.len(), 3);
    }

    #[tokio::test]
    async fn closed_collection_rejects_operations() {
        let col: Collection<Widget> = Collection::open();
        col.insert(Widget { id: 1, qty: 5 }).await.unwrap();
        col.close();
        assert!(matches!(col.get(&1).await, Err(StoreError::Closed)));
        assert!(matches!(
            col.insert(Widget { id: 2, qty: 1 }).await,
            Err(StoreError::Closed)
        ));
    }
}

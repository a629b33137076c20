//! In-memory store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::types::{Thing, ThingWithId};
use crate::Store;

#[derive(Debug)]
struct Inner {
    /// `None` once `i64::MAX` has been handed out.
    next_id: Option<i64>,
    things: HashMap<i64, Thing>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            next_id: Some(0),
            things: HashMap::new(),
        }
    }
}

/// A [`Store`] keeping everything in one map behind a single reader/writer lock.
///
/// The key counter lives under the same lock as the map, so assignment and
/// insertion are one atomic step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store. The first key assigned is `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored things.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().things.len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().things.is_empty()
    }
}

impl Store for MemoryStore {
    fn add_thing(&self, thing: Thing) -> Result<ThingWithId> {
        let mut inner = self.inner.write();

        let id = inner.next_id.ok_or(StoreError::KeysExhausted)?;
        inner.next_id = id.checked_add(1);
        inner.things.insert(id, thing.clone());

        tracing::debug!(id, name = %thing.name, "Stored thing");
        Ok(ThingWithId {
            id,
            name: thing.name,
        })
    }

    fn list_things(&self) -> Result<Vec<ThingWithId>> {
        let inner = self.inner.read();

        let mut things: Vec<ThingWithId> = inner
            .things
            .iter()
            .map(|(id, thing)| ThingWithId {
                id: *id,
                name: thing.name.clone(),
            })
            .collect();
        things.sort_unstable_by_key(|t| t.id);
        Ok(things)
    }
}

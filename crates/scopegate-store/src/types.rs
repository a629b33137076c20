//! Resource types held by the store.

use serde::{Deserialize, Serialize};

/// A resource as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    /// Display name.
    pub name: String,
}

/// A stored resource with its assigned key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingWithId {
    /// Assigned key, unique and never reused.
    pub id: i64,
    /// Display name.
    pub name: String,
}

impl Thing {
    /// Create a new thing.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

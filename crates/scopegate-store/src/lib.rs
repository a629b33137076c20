//! Resource store for scopegate.
//!
//! The gate admits requests; this crate holds what they create. Handlers only
//! see the [`Store`] trait, so the backend can be swapped without touching
//! the gateway.
//!
//! # Example
//!
//! ```
//! use scopegate_store::{MemoryStore, Store, Thing};
//!
//! let store = MemoryStore::new();
//! let created = store.add_thing(Thing::new("widget")).unwrap();
//! assert_eq!(created.id, 0);
//! assert_eq!(store.list_things().unwrap(), vec![created]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use types::{Thing, ThingWithId};

/// Operations the resource handlers need.
pub trait Store: Send + Sync {
    /// Store a thing under the next key.
    ///
    /// Keys start at `0`, increase by one and are never reused.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KeysExhausted` when no key is left, or a backend error.
    fn add_thing(&self, thing: Thing) -> Result<ThingWithId>;

    /// List every stored thing in ascending key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_things(&self) -> Result<Vec<ThingWithId>>;
}

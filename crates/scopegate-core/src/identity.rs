//! Authenticated identity and permission sets.
//!
//! An [`Identity`] is produced once per request by the identity extractor and
//! never outlives that request.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// An unordered, de-duplicated set of permission (scope) strings.
///
/// Backed by a `BTreeSet` so iteration and `Debug` output are deterministic.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Create an empty permission set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a space-delimited OAuth `scope` claim.
    #[must_use]
    pub fn from_scope_claim(scope: &str) -> Self {
        scope.split_whitespace().collect()
    }

    /// Add a permission to the set.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPermission` for empty strings or strings
    /// containing whitespace.
    pub fn insert(&mut self, permission: impl Into<String>) -> Result<()> {
        let permission = permission.into();
        if permission.is_empty() || permission.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidPermission(permission));
        }
        self.0.insert(permission);
        Ok(())
    }

    /// Returns `true` if the permission is granted.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Return the required permissions that are not granted, in input order.
    pub fn missing<'a, I>(&self, required: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required.into_iter().filter(|p| !self.contains(p)).collect()
    }

    /// Number of granted permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over granted permissions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

/// Collects permissions, silently skipping empty or whitespace-bearing entries.
impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        for permission in iter {
            let _ = set.insert(permission);
        }
        set
    }
}

impl Extend<String> for PermissionSet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        for permission in iter {
            let _ = self.insert(permission);
        }
    }
}

/// An authenticated caller.
///
/// Created by the identity extractor for one request; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    subject: String,
    permissions: PermissionSet,
}

impl Identity {
    /// Create an identity for `subject` holding `permissions`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptySubject` if the subject is blank.
    pub fn new(subject: impl Into<String>, permissions: PermissionSet) -> Result<Self> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(CoreError::EmptySubject);
        }
        Ok(Self {
            subject,
            permissions,
        })
    }

    /// The opaque subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The granted permission set.
    #[must_use]
    pub const fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

//! Request-scoped context shared between pipeline stages.

use std::sync::Arc;

use scopegate_core::Identity;

/// Per-request values, inserted into the request extensions by the identity
/// extractor and read by every later stage.
///
/// The identity slot is written once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    identity: Option<Arc<Identity>>,
}

impl RequestContext {
    /// A context with no verified caller.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { identity: None }
    }

    /// A context for a verified caller.
    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(Arc::new(identity)),
        }
    }

    /// The verified caller, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    /// The caller's subject, for logging.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.identity().map(Identity::subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopegate_core::PermissionSet;

    #[test]
    fn anonymous_has_no_identity() {
        let ctx = RequestContext::anonymous();
        assert!(ctx.identity().is_none());
        assert!(ctx.subject().is_none());
        assert!(RequestContext::default().identity().is_none());
    }

    #[test]
    fn clones_share_the_identity() {
        let identity = Identity::new("user_1", PermissionSet::from_iter(["read:things"])).unwrap();
        let ctx = RequestContext::authenticated(identity);
        let copy = ctx.clone();

        assert_eq!(copy.subject(), Some("user_1"));
        assert!(std::ptr::eq(
            ctx.identity().unwrap(),
            copy.identity().unwrap()
        ));
    }
}

//! Authorization decisions.
//!
//! A [`Decider`] answers one question: may the caller in this context invoke
//! an operation protected by `scheme` with these required scopes? The schema
//! validator calls it for every requirement the matched operation declares.

use std::fmt;

use scopegate_contract::SecurityRequirement;

use crate::context::RequestContext;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The operation names a security scheme this gate does not understand.
    UnsupportedScheme,
    /// No verified identity is present.
    MissingIdentity,
    /// The identity lacks at least one required scope.
    InsufficientScopes,
}

impl DenyReason {
    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::MissingIdentity => "missing_identity",
            Self::InsufficientScopes => "insufficient_scopes",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The caller may proceed.
    Admit,
    /// The caller is rejected.
    Deny(DenyReason),
}

impl AuthorizationOutcome {
    /// Returns `true` for [`AuthorizationOutcome::Admit`].
    #[must_use]
    pub const fn is_admit(self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// Decides whether a request context satisfies one security requirement.
///
/// Implementations must be deterministic: the same inputs always yield the
/// same outcome.
pub trait Decider: Send + Sync {
    /// Decide for a single `(scheme, required_scopes)` requirement.
    fn decide(
        &self,
        ctx: &RequestContext,
        scheme: &str,
        required_scopes: &[String],
    ) -> AuthorizationOutcome;
}

/// The bearer-scope decider.
///
/// Understands exactly one scheme. The caller must be present and hold every
/// required scope; an empty scope list admits any verified caller.
#[derive(Debug, Clone)]
pub struct ScopeDecider {
    scheme: String,
}

impl ScopeDecider {
    /// Scheme name used when none is configured.
    pub const DEFAULT_SCHEME: &'static str = "BearerAuth";

    /// Create a decider for the named scheme.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    /// The scheme this decider understands.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl Default for ScopeDecider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SCHEME)
    }
}

impl Decider for ScopeDecider {
    fn decide(
        &self,
        ctx: &RequestContext,
        scheme: &str,
        required_scopes: &[String],
    ) -> AuthorizationOutcome {
        if scheme != self.scheme {
            return AuthorizationOutcome::Deny(DenyReason::UnsupportedScheme);
        }

        let Some(identity) = ctx.identity() else {
            return AuthorizationOutcome::Deny(DenyReason::MissingIdentity);
        };

        let missing = identity
            .permissions()
            .missing(required_scopes.iter().map(String::as_str));
        if !missing.is_empty() {
            tracing::info!(
                subject = %identity.subject(),
                scheme,
                missing = ?missing,
                "Caller lacks required scopes"
            );
            return AuthorizationOutcome::Deny(DenyReason::InsufficientScopes);
        }

        AuthorizationOutcome::Admit
    }
}

/// Evaluate an operation's security alternatives.
///
/// Alternatives are combined with OR and the requirements inside one
/// alternative with AND. The first satisfied alternative admits; otherwise the
/// first alternative's denial is returned. An empty list admits.
pub fn decide_operation<D>(
    decider: &D,
    ctx: &RequestContext,
    alternatives: &[SecurityRequirement],
) -> AuthorizationOutcome
where
    D: Decider + ?Sized,
{
    let mut first_denial = None;

    for alternative in alternatives {
        let denial = alternative.requirements.iter().find_map(|requirement| {
            match decider.decide(ctx, &requirement.scheme, &requirement.scopes) {
                AuthorizationOutcome::Admit => None,
                AuthorizationOutcome::Deny(reason) => Some(reason),
            }
        });

        match denial {
            None => return AuthorizationOutcome::Admit,
            Some(reason) => {
                first_denial.get_or_insert(reason);
            }
        }
    }

    first_denial.map_or(AuthorizationOutcome::Admit, AuthorizationOutcome::Deny)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopegate_contract::OperationRequirement;
    use scopegate_core::{Identity, PermissionSet};

    fn ctx(permissions: &[&str]) -> RequestContext {
        let identity = Identity::new(
            "user_1",
            permissions.iter().copied().collect::<PermissionSet>(),
        )
        .unwrap();
        RequestContext::authenticated(identity)
    }

    fn scopes(scopes: &[&str]) -> Vec<String> {
        scopes.iter().map(ToString::to_string).collect()
    }

    fn requirement(scheme: &str, required: &[&str]) -> SecurityRequirement {
        SecurityRequirement {
            requirements: vec![OperationRequirement {
                scheme: scheme.to_string(),
                scopes: scopes(required),
            }],
        }
    }

    #[test]
    fn unknown_scheme_fails_closed() {
        let decider = ScopeDecider::default();
        assert_eq!(
            decider.decide(&ctx(&["write:things"]), "ApiKeyAuth", &[]),
            AuthorizationOutcome::Deny(DenyReason::UnsupportedScheme)
        );
        // Scheme is checked before identity.
        assert_eq!(
            decider.decide(&RequestContext::anonymous(), "ApiKeyAuth", &[]),
            AuthorizationOutcome::Deny(DenyReason::UnsupportedScheme)
        );
    }

    #[test]
    fn missing_identity_is_denied() {
        let decider = ScopeDecider::default();
        assert_eq!(
            decider.decide(&RequestContext::anonymous(), "BearerAuth", &[]),
            AuthorizationOutcome::Deny(DenyReason::MissingIdentity)
        );
        assert_eq!(
            decider.decide(
                &RequestContext::anonymous(),
                "BearerAuth",
                &scopes(&["write:things"])
            ),
            AuthorizationOutcome::Deny(DenyReason::MissingIdentity)
        );
    }

    #[test]
    fn empty_scope_list_admits_any_identity() {
        let decider = ScopeDecider::default();
        assert!(decider.decide(&ctx(&[]), "BearerAuth", &[]).is_admit());
        assert!(decider
            .decide(&ctx(&["read:things"]), "BearerAuth", &[])
            .is_admit());
    }

    #[test]
    fn scope_containment() {
        let decider = ScopeDecider::default();
        let required = scopes(&["write:things", "read:things"]);

        assert_eq!(
            decider.decide(&ctx(&["read:things"]), "BearerAuth", &required),
            AuthorizationOutcome::Deny(DenyReason::InsufficientScopes)
        );
        assert_eq!(
            decider.decide(&ctx(&[]), "BearerAuth", &required),
            AuthorizationOutcome::Deny(DenyReason::InsufficientScopes)
        );
        assert!(decider
            .decide(&ctx(&["read:things", "write:things"]), "BearerAuth", &required)
            .is_admit());
        assert!(decider
            .decide(
                &ctx(&["admin", "write:things", "read:things"]),
                "BearerAuth",
                &required
            )
            .is_admit());
    }

    #[test]
    fn scope_order_is_irrelevant() {
        let decider = ScopeDecider::default();
        let identity = ctx(&["a", "b", "c"]);
        let forward = decider.decide(&identity, "BearerAuth", &scopes(&["a", "b", "c"]));
        let backward = decider.decide(&identity, "BearerAuth", &scopes(&["c", "b", "a"]));
        assert_eq!(forward, backward);
        assert!(forward.is_admit());
    }

    #[test]
    fn decisions_are_repeatable() {
        let decider = ScopeDecider::default();
        let identity = ctx(&["read:things"]);
        let required = scopes(&["write:things"]);

        let first = decider.decide(&identity, "BearerAuth", &required);
        for _ in 0..10 {
            assert_eq!(decider.decide(&identity, "BearerAuth", &required), first);
        }
    }

    #[test]
    fn configured_scheme_name() {
        let decider = ScopeDecider::new("OAuth2");
        assert_eq!(decider.scheme(), "OAuth2");
        assert!(decider.decide(&ctx(&[]), "OAuth2", &[]).is_admit());
        assert_eq!(
            decider.decide(&ctx(&[]), "BearerAuth", &[]),
            AuthorizationOutcome::Deny(DenyReason::UnsupportedScheme)
        );
    }

    #[test]
    fn any_satisfied_alternative_admits() {
        let decider = ScopeDecider::default();
        let alternatives = vec![
            requirement("BearerAuth", &["admin"]),
            requirement("BearerAuth", &["write:things"]),
        ];

        assert!(decide_operation(&decider, &ctx(&["write:things"]), &alternatives).is_admit());
        assert_eq!(
            decide_operation(&decider, &ctx(&["read:things"]), &alternatives),
            AuthorizationOutcome::Deny(DenyReason::InsufficientScopes)
        );
    }

    #[test]
    fn every_requirement_in_an_alternative_must_hold() {
        let decider = ScopeDecider::default();
        let alternatives = vec![SecurityRequirement {
            requirements: vec![
                OperationRequirement {
                    scheme: "BearerAuth".to_string(),
                    scopes: scopes(&["read:things"]),
                },
                OperationRequirement {
                    scheme: "ApiKeyAuth".to_string(),
                    scopes: vec![],
                },
            ],
        }];

        assert_eq!(
            decide_operation(&decider, &ctx(&["read:things"]), &alternatives),
            AuthorizationOutcome::Deny(DenyReason::UnsupportedScheme)
        );
    }

    #[test]
    fn first_alternative_denial_is_reported() {
        let decider = ScopeDecider::default();
        let alternatives = vec![
            requirement("BearerAuth", &["write:things"]),
            requirement("ApiKeyAuth", &[]),
        ];

        assert_eq!(
            decide_operation(&decider, &RequestContext::anonymous(), &alternatives),
            AuthorizationOutcome::Deny(DenyReason::MissingIdentity)
        );
    }

    #[test]
    fn no_alternatives_admit() {
        let decider = ScopeDecider::default();
        assert!(decide_operation(&decider, &RequestContext::anonymous(), &[]).is_admit());
    }
}

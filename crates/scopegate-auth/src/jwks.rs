//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! This module fetches public keys from the issuer's JWKS endpoint and caches
//! them for efficient validation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// JWKS response from the issuer.
#[derive(Debug, Deserialize)]
pub struct JwksResponse {
    /// The list of keys.
    pub keys: Vec<JwkKey>,
}

/// A single JWK (JSON Web Key).
#[derive(Debug, Deserialize)]
pub struct JwkKey {
    /// Key type (`RSA` or `OKP`).
    pub kty: String,
    /// Curve for `OKP` keys (e.g., "Ed25519").
    pub crv: Option<String>,
    /// Ed25519 public key (base64url encoded).
    pub x: Option<String>,
    /// RSA modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public exponent (base64url encoded).
    pub e: Option<String>,
    /// Key ID.
    pub kid: Option<String>,
    /// Key use (e.g., "sig").
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// Algorithm (e.g., `RS256`).
    pub alg: Option<String>,
}

/// Key families the validator can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA keys, verified with `RS256`/`RS384`/`RS512`.
    Rsa,
    /// Ed25519 keys, verified with `EdDSA`.
    Ed25519,
}

impl KeyFamily {
    /// Returns `true` if a key of this family can verify `alg`.
    #[must_use]
    pub const fn accepts(self, alg: Algorithm) -> bool {
        match self {
            Self::Rsa => matches!(alg, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512),
            Self::Ed25519 => matches!(alg, Algorithm::EdDSA),
        }
    }
}

/// A decoded verification key together with its family.
#[derive(Clone)]
pub struct VerificationKey {
    /// Decoding key for `jsonwebtoken`.
    pub key: DecodingKey,
    /// Which algorithms the key is valid for.
    pub family: KeyFamily,
}

/// Minimum spacing between fetches triggered by an unknown `kid` or
/// following a failed fetch.
const REFETCH_BACKOFF: Duration = Duration::from_secs(10);

/// Keys from the last successful fetch.
#[derive(Default)]
struct KeySet {
    keys: HashMap<String, VerificationKey>,
    fetched_at: Option<Instant>,
    last_failure: Option<(Instant, String)>,
}

impl KeySet {
    fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }

    /// Reason of a fetch failure still inside the backoff window.
    fn recent_failure(&self) -> Option<&str> {
        self.last_failure
            .as_ref()
            .filter(|(at, _)| at.elapsed() < REFETCH_BACKOFF)
            .map(|(_, reason)| reason.as_str())
    }
}

/// Fetches the issuer's key set and keeps it cached.
///
/// A stale key set is still used when a refresh fails, so a JWKS outage only
/// affects keys that were never seen.
pub struct JwksProvider {
    config: AuthConfig,
    client: reqwest::Client,
    cache: RwLock<KeySet>,
}

impl JwksProvider {
    /// Create a provider. Nothing is fetched until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the HTTP client cannot be built.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            cache: RwLock::new(KeySet::default()),
        })
    }

    /// Look up the key for `kid`, refreshing the set when it is stale or the
    /// key is unknown.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if the issuer does not publish `kid`,
    /// or `AuthError::JwksFetchFailed` if the set cannot be fetched and no
    /// cached copy of the key exists.
    pub async fn get_key(&self, kid: &str) -> Result<VerificationKey> {
        let max_age = Duration::from_secs(self.config.jwks_refresh_seconds);

        let cached = {
            let cache = self.cache.read();
            let age = cache.age();
            let key = cache.keys.get(kid).cloned();
            match (key, age) {
                (Some(key), Some(age)) if age < max_age => return Ok(key),
                (None, Some(age)) if age < REFETCH_BACKOFF => {
                    return Err(AuthError::KeyNotFound(kid.to_string()));
                }
                (key, _) => match cache.recent_failure() {
                    Some(reason) => {
                        return key.ok_or_else(|| AuthError::JwksFetchFailed(reason.to_string()));
                    }
                    None => key,
                },
            }
        };

        if let Err(err) = self.refresh_keys().await {
            let reason = match &err {
                AuthError::JwksFetchFailed(reason) => reason.clone(),
                other => other.to_string(),
            };
            self.cache.write().last_failure = Some((Instant::now(), reason));

            return cached.map_or(Err(err), |key| {
                tracing::warn!(kid, "JWKS refresh failed, using cached key");
                Ok(key)
            });
        }

        self.cache
            .read()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    async fn refresh_keys(&self) -> Result<()> {
        let jwks_url = self.config.jwks_url();
        tracing::debug!(url = %jwks_url, "Fetching JWKS");

        let response: JwksResponse = self
            .client
            .get(&jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let keys: HashMap<String, VerificationKey> = response
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.kid.as_ref()?;
                match Self::parse_key(jwk) {
                    Ok(key) => key.map(|key| (kid.clone(), key)),
                    Err(e) => {
                        tracing::warn!(kid = %kid, error = %e, "Skipping malformed JWK");
                        None
                    }
                }
            })
            .collect();

        tracing::debug!(count = keys.len(), "Cached JWKS keys");

        *self.cache.write() = KeySet {
            keys,
            fetched_at: Some(Instant::now()),
            last_failure: None,
        };

        Ok(())
    }

    /// Decode one JWK.
    ///
    /// Returns `Ok(None)` for keys that are not signing keys or use an
    /// unsupported type or curve.
    fn parse_key(jwk: &JwkKey) -> Result<Option<VerificationKey>> {
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            return Ok(None);
        }

        let key = match jwk.kty.as_str() {
            "RSA" => {
                let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                    return Err(AuthError::InvalidToken(
                        "RSA key missing n or e parameter".to_string(),
                    ));
                };
                VerificationKey {
                    key: DecodingKey::from_rsa_components(n, e)
                        .map_err(|e| AuthError::InvalidToken(format!("invalid RSA key: {e}")))?,
                    family: KeyFamily::Rsa,
                }
            }
            "OKP" if jwk.crv.as_deref() == Some("Ed25519") => {
                let x = jwk
                    .x
                    .as_deref()
                    .ok_or_else(|| AuthError::InvalidToken("Ed25519 key missing x".to_string()))?;
                let public_key = BASE64_URL_SAFE_NO_PAD
                    .decode(x)
                    .map_err(|e| AuthError::InvalidToken(format!("invalid base64: {e}")))?;
                VerificationKey {
                    key: DecodingKey::from_ed_der(&public_key),
                    family: KeyFamily::Ed25519,
                }
            }
            kty => {
                tracing::debug!(kty, crv = ?jwk.crv, "Ignoring unsupported JWK");
                return Ok(None);
            }
        };

        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RFC7517_MODULUS: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn ed25519_jwk(kid: &str) -> JwkKey {
        JwkKey {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            x: Some("ICPCdcaExEZlEbjEF5UVPW4pSLmhaJZDDAp4joy4wmM".to_string()),
            n: None,
            e: None,
            kid: Some(kid.to_string()),
            key_use: Some("sig".to_string()),
            alg: Some("EdDSA".to_string()),
        }
    }

    #[test]
    fn parse_ed25519_key() {
        let result = JwksProvider::parse_key(&ed25519_jwk("test-key")).unwrap();
        let key = result.unwrap();
        assert_eq!(key.family, KeyFamily::Ed25519);
        assert!(key.family.accepts(Algorithm::EdDSA));
        assert!(!key.family.accepts(Algorithm::RS256));
    }

    #[test]
    fn parse_rsa_key() {
        let key = JwkKey {
            kty: "RSA".to_string(),
            crv: None,
            x: None,
            n: Some(RFC7517_MODULUS.to_string()),
            e: Some("AQAB".to_string()),
            kid: Some("rsa-key".to_string()),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
        };

        let result = JwksProvider::parse_key(&key).unwrap().unwrap();
        assert_eq!(result.family, KeyFamily::Rsa);
        assert!(result.family.accepts(Algorithm::RS256));
    }

    #[test]
    fn rsa_key_without_modulus_is_rejected() {
        let key = JwkKey {
            kty: "RSA".to_string(),
            crv: None,
            x: None,
            n: None,
            e: Some("AQAB".to_string()),
            kid: Some("rsa-key".to_string()),
            key_use: None,
            alg: None,
        };

        assert!(JwksProvider::parse_key(&key).is_err());
    }

    #[test]
    fn skip_unsupported_curve() {
        let key = JwkKey {
            crv: Some("X25519".to_string()),
            ..ed25519_jwk("test-key")
        };

        assert!(JwksProvider::parse_key(&key).unwrap().is_none());
    }

    #[test]
    fn skip_encryption_keys() {
        let key = JwkKey {
            key_use: Some("enc".to_string()),
            ..ed25519_jwk("test-key")
        };

        assert!(JwksProvider::parse_key(&key).unwrap().is_none());
    }

    #[tokio::test]
    async fn get_key_fetches_once_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": "ICPCdcaExEZlEbjEF5UVPW4pSLmhaJZDDAp4joy4wmM",
                    "kid": "k1",
                    "use": "sig",
                    "alg": "EdDSA"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        let first = provider.get_key("k1").await.unwrap();
        let second = provider.get_key("k1").await.unwrap();
        assert_eq!(first.family, KeyFamily::Ed25519);
        assert_eq!(second.family, KeyFamily::Ed25519);
    }

    #[tokio::test]
    async fn get_key_reports_unknown_kid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": []
            })))
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        let err = provider.get_key("missing").await.err().unwrap();
        assert!(matches!(err, AuthError::KeyNotFound(kid) if kid == "missing"));
    }

    #[tokio::test]
    async fn fetch_failure_is_a_service_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        let err = provider.get_key("k1").await.err().unwrap();
        assert!(matches!(err, AuthError::JwksFetchFailed(_)));
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn failed_fetch_is_not_retried_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        for _ in 0..3 {
            assert!(matches!(
                provider.get_key("k1").await,
                Err(AuthError::JwksFetchFailed(_))
            ));
        }
    }

    #[tokio::test]
    async fn malformed_keys_do_not_poison_the_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [
                    { "kty": "RSA", "kid": "broken", "e": "AQAB" },
                    {
                        "kty": "OKP",
                        "crv": "Ed25519",
                        "x": "ICPCdcaExEZlEbjEF5UVPW4pSLmhaJZDDAp4joy4wmM",
                        "kid": "k1"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        assert!(provider.get_key("k1").await.is_ok());
        assert!(matches!(
            provider.get_key("broken").await,
            Err(AuthError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_kid_does_not_refetch_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": "ICPCdcaExEZlEbjEF5UVPW4pSLmhaJZDDAp4joy4wmM",
                    "kid": "k1"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JwksProvider::new(AuthConfig::new(server.uri())).unwrap();

        provider.get_key("k1").await.unwrap();
        for _ in 0..3 {
            assert!(matches!(
                provider.get_key("rotated").await,
                Err(AuthError::KeyNotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn stale_key_survives_refresh_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": "ICPCdcaExEZlEbjEF5UVPW4pSLmhaJZDDAp4joy4wmM",
                    "kid": "k1"
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = AuthConfig {
            jwks_refresh_seconds: 0,
            ..AuthConfig::new(server.uri())
        };
        let provider = JwksProvider::new(config).unwrap();

        provider.get_key("k1").await.unwrap();
        let again = provider.get_key("k1").await.unwrap();
        assert_eq!(again.family, KeyFamily::Ed25519);
    }
}

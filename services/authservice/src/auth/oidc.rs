//! OIDC/JWKS verification of upstream credentials.
//!
//! # Purpose
//! Validates upstream JWTs presented to `/auth/exchange` against the
//! configured issuers and turns them into a [`PrincipalIdentity`].
//!
//! # Key invariants
//! - Only ES256 upstream tokens are accepted, and the JWK must agree with the
//!   header algorithm and curve.
//! - The unverified payload is read only to pick the issuer config; every
//!   claim returned comes from the signature-checked decode.
//! - `iat` in the future beyond the clock skew is rejected.
//!
//! # Caching
//! Discovery documents and JWKS are cached per URL with TTLs. An unknown `kid`
//! forces one JWKS refresh before failing, which covers upstream key rotation.
use crate::auth::external::{ExternalError, ExternalVerifier, PrincipalIdentity};
use crate::auth::idp::{ClaimMappings, ExternalIssuerConfig};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OidcExternalVerifier {
    client: reqwest::Client,
    issuers: Arc<Vec<ExternalIssuerConfig>>,
    jwks: TtlCache<JwkSet>,
    discovery: TtlCache<String>,
    clock_skew_seconds: u64,
}

/// URL-keyed cache whose entries go stale after a fixed TTL.
#[derive(Debug, Clone)]
struct TtlCache<V> {
    entries: Arc<DashMap<String, (V, Instant)>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn fresh(&self, url: &str) -> Option<V> {
        let entry = self.entries.get(url)?;
        let (value, stored_at) = entry.value();
        (stored_at.elapsed() < self.ttl).then(|| value.clone())
    }

    fn store(&self, url: &str, value: V) {
        self.entries.insert(url.to_string(), (value, Instant::now()));
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

impl OidcExternalVerifier {
    pub fn new(
        issuers: Vec<ExternalIssuerConfig>,
        jwks_ttl: Duration,
        discovery_ttl: Duration,
        clock_skew_seconds: u64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuers: Arc::new(issuers),
            jwks: TtlCache::new(jwks_ttl),
            discovery: TtlCache::new(discovery_ttl),
            clock_skew_seconds,
        }
    }

    pub fn with_issuers(issuers: Vec<ExternalIssuerConfig>) -> Self {
        Self::new(issuers, Duration::from_secs(3600), Duration::from_secs(3600), 60)
    }

    async fn validate(&self, token: &str) -> Result<PrincipalIdentity, ExternalError> {
        if self.issuers.is_empty() {
            return Err(ExternalError::NoIssuers);
        }
        let header = decode_header(token)?;
        if header.alg != Algorithm::ES256 {
            return Err(ExternalError::UnsupportedAlgorithm);
        }
        let kid = header.kid.as_deref().ok_or(ExternalError::MissingKeyId)?;

        let claimed_issuer = UpstreamClaims::peek(token)?
            .string("iss")
            .ok_or(ExternalError::MissingIssuer)?;
        let issuer_cfg = self
            .issuers
            .iter()
            .find(|cfg| cfg.issuer == claimed_issuer)
            .ok_or(ExternalError::IssuerNotAllowed)?;

        let jwks_url = self.jwks_url_for(issuer_cfg).await?;
        let key = self.decoding_key(&jwks_url, kid).await?;

        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&[issuer_cfg.issuer.as_str()]);
        validation.set_audience(&issuer_cfg.audiences);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = self.clock_skew_seconds;

        let verified = UpstreamClaims(decode::<Value>(token, &key, &validation)?.claims);
        verified.check_issued_at(Utc::now().timestamp(), self.clock_skew_seconds)?;
        verified.into_identity(issuer_cfg)
    }

    async fn jwks_url_for(&self, issuer_cfg: &ExternalIssuerConfig) -> Result<String, ExternalError> {
        if let Some(url) = &issuer_cfg.jwks_url {
            return Ok(url.clone());
        }
        let discovery_url = match &issuer_cfg.discovery_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/.well-known/openid-configuration",
                issuer_cfg.issuer.trim_end_matches('/')
            ),
        };
        if let Some(jwks_url) = self.discovery.fresh(&discovery_url) {
            return Ok(jwks_url);
        }
        let doc: DiscoveryDocument = self.fetch_json(&discovery_url).await?;
        self.discovery.store(&discovery_url, doc.jwks_uri.clone());
        Ok(doc.jwks_uri)
    }

    /// Looks `kid` up in the cached key set, refetching once on a miss.
    async fn decoding_key(&self, jwks_url: &str, kid: &str) -> Result<DecodingKey, ExternalError> {
        if let Some(set) = self.jwks.fresh(jwks_url)
            && let Some(jwk) = find_jwk(&set, kid)
        {
            return es256_decoding_key(jwk);
        }
        let set: JwkSet = self.fetch_json(jwks_url).await?;
        self.jwks.store(jwks_url, set.clone());
        let jwk = find_jwk(&set, kid).ok_or(ExternalError::JwksKeyNotFound)?;
        es256_decoding_key(jwk)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ExternalError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl ExternalVerifier for OidcExternalVerifier {
    async fn verify_external(&self, token: &str) -> Result<PrincipalIdentity, ExternalError> {
        self.validate(token).await
    }
}

fn find_jwk<'a>(set: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    set.keys
        .iter()
        .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
}

fn es256_decoding_key(jwk: &Jwk) -> Result<DecodingKey, ExternalError> {
    match (jwk.common.key_algorithm, &jwk.algorithm) {
        (None, _) => Err(ExternalError::InvalidJwk("missing alg".to_string())),
        (Some(KeyAlgorithm::ES256), AlgorithmParameters::EllipticCurve(ec))
            if ec.curve == EllipticCurve::P256 =>
        {
            Ok(DecodingKey::from_jwk(jwk)?)
        }
        (Some(KeyAlgorithm::ES256), AlgorithmParameters::EllipticCurve(_)) => {
            Err(ExternalError::InvalidJwk("unexpected EC curve".to_string()))
        }
        (Some(KeyAlgorithm::ES256), _) => Err(ExternalError::InvalidJwk("kty mismatch".to_string())),
        (Some(_), _) => Err(ExternalError::InvalidJwk("alg mismatch".to_string())),
    }
}

/// JSON payload of an upstream token.
struct UpstreamClaims(Value);

impl UpstreamClaims {
    /// Decodes the payload segment without checking the signature.
    fn peek(token: &str) -> Result<Self, ExternalError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next()) {
            (Some(_), Some(payload)) => payload,
            _ => return Err(ExternalError::InvalidClaim("token format".to_string())),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| ExternalError::InvalidClaim("token payload".to_string()))?;
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|err| ExternalError::InvalidClaim(format!("token payload: {err}")))
    }

    fn string(&self, name: &str) -> Option<String> {
        self.0.get(name)?.as_str().map(str::to_string)
    }

    /// A groups claim may be a single string or an array; non-string items are skipped.
    fn groups(&self, mappings: &ClaimMappings) -> Vec<String> {
        let claim = mappings
            .groups_claim
            .as_deref()
            .and_then(|name| self.0.get(name));
        match claim {
            Some(Value::String(group)) => vec![group.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn check_issued_at(&self, now: i64, skew_seconds: u64) -> Result<(), ExternalError> {
        let iat = self
            .0
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or_else(|| ExternalError::InvalidClaim("iat".to_string()))?;
        let skew = i64::try_from(skew_seconds).unwrap_or(i64::MAX);
        if iat > now.saturating_add(skew) {
            return Err(ExternalError::InvalidClaim("iat in future".to_string()));
        }
        Ok(())
    }

    fn into_identity(self, issuer_cfg: &ExternalIssuerConfig) -> Result<PrincipalIdentity, ExternalError> {
        let mappings = &issuer_cfg.claim_mappings;
        let subject = self
            .string(&mappings.subject_claim)
            .filter(|subject| !subject.is_empty())
            .ok_or(ExternalError::MissingSubject)?;
        Ok(PrincipalIdentity {
            issuer: issuer_cfg.issuer.clone(),
            subject,
            groups: self.groups(mappings),
        })
    }
}

//! JSON Web Tokens for the card registry.
//!
//! Compact form: `base64url(header) "." base64url(body) "." base64url(signature)`,
//! unpadded. The signature covers the first two segments joined by `"."`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cardkit_core::{now_secs, PrivateKey, PublicKey};

use crate::error::{AuthError, Result};
use crate::signer::AccessTokenSigner;

pub const JWT_TYPE: &str = "JWT";
pub const JWT_CONTENT_TYPE: &str = "virgil-jwt;v=1";

/// Default token lifetime when a config does not set one.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

const ISSUER_PREFIX: &str = "virgil-";
const SUBJECT_PREFIX: &str = "identity-";

/// Free-form claims attached to a token body.
pub type AdditionalData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub kid: String,
    pub typ: String,
    pub cty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtBody {
    /// `virgil-<app id>`.
    pub iss: String,
    /// `identity-<identity>`.
    pub sub: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds.
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ada: Option<AdditionalData>,
}

impl JwtBody {
    pub fn app_id(&self) -> &str {
        self.iss.strip_prefix(ISSUER_PREFIX).unwrap_or(&self.iss)
    }

    pub fn identity(&self) -> &str {
        self.sub.strip_prefix(SUBJECT_PREFIX).unwrap_or(&self.sub)
    }
}

/// A signed token.
///
/// Keeps the exact encoded `header.body` it was built or parsed from, so
/// signatures check against the bytes that were actually signed.
#[derive(Clone, PartialEq)]
pub struct Jwt {
    header: JwtHeader,
    body: JwtBody,
    signature: Vec<u8>,
    unsigned: String,
    compact: String,
}

impl Jwt {
    /// Assemble a token from its parts.
    pub fn new(header: JwtHeader, body: JwtBody, signature: Vec<u8>) -> Result<Self> {
        let unsigned = encode_unsigned(&header, &body)?;
        let compact = format!("{}.{}", unsigned, URL_SAFE_NO_PAD.encode(&signature));
        Ok(Self {
            header,
            body,
            signature,
            unsigned,
            compact,
        })
    }

    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    pub fn body(&self) -> &JwtBody {
        &self.body
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The identity this token was issued for.
    pub fn identity(&self) -> &str {
        self.body.identity()
    }

    /// The signed part, `base64url(header).base64url(body)`.
    pub fn unsigned_data(&self) -> &[u8] {
        self.unsigned.as_bytes()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.body.exp
    }

    pub fn as_str(&self) -> &str {
        &self.compact
    }
}

impl fmt::Display for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("header", &self.header)
            .field("identity", &self.identity())
            .field("exp", &self.body.exp)
            .finish_non_exhaustive()
    }
}

impl FromStr for Jwt {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let &[header_b64, body_b64, signature_b64] = parts.as_slice() else {
            return Err(AuthError::MalformedToken(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        };

        let header: JwtHeader = decode_segment(header_b64, "header")?;
        let body: JwtBody = decode_segment(body_b64, "body")?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| AuthError::MalformedToken(format!("signature: {e}")))?;

        Ok(Self {
            header,
            body,
            signature,
            unsigned: format!("{header_b64}.{body_b64}"),
            compact: s.to_string(),
        })
    }
}

fn encode_unsigned(header: &JwtHeader, body: &JwtBody) -> Result<String> {
    let header_json = serde_json::to_vec(header).map_err(|e| AuthError::Encoding(e.to_string()))?;
    let body_json = serde_json::to_vec(body).map_err(|e| AuthError::Encoding(e.to_string()))?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(body_json)
    ))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, name: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{name}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(format!("{name}: {e}")))
}

/// Settings for a [`JwtGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtGeneratorConfig {
    pub app_id: String,
    /// Identifier of the app key, written to the token header's `kid`.
    pub api_key_id: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Issues short-lived signed tokens for an application.
#[derive(Clone)]
pub struct JwtGenerator {
    api_key: PrivateKey,
    api_key_id: String,
    signer: Arc<dyn AccessTokenSigner>,
    app_id: String,
    ttl: Duration,
}

impl JwtGenerator {
    pub fn new(
        api_key: PrivateKey,
        api_key_id: impl Into<String>,
        signer: Arc<dyn AccessTokenSigner>,
        app_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            api_key,
            api_key_id: api_key_id.into(),
            signer,
            app_id: app_id.into(),
            ttl,
        }
    }

    pub fn from_config(
        api_key: PrivateKey,
        signer: Arc<dyn AccessTokenSigner>,
        config: &JwtGeneratorConfig,
    ) -> Self {
        Self::new(
            api_key,
            config.api_key_id.clone(),
            signer,
            config.app_id.clone(),
            Duration::from_secs(config.ttl_secs),
        )
    }

    /// Issue a token for `identity`, valid from now for the configured ttl.
    pub fn generate_token(
        &self,
        identity: &str,
        additional_data: Option<AdditionalData>,
    ) -> Result<Jwt> {
        self.generate_token_at(identity, additional_data, now_secs())
    }

    /// Issue a token with an explicit issue time.
    pub fn generate_token_at(
        &self,
        identity: &str,
        additional_data: Option<AdditionalData>,
        issued_at: i64,
    ) -> Result<Jwt> {
        if identity.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let header = JwtHeader {
            alg: self.signer.algorithm().to_string(),
            kid: self.api_key_id.clone(),
            typ: JWT_TYPE.to_string(),
            cty: JWT_CONTENT_TYPE.to_string(),
        };
        let body = JwtBody {
            iss: format!("{ISSUER_PREFIX}{}", self.app_id),
            sub: format!("{SUBJECT_PREFIX}{identity}"),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl),
            ada: additional_data,
        };

        let unsigned = encode_unsigned(&header, &body)?;
        let signature = self
            .signer
            .generate_token_signature(unsigned.as_bytes(), &self.api_key)?;

        tracing::debug!(identity, exp = body.exp, "issued access token");
        Jwt::new(header, body, signature)
    }
}

impl fmt::Debug for JwtGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtGenerator")
            .field("app_id", &self.app_id)
            .field("api_key_id", &self.api_key_id)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Checks tokens issued under one app key.
#[derive(Clone)]
pub struct JwtVerifier {
    api_public_key: PublicKey,
    api_key_id: String,
    signer: Arc<dyn AccessTokenSigner>,
}

impl JwtVerifier {
    pub fn new(
        api_public_key: PublicKey,
        api_key_id: impl Into<String>,
        signer: Arc<dyn AccessTokenSigner>,
    ) -> Self {
        Self {
            api_public_key,
            api_key_id: api_key_id.into(),
            signer,
        }
    }

    /// True when the token names this key, this algorithm, and its signature holds.
    pub fn verify_token(&self, token: &Jwt) -> bool {
        token.header().kid == self.api_key_id
            && token.header().alg == self.signer.algorithm()
            && self.signer.verify_token_signature(
                token.signature(),
                token.unsigned_data(),
                &self.api_public_key,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::CryptoTokenSigner;
    use cardkit_core::{Ed25519CardCrypto, KeyPair};

    fn generator(key: &KeyPair) -> (JwtGenerator, Arc<dyn AccessTokenSigner>) {
        let signer: Arc<dyn AccessTokenSigner> =
            Arc::new(CryptoTokenSigner::new(Arc::new(Ed25519CardCrypto::new())));
        let generator = JwtGenerator::new(
            key.private_key(),
            "key-1",
            Arc::clone(&signer),
            "app-42",
            Duration::from_secs(600),
        );
        (generator, signer)
    }

    #[test]
    fn test_generate_token_claims() {
        let key = KeyPair::from_seed(&[0x11; 32]);
        let (generator, _) = generator(&key);

        let token = generator.generate_token_at("alice", None, 1_000).unwrap();

        assert_eq!(token.identity(), "alice");
        assert_eq!(token.body().app_id(), "app-42");
        assert_eq!(token.body().iat, 1_000);
        assert_eq!(token.body().exp, 1_600);
        assert_eq!(token.header().kid, "key-1");
        assert_eq!(token.header().alg, "VEDS");
        assert_eq!(token.header().typ, "JWT");
        assert!(token.body().ada.is_none());
    }

    #[test]
    fn test_generate_token_needs_identity() {
        let key = KeyPair::from_seed(&[0x11; 32]);
        let (generator, _) = generator(&key);
        let err = generator.generate_token_at("", None, 1_000).unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentity));
    }

    #[test]
    fn test_generate_token_uses_wall_clock() {
        let key = KeyPair::from_seed(&[0x11; 32]);
        let (generator, _) = generator(&key);
        let before = now_secs();

        let token = generator.generate_token("alice", None).unwrap();

        assert!(token.body().iat >= before);
        assert_eq!(token.body().exp - token.body().iat, 600);
        assert!(!token.is_expired(token.body().iat));
        assert!(token.is_expired(token.body().exp));
    }

    #[test]
    fn test_token_string_roundtrip_and_verify() {
        let key = KeyPair::from_seed(&[0x11; 32]);
        let (generator, signer) = generator(&key);
        let mut ada = AdditionalData::new();
        ada.insert("role".into(), serde_json::json!("writer"));

        let token = generator.generate_token_at("bob", Some(ada), 50).unwrap();
        let compact = token.to_string();
        assert_eq!(compact.split('.').count(), 3);

        let parsed: Jwt = compact.parse().unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.identity(), "bob");
        assert_eq!(parsed.body().ada.as_ref().unwrap()["role"], "writer");

        let verifier = JwtVerifier::new(key.public_key(), "key-1", signer);
        assert!(verifier.verify_token(&parsed));
    }

    #[test]
    fn test_verify_rejects_other_key_or_kid() {
        let key = KeyPair::from_seed(&[0x11; 32]);
        let other = KeyPair::from_seed(&[0x12; 32]);
        let (generator, signer) = generator(&key);
        let token = generator.generate_token_at("bob", None, 50).unwrap();

        assert!(!JwtVerifier::new(other.public_key(), "key-1", Arc::clone(&signer)).verify_token(&token));
        assert!(!JwtVerifier::new(key.public_key(), "key-2", signer).verify_token(&token));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!("a.b".parse::<Jwt>(), Err(AuthError::MalformedToken(_))));
        assert!(matches!("a.b.c.d".parse::<Jwt>(), Err(AuthError::MalformedToken(_))));
        assert!(matches!("!!.!!.!!".parse::<Jwt>(), Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_config_default_ttl() {
        let config: JwtGeneratorConfig =
            serde_json::from_str(r#"{"app_id":"app","api_key_id":"kid"}"#).unwrap();
        assert_eq!(config.ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    }
}

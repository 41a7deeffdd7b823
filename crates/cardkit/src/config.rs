//! Configuration for the card manager.
//!
//! Everything has a default pointing at the public registry, so an empty
//! JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use cardkit_client::HttpCardClient;
use cardkit_core::{
    encoding, CardCrypto, PublicKey, TrustPolicy, TrustPolicyVerifier, VerifierCredentials,
    Whitelist,
};

use crate::error::{CardError, Result};

pub use cardkit_client::DEFAULT_SERVICE_URL;

/// Signer id the registry countersigns with.
pub const DEFAULT_AUTHORITY_SIGNER: &str = "virgil";

/// The registry's Ed25519 key, base64 DER.
pub const DEFAULT_AUTHORITY_PUBLIC_KEY: &str =
    "MCowBQYDK2VwAyEAljOYGANYiVq1WbvVvoYIKtvZi2ji9bAhxyu6iV/LF8M=";

/// A co-signer a whitelist accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub signer: String,
    /// Base64 public key, DER or raw.
    pub public_key: String,
}

/// Trust policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default = "default_true")]
    pub require_self_signature: bool,

    #[serde(default = "default_true")]
    pub require_authority_signature: bool,

    #[serde(default = "default_authority_signer")]
    pub authority_signer: String,

    /// Base64 public key, DER or raw.
    #[serde(default = "default_authority_public_key")]
    pub authority_public_key: String,

    /// Each inner list must be non-empty; a card passes a whitelist when any
    /// entry has a valid signature on it.
    #[serde(default)]
    pub whitelists: Vec<Vec<CredentialsConfig>>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            require_self_signature: true,
            require_authority_signature: true,
            authority_signer: default_authority_signer(),
            authority_public_key: default_authority_public_key(),
            whitelists: Vec::new(),
        }
    }
}

impl VerifierConfig {
    /// Turn the settings into a verifier, decoding every key.
    pub fn build(&self, crypto: Arc<dyn CardCrypto>) -> Result<TrustPolicyVerifier> {
        let authority_key = import_key(crypto.as_ref(), &self.authority_public_key)
            .map_err(|e| CardError::Config(format!("authority_public_key: {e}")))?;

        let mut policy = TrustPolicy::new(self.authority_signer.clone(), authority_key)
            .require_self_signature(self.require_self_signature)
            .require_authority_signature(self.require_authority_signature);

        for (index, entries) in self.whitelists.iter().enumerate() {
            let credentials = entries
                .iter()
                .map(|entry| {
                    import_key(crypto.as_ref(), &entry.public_key)
                        .map(|key| VerifierCredentials::new(entry.signer.clone(), key))
                        .map_err(|e| {
                            CardError::Config(format!("whitelist {index}, {}: {e}", entry.signer))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            let whitelist = Whitelist::new(credentials)
                .map_err(|e| CardError::Config(format!("whitelist {index}: {e}")))?;
            policy = policy.with_whitelist(whitelist);
        }

        Ok(TrustPolicyVerifier::new(crypto, policy))
    }
}

/// Registry connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_service_url")]
    pub service_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
        }
    }
}

impl ClientConfig {
    pub fn build(&self) -> HttpCardClient {
        HttpCardClient::new(self.service_url.clone())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardKitConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub verifier: VerifierConfig,
}

impl CardKitConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CardError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CardError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}

fn import_key(crypto: &dyn CardCrypto, encoded: &str) -> cardkit_core::Result<PublicKey> {
    crypto.import_public_key(&encoding::decode(encoded)?)
}

fn default_true() -> bool {
    true
}

fn default_authority_signer() -> String {
    DEFAULT_AUTHORITY_SIGNER.to_string()
}

fn default_authority_public_key() -> String {
    DEFAULT_AUTHORITY_PUBLIC_KEY.to_string()
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

//! Token signatures.

use std::sync::Arc;

use cardkit_core::{CardCrypto, PrivateKey, PublicKey};

use crate::error::Result;

/// Signs and checks the `header.body` part of a token.
pub trait AccessTokenSigner: Send + Sync {
    /// Value written to the token header's `alg`.
    fn algorithm(&self) -> &str;

    fn generate_token_signature(&self, token: &[u8], key: &PrivateKey) -> Result<Vec<u8>>;

    fn verify_token_signature(&self, signature: &[u8], token: &[u8], key: &PublicKey) -> bool;
}

/// Algorithm name written by [`CryptoTokenSigner`].
pub const CRYPTO_TOKEN_ALGORITHM: &str = "VEDS";

/// [`AccessTokenSigner`] backed by the card crypto capability.
#[derive(Clone)]
pub struct CryptoTokenSigner {
    crypto: Arc<dyn CardCrypto>,
}

impl CryptoTokenSigner {
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self { crypto }
    }
}

impl AccessTokenSigner for CryptoTokenSigner {
    fn algorithm(&self) -> &str {
        CRYPTO_TOKEN_ALGORITHM
    }

    fn generate_token_signature(&self, token: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
        Ok(self.crypto.generate_signature(token, key)?)
    }

    fn verify_token_signature(&self, signature: &[u8], token: &[u8], key: &PublicKey) -> bool {
        self.crypto.verify_signature(signature, token, key)
    }
}

//! Stored Reference Cipher
//!
//! Provider payment-method ids are stored encrypted. AES-256-GCM with a
//! random 12-byte nonce prefixed to the ciphertext, base64 encoded.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};

use checkout_core::{CheckoutError, Result};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct ReferenceCipher {
    key: aes_gcm::Key<Aes256Gcm>,
}

impl std::fmt::Debug for ReferenceCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCipher").finish_non_exhaustive()
    }
}

impl ReferenceCipher {
    pub fn new_from_base64(key_b64: &str) -> Result<Self> {
        let raw = general_purpose::STANDARD
            .decode(key_b64.trim().as_bytes())
            .map_err(|e| CheckoutError::Config(format!("Invalid CHECKOUT_ENCRYPTION_KEY: {e}")))?;
        if raw.len() != 32 {
            return Err(CheckoutError::Config(
                "CHECKOUT_ENCRYPTION_KEY must decode to 32 bytes".into(),
            ));
        }
        Ok(Self {
            key: *aes_gcm::Key::<Aes256Gcm>::from_slice(&raw),
        })
    }

    /// Fresh random key, for development runs without a configured key
    pub fn ephemeral() -> Self {
        let raw = rand::random::<[u8; 32]>();
        Self {
            key: *aes_gcm::Key::<Aes256Gcm>::from_slice(&raw),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce_bytes = rand::random::<[u8; NONCE_LEN]>();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut buffer = Vec::with_capacity(NONCE_LEN + plaintext.len() + 16);
        buffer.extend_from_slice(nonce);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CheckoutError::Cipher(format!("encrypt failed: {e}")))?;
        buffer.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(buffer))
    }

    pub fn decrypt(&self, data_b64: &str) -> Result<String> {
        let data = general_purpose::STANDARD
            .decode(data_b64.as_bytes())
            .map_err(|e| CheckoutError::Cipher(format!("decode failed: {e}")))?;
        if data.len() <= NONCE_LEN {
            return Err(CheckoutError::Cipher("ciphertext too short".into()));
        }
        let (nonce_bytes, cipher_bytes) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), cipher_bytes)
            .map_err(|e| CheckoutError::Cipher(format!("decrypt failed: {e}")))?;
        String::from_utf8(plaintext).map_err(|e| CheckoutError::Cipher(e.to_string()))
    }
}

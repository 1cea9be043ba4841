//! Token encryption module using AES-256-GCM
//!
//! OAuth tokens are stored as an `{iv, authTag, cipherText}` bundle with all
//! three fields base64-encoded: a 96-bit random nonce per encryption and a
//! 128-bit authentication tag. The bundle round-trips through a JSON column
//! on the connection row.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key is missing; set JIRADASH_CRYPTO_KEY")]
    MissingKey,
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid token bundle: {0}")]
    InvalidBundle(String),
}

/// Secure wrapper for the 32-byte encryption key with zeroization
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey(Vec<u8>);

impl std::fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CryptoKey(..)")
    }
}

impl CryptoKey {
    /// Create a new crypto key from bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidBundle(
                "invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(CryptoKey(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypted token bundle as persisted on the connection row.
///
/// Serialized field names match the `{iv, authTag, cipherText}` vault format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedToken {
    pub iv: String,
    pub auth_tag: String,
    pub cipher_text: String,
}

impl EncryptedToken {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "iv": self.iv,
            "authTag": self.auth_tag,
            "cipherText": self.cipher_text,
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, CryptoError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CryptoError::InvalidBundle(e.to_string()))
    }
}

/// Token vault over a single AES-256-GCM key.
#[derive(Debug, Clone)]
pub struct TokenCipher {
    key: CryptoKey,
}

impl TokenCipher {
    pub fn new(key: CryptoKey) -> Self {
        Self { key }
    }

    /// Build a cipher from the optional configured key, failing only when an
    /// operation actually needs it.
    pub fn from_config_key(key: Option<&Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = key.ok_or(CryptoError::MissingKey)?;
        Ok(Self::new(CryptoKey::new(bytes.clone())?))
    }

    /// Encrypt a plaintext token into an `{iv, authTag, cipherText}` bundle
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedToken, CryptoError> {
        let cipher_key = Key::<Aes256Gcm>::from_slice(self.key.as_bytes());
        let cipher = Aes256Gcm::new(cipher_key);

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        // aes-gcm appends the 16-byte tag to the ciphertext
        let split = sealed.len() - TAG_LEN;
        Ok(EncryptedToken {
            iv: BASE64.encode(nonce),
            auth_tag: BASE64.encode(&sealed[split..]),
            cipher_text: BASE64.encode(&sealed[..split]),
        })
    }

    /// Decrypt a bundle back into the plaintext token
    pub fn decrypt(&self, token: &EncryptedToken) -> Result<String, CryptoError> {
        let iv = BASE64
            .decode(&token.iv)
            .map_err(|e| CryptoError::InvalidBundle(format!("iv: {}", e)))?;
        if iv.len() != NONCE_LEN {
            return Err(CryptoError::InvalidBundle(format!(
                "iv must be {} bytes, got {}",
                NONCE_LEN,
                iv.len()
            )));
        }
        let auth_tag = BASE64
            .decode(&token.auth_tag)
            .map_err(|e| CryptoError::InvalidBundle(format!("authTag: {}", e)))?;
        if auth_tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidBundle(format!(
                "authTag must be {} bytes, got {}",
                TAG_LEN,
                auth_tag.len()
            )));
        }
        let mut sealed = BASE64
            .decode(&token.cipher_text)
            .map_err(|e| CryptoError::InvalidBundle(format!("cipherText: {}", e)))?;
        sealed.extend_from_slice(&auth_tag);

        let cipher_key = Key::<Aes256Gcm>::from_slice(self.key.as_bytes());
        let cipher = Aes256Gcm::new(cipher_key);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_ref())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid UTF-8: {}", e)))
    }
}

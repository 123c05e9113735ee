//! Authenticated encryption for cursor tokens
//!
//! Tokens are `base64url(nonce || ciphertext || tag)` sealed with AES-256-GCM.
//! The key is derived from the server secret with BLAKE3 so any secret length
//! can be configured.

use crate::error::{PaginationError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Key-derivation context for cursor keys
const KEY_CONTEXT: &str = "scopeql 2024 cursor token aes-256-gcm v1";

/// GCM nonce length (96 bits)
const NONCE_LEN: usize = 12;

/// Reversible authenticated encryption producing opaque string tokens
pub trait TokenCipher: Send + Sync {
    /// Seal `plaintext` into a token
    fn encrypt(&self, plaintext: &[u8]) -> Result<String>;

    /// Open a token; any tampering or wrong key is an error
    fn decrypt(&self, token: &str) -> Result<Vec<u8>>;
}

/// AES-256-GCM token cipher
#[derive(Clone)]
pub struct AesGcmCipher {
    key: [u8; 32],
}

impl AesGcmCipher {
    /// Cipher keyed from an arbitrary server secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
        }
    }

    /// Cipher with a raw 256-bit key
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}

impl TokenCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new((&self.key).into());
        let nonce = Self::generate_nonce();

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| PaginationError::Encryption(e.to_string()))?;

        let mut raw = Vec::with_capacity(NONCE_LEN + sealed.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&sealed);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    fn decrypt(&self, token: &str) -> Result<Vec<u8>> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| PaginationError::InvalidCursor)?;

        if raw.len() <= NONCE_LEN {
            return Err(PaginationError::InvalidCursor);
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new((&self.key).into());

        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| PaginationError::InvalidCursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let cipher = AesGcmCipher::from_secret(b"server secret");
        let token = cipher.encrypt(b"payload").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), b"payload");
    }

    #[test]
    fn test_tokens_are_randomized() {
        let cipher = AesGcmCipher::from_secret(b"server secret");
        let a = cipher.encrypt(b"payload").unwrap();
        let b = cipher.encrypt(b"payload").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = AesGcmCipher::from_secret(b"one").encrypt(b"payload").unwrap();
        let result = AesGcmCipher::from_secret(b"two").decrypt(&token);
        assert!(matches!(result, Err(PaginationError::InvalidCursor)));
    }

    #[test]
    fn test_short_and_garbage_tokens_rejected() {
        let cipher = AesGcmCipher::from_secret(b"server secret");
        for token in ["", "abc", "not base64 !!", "AAAAAAAAAAAAAAAA"] {
            assert!(matches!(cipher.decrypt(token), Err(PaginationError::InvalidCursor)));
        }
    }
}

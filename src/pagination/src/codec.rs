//! Cursor codec: `Cursor` <-> opaque token

use crate::cipher::{AesGcmCipher, TokenCipher};
use crate::cursor::Cursor;
use crate::error::{PaginationError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Encodes cursors into sealed tokens and back
///
/// Decoding failures of any kind (bad base64, wrong key, flipped bytes,
/// malformed payload) surface as [`PaginationError::InvalidCursor`].
#[derive(Clone)]
pub struct CursorCodec {
    cipher: Arc<dyn TokenCipher>,
}

impl CursorCodec {
    /// Codec over any token cipher
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self { cipher }
    }

    /// AES-256-GCM codec keyed from `secret`
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Self {
        Self::new(Arc::new(AesGcmCipher::from_secret(secret.as_ref())))
    }

    /// Serialize and seal a cursor
    pub fn encode(&self, cursor: &Cursor) -> Result<String> {
        let payload = serde_json::to_vec(cursor)
            .map_err(|e| PaginationError::Encryption(format!("cursor serialization failed: {}", e)))?;
        self.cipher.encrypt(&payload)
    }

    /// Open and deserialize a token
    pub fn decode(&self, token: &str) -> Result<Cursor> {
        let payload = self.cipher.decrypt(token).map_err(|e| {
            warn!("Rejected cursor token: {}", e);
            PaginationError::InvalidCursor
        })?;

        let cursor: Cursor = serde_json::from_slice(&payload).map_err(|e| {
            warn!("Cursor payload is malformed: {}", e);
            PaginationError::InvalidCursor
        })?;

        debug!("Decoded cursor at id={} with {} order fields", cursor.id, cursor.order.len());
        Ok(cursor)
    }
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

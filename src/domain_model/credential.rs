use super::SessionId;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::fmt;

pub const SECRET_LEN: usize = 32;
const SESSION_ID_LEN: usize = 16;
const CREDENTIAL_LEN: usize = SESSION_ID_LEN + SECRET_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("refresh credential is not valid base64url")]
    Encoding,
    #[error("refresh credential has length {0}, expected 48")]
    Length(usize),
}

/// Raw refresh secret bytes. Never logged, never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshSecret([u8; SECRET_LEN]);

impl RefreshSecret {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        RefreshSecret(bytes)
    }

    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        RefreshSecret(bytes)
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshSecret(<redacted>)")
    }
}

/// What the caller holds: a session pointer plus the secret, joined and
/// base64url-encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    pub session_id: SessionId,
    pub secret: RefreshSecret,
}

impl RefreshCredential {
    pub fn generate() -> Self {
        RefreshCredential {
            session_id: SessionId::new_random(),
            secret: RefreshSecret::generate(),
        }
    }

    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(CREDENTIAL_LEN);
        raw.extend_from_slice(self.session_id.0.as_bytes());
        raw.extend_from_slice(self.secret.expose());
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(encoded: &str) -> Result<Self, CredentialError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| CredentialError::Encoding)?;
        if raw.len() != CREDENTIAL_LEN {
            return Err(CredentialError::Length(raw.len()));
        }

        let (id, secret) = raw.split_at(SESSION_ID_LEN);
        let session_id =
            uuid::Uuid::from_slice(id).map_err(|_| CredentialError::Length(raw.len()))?;
        let mut bytes = [0u8; SECRET_LEN];
        bytes.copy_from_slice(secret);

        Ok(RefreshCredential {
            session_id: SessionId(session_id),
            secret: RefreshSecret::from_bytes(bytes),
        })
    }
}

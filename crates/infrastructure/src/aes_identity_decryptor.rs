//! AES-256-GCM decryptor for identities submitted in encrypted form.
//!
//! The transport form is standard base64 of `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use geosession_application::IdentityDecryptor;
use geosession_core::{AppError, AppResult};

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// AES-256-GCM implementation of the identity decryptor port.
#[derive(Clone)]
pub struct AesIdentityDecryptor {
    cipher: Aes256Gcm,
}

impl AesIdentityDecryptor {
    /// Creates a decryptor from a 32-byte key.
    #[must_use]
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(key_bytes.into());
        Self { cipher }
    }

    /// Creates a decryptor from a base64-encoded 32-byte key.
    pub fn from_base64_key(encoded_key: &str) -> AppResult<Self> {
        let decoded = STANDARD.decode(encoded_key.trim()).map_err(|error| {
            AppError::Validation(format!("invalid SESSION_IDENTITY_KEY base64: {error}"))
        })?;

        let key: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
            AppError::Validation("SESSION_IDENTITY_KEY must decode to exactly 32 bytes".to_owned())
        })?;

        Ok(Self::new(&key))
    }
}

impl IdentityDecryptor for AesIdentityDecryptor {
    fn decrypt(&self, encoded: &str) -> AppResult<String> {
        let payload = STANDARD.decode(encoded.trim()).map_err(|error| {
            AppError::Validation(format!("encrypted identity is not valid base64: {error}"))
        })?;

        if payload.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(AppError::Validation(
                "encrypted identity is too short".to_owned(),
            ));
        }

        let (nonce_bytes, encrypted) = payload.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Internal("nonce must be exactly 12 bytes".to_owned()))?;
        let nonce = Nonce::from(nonce_array);

        let plaintext = self
            .cipher
            .decrypt(&nonce, encrypted)
            .map_err(|_| AppError::Validation("encrypted identity could not be opened".to_owned()))?;

        String::from_utf8(plaintext).map_err(|error| {
            AppError::Validation(format!("decrypted identity is not UTF-8: {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use geosession_application::IdentityDecryptor;
    use geosession_core::{AppError, AppResult};

    use super::AesIdentityDecryptor;

    const KEY: &str = "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=";
    const SEALED_IDENTITY: &str = "AAECAwQFBgcICQoLbfKMAl1soSgawon5zDsDl0Tp+24O4R9UGzhOi4GynXo=";

    #[test]
    fn opens_known_ciphertext() -> AppResult<()> {
        let decryptor = AesIdentityDecryptor::from_base64_key(KEY)?;

        assert_eq!(decryptor.decrypt(SEALED_IDENTITY)?, "user@example.com");
        Ok(())
    }

    #[test]
    fn wrong_key_is_rejected() {
        let decryptor = AesIdentityDecryptor::new(&[99u8; 32]);

        assert!(matches!(
            decryptor.decrypt(SEALED_IDENTITY),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn malformed_input_is_rejected() -> AppResult<()> {
        let decryptor = AesIdentityDecryptor::from_base64_key(KEY)?;

        assert!(decryptor.decrypt("not base64!").is_err());
        assert!(decryptor.decrypt("AAECAwQF").is_err());
        Ok(())
    }

    #[test]
    fn key_must_be_32_bytes() {
        assert!(AesIdentityDecryptor::from_base64_key("AAECAwQF").is_err());
        assert!(AesIdentityDecryptor::from_base64_key("%%%").is_err());
    }
}

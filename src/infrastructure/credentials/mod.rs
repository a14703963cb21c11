//! Credential sealing for stored cluster passwords.
//!
//! AES-256-GCM with the key derived from the JWT secret via SHA-256. The
//! sealed form is base64(nonce || ciphertext); a fresh nonce per seal.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::domain::errors::{codes, Fault};

const NONCE_LEN: usize = 12;

fn cipher(secret: &str) -> Aes256Gcm {
    let digest = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
}

pub fn seal(plaintext: &str, secret: &str) -> Result<String, Fault> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher(secret)
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| Fault::new(codes::ENCRYPT_PASSWD_ERR, e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
}

pub fn unseal(sealed: &str, secret: &str) -> Result<String, Fault> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(sealed)
        .map_err(|e| Fault::new(codes::DECRYPT_PASSWD_ERR, e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(Fault::new(codes::DECRYPT_PASSWD_ERR, "sealed value too short"));
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let plaintext = cipher(secret)
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| Fault::new(codes::DECRYPT_PASSWD_ERR, e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| Fault::new(codes::DECRYPT_PASSWD_ERR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_round_trip() {
        let sealed = seal("s3cret-pa55word", "jwt-secret").unwrap();
        assert_ne!(sealed, "s3cret-pa55word");
        assert_eq!(unseal(&sealed, "jwt-secret").unwrap(), "s3cret-pa55word");
    }

    #[test]
    fn test_nonce_makes_seals_distinct() {
        let a = seal("same", "jwt-secret").unwrap();
        let b = seal("same", "jwt-secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal("password", "key-a").unwrap();
        let err = unseal(&sealed, "key-b").unwrap_err();
        assert_eq!(err.code, codes::DECRYPT_PASSWD_ERR);
    }

    #[test]
    fn test_garbage_input_fails() {
        assert!(unseal("!!!", "key").is_err());
        assert!(unseal("AAAA", "key").is_err());
    }
}

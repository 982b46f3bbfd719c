//! Authenticated encryption for the fallback cache.
//!
//! AES-256-GCM with a key derived from the service token by
//! PBKDF2-HMAC-SHA256 over a fresh random salt. A sealed record is
//!
//! ```text
//! base64(ciphertext)--base64(nonce)--base64(tag)\nbase64url(salt)
//! ```
//!
//! The first line uses the standard alphabet and therefore never contains a
//! newline or `-`, which keeps both delimiters unambiguous.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::error::{BootstrapError, BootstrapResult};
use super::types::SecretToken;
use crate::config::DEFAULT_KDF_ITERATIONS;

/// AES-256 key length; also the salt length.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length (96-bit).
pub const NONCE_LEN: usize = 12;

const TAG_LEN: usize = 16;

const SEGMENT_SEPARATOR: &str = "--";

/// URL-safe alphabet, padded on encode, lenient about padding on decode.
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Seals and opens fallback cache records.
#[derive(Debug, Clone, Copy)]
pub struct Cipher {
    iterations: u32,
}

impl Default for Cipher {
    fn default() -> Self {
        Self::with_iterations(DEFAULT_KDF_ITERATIONS)
    }
}

impl Cipher {
    /// Use a different PBKDF2 work factor. Records sealed with one count can
    /// only be opened with the same count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Encrypt `plaintext` under a key derived from `token` and a new salt.
    pub fn encrypt(&self, plaintext: &[u8], token: &SecretToken) -> BootstrapResult<Vec<u8>> {
        let mut salt = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(token.expose().as_bytes(), &salt, self.iterations);
        let cipher = Aes256Gcm::new((&*key).into());

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|e| BootstrapError::Encryption(format!("AES-GCM seal failed: {e}")))?;

        let sealed = [
            STANDARD.encode(&buffer),
            STANDARD.encode(nonce),
            STANDARD.encode(tag),
        ]
        .join(SEGMENT_SEPARATOR);

        let mut record = sealed.into_bytes();
        record.push(b'\n');
        record.extend_from_slice(URL_SAFE.encode(salt).as_bytes());
        Ok(record)
    }

    /// Authenticate and decrypt a record produced by [`Cipher::encrypt`].
    ///
    /// Any record that does not verify, including one that is structurally
    /// broken, fails with [`BootstrapError::Integrity`].
    pub fn decrypt(
        &self,
        record: &[u8],
        token: &SecretToken,
    ) -> BootstrapResult<Zeroizing<Vec<u8>>> {
        let newline = record
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| BootstrapError::integrity("missing salt delimiter"))?;
        let (sealed, salt_part) = (&record[..newline], &record[newline + 1..]);

        let salt_text = std::str::from_utf8(salt_part)
            .map_err(|_| BootstrapError::integrity("salt is not valid text"))?;
        let salt = URL_SAFE
            .decode(salt_text.trim())
            .map_err(|e| BootstrapError::integrity(format!("salt is not valid base64: {e}")))?;
        if salt.is_empty() {
            return Err(BootstrapError::integrity("salt is empty"));
        }

        let (mut buffer, nonce, tag) = split_sealed(sealed)?;

        let key = derive_key(token.expose().as_bytes(), &salt, self.iterations);
        let cipher = Aes256Gcm::new((&*key).into());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| {
                BootstrapError::integrity("authentication tag mismatch (tampered file or wrong token)")
            })?;

        Ok(Zeroizing::new(buffer))
    }
}

/// Split and decode `ciphertext--nonce--tag`, checking segment lengths.
fn split_sealed(sealed: &[u8]) -> BootstrapResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let sealed = std::str::from_utf8(sealed)
        .map_err(|_| BootstrapError::integrity("ciphertext is not valid text"))?;

    let segments: Vec<&str> = sealed.split(SEGMENT_SEPARATOR).collect();
    let &[ciphertext, nonce, tag] = segments.as_slice() else {
        return Err(BootstrapError::integrity(format!(
            "expected 3 ciphertext segments, found {}",
            segments.len()
        )));
    };

    let decode = |name: &str, segment: &str| {
        STANDARD
            .decode(segment)
            .map_err(|e| BootstrapError::integrity(format!("{name} is not valid base64: {e}")))
    };
    let ciphertext = decode("ciphertext", ciphertext)?;
    let nonce = decode("nonce", nonce)?;
    let tag = decode("tag", tag)?;

    if nonce.len() != NONCE_LEN {
        return Err(BootstrapError::integrity(format!(
            "nonce is {} bytes, expected {NONCE_LEN}",
            nonce.len()
        )));
    }
    if tag.len() != TAG_LEN {
        return Err(BootstrapError::integrity(format!(
            "tag is {} bytes, expected {TAG_LEN}",
            tag.len()
        )));
    }

    Ok((ciphertext, nonce, tag))
}

/// Derive a 256-bit key from the token and salt using PBKDF2-HMAC-SHA256.
pub fn derive_key(token: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(token, salt, iterations, key.as_mut_slice());
    key
}

//! Envelope encryption engine using PBKDF2 + AES-256-GCM
//!
//! Secrets are encrypted at rest with a key derived per call from the
//! operator-supplied master key and a fresh random salt, so ciphertexts are
//! non-deterministic and no two values share an encryption key. The stored
//! blob is self-describing: `base64(salt ‖ nonce ‖ ciphertext+tag)`.
//!
//! Key derivation runs 100,000 PBKDF2-HMAC-SHA256 iterations on every
//! encrypt and decrypt. Secret access is low-frequency, so the derivation
//! cost is accepted; on async runtimes callers may wrap vault calls in
//! `spawn_blocking`.

use crate::errors::{Result, VaultError};
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Size of the random key-derivation salt in bytes
const SALT_SIZE: usize = 32;

/// Size of the AES-256-GCM nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Size of the derived AES-256 key in bytes
const KEY_SIZE: usize = 32;

/// Minimum master key length in characters
const MIN_MASTER_KEY_LEN: usize = 32;

/// PBKDF2 iteration count (OWASP recommended minimum)
const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// Number of hex characters in a key fingerprint
const FINGERPRINT_LEN: usize = 16;

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// Envelope encryption engine, constructed once per vault instance
#[derive(Clone)]
pub struct VaultEncryption {
    master_key: Arc<Zeroizing<String>>,
    fingerprint: String,
    rng: Arc<SystemRandom>,
}

impl VaultEncryption {
    /// Create an engine from a master key string.
    ///
    /// Fails fast if the key is empty or shorter than 32 characters. This is
    /// the sole key-strength validation; no entropy check is performed.
    pub fn new(master_key: &str) -> Result<Self> {
        if master_key.is_empty() {
            return Err(VaultError::master_key("Master key cannot be empty"));
        }

        if master_key.len() < MIN_MASTER_KEY_LEN {
            return Err(VaultError::master_key(format!(
                "Master key must be at least {} characters long",
                MIN_MASTER_KEY_LEN
            )));
        }

        let fingerprint = compute_fingerprint(master_key);

        debug!(key_fingerprint = %fingerprint, "Vault encryption engine initialized");

        Ok(Self {
            master_key: Arc::new(Zeroizing::new(master_key.to_string())),
            fingerprint,
            rng: Arc::new(SystemRandom::new()),
        })
    }

    /// Fingerprint of the master key: the first 16 hex characters of its
    /// SHA-256 digest. An operational tag only, never used for
    /// authentication.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Generate a cryptographically secure master key: 32 random bytes as a
    /// 64-character hex string.
    pub fn generate_master_key() -> Result<String> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes)
            .map_err(|_| VaultError::internal("Failed to generate random master key"))?;
        Ok(hex::encode(bytes))
    }

    /// Derive a 256-bit AES key from the master key and the given salt
    fn derive_key(&self, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ITERATIONS,
            salt,
            self.master_key.as_bytes(),
            key.as_mut(),
        );
        key
    }

    /// Encrypt a plaintext value into an opaque blob.
    ///
    /// A fresh salt and nonce are generated on every call, including
    /// repeated encryption of the same plaintext and rotations.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut salt = [0u8; SALT_SIZE];
        self.rng
            .fill(&mut salt)
            .map_err(|_| VaultError::encryption("Failed to generate random salt"))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VaultError::encryption("Failed to generate random nonce"))?;

        let key = self.derive_key(&salt);
        let unbound_key = UnboundKey::new(&AES_256_GCM, key.as_ref())
            .map_err(|_| VaultError::encryption("Failed to create encryption key"))?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut ciphertext = plaintext.as_bytes().to_vec();
        ciphertext.reserve(TAG_SIZE);
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| VaultError::encryption("Failed to encrypt secret value"))?;

        let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    /// Decrypt an opaque blob back into the plaintext value.
    ///
    /// Every failure mode (bad encoding, truncation, authentication
    /// failure, wrong master key) surfaces as the same opaque error so the
    /// error shape cannot be used as a decryption oracle.
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(blob)
            .map_err(|_| opaque_decrypt_error())?;

        if data.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(opaque_decrypt_error());
        }

        let (salt, rest) = data.split_at(SALT_SIZE);
        let (nonce_slice, ciphertext) = rest.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce_slice);

        let key = self.derive_key(salt);
        let unbound_key =
            UnboundKey::new(&AES_256_GCM, key.as_ref()).map_err(|_| opaque_decrypt_error())?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = ciphertext.to_vec();
        let plaintext =
            opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| opaque_decrypt_error())?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| opaque_decrypt_error())
    }

    /// Check whether this engine's master key can open a known blob.
    /// Operator sanity check before pointing a vault at existing data.
    pub fn verify_master_key(&self, test_blob: &str) -> bool {
        self.decrypt(test_blob).is_ok()
    }
}

fn opaque_decrypt_error() -> VaultError {
    VaultError::encryption("Failed to decrypt secret value")
}

fn compute_fingerprint(master_key: &str) -> String {
    let digest = Sha256::digest(master_key.as_bytes());
    let mut fingerprint = hex::encode(digest);
    fingerprint.truncate(FINGERPRINT_LEN);
    fingerprint
}

impl std::fmt::Debug for VaultEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultEncryption")
            .field("master_key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

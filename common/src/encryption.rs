//! Wallet-derived AES-256-GCM sealing for locally stored data.
//!
//! The key is derived from the account's public key, so no password is
//! involved: the data is unreadable to other accounts sharing the browser,
//! not to someone who knows the key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::account::PublicKey;
use crate::error::{FidelityError, Result};

pub const KDF_ITERATIONS: u32 = 100_000;
pub const KDF_SALT: &[u8] = b"casper-fidelity-v1";
pub const SNAPSHOT_VERSION: &str = "v1";

const NONCE_LENGTH: usize = 12;

/// AES-256-GCM key bound to one account.
#[derive(Clone)]
pub struct WalletCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for WalletCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WalletCipher(..)")
    }
}

impl WalletCipher {
    /// PBKDF2-HMAC-SHA256 over the account's hex public key.
    pub fn for_account(account: &PublicKey) -> Self {
        Self::derive(account, KDF_ITERATIONS)
    }

    fn derive(account: &PublicKey, iterations: u32) -> Self {
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(account.to_hex().as_bytes(), KDF_SALT, iterations, &mut key);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| FidelityError::Encryption(e.to_string()))
    }

    /// Encrypt raw bytes; output is base64(`nonce ‖ ciphertext`).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| FidelityError::Encryption("failed to encrypt data".into()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>> {
        let combined = STANDARD
            .decode(blob.trim())
            .map_err(|e| FidelityError::Encryption(format!("invalid base64: {e}")))?;
        if combined.len() < NONCE_LENGTH {
            return Err(FidelityError::Encryption("ciphertext too short".into()));
        }
        let (nonce, ciphertext) = combined.split_at(NONCE_LENGTH);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| FidelityError::Encryption("failed to decrypt data".into()))
    }

    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String> {
        self.encrypt(&serde_json::to_vec(value)?)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, blob: &str) -> Result<T> {
        Ok(serde_json::from_slice(&self.decrypt(blob)?)?)
    }

    pub fn encrypt_balance(&self, amount: i64) -> Result<String> {
        self.encrypt_json(&BalanceSnapshot {
            amount,
            timestamp: chrono::Utc::now().timestamp_millis(),
            version: SNAPSHOT_VERSION.to_string(),
        })
    }

    pub fn decrypt_balance(&self, blob: &str) -> Result<i64> {
        self.decrypt_json::<BalanceSnapshot>(blob).map(|s| s.amount)
    }
}

/// Plaintext of a sealed balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub amount: i64,
    /// Unix millis at sealing time.
    pub timestamp: i64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";
    const CUSTOMER: &str = "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";

    fn quick(hex: &str) -> WalletCipher {
        WalletCipher::derive(&PublicKey::from_hex(hex).unwrap(), 10)
    }

    #[test]
    fn full_strength_key_round_trips_balance() {
        let cipher = WalletCipher::for_account(&PublicKey::from_hex(ADMIN).unwrap());
        let blob = cipher.encrypt_balance(42).unwrap();
        assert_eq!(cipher.decrypt_balance(&blob).unwrap(), 42);
    }

    #[test]
    fn nonce_is_random_per_message() {
        let cipher = quick(ADMIN);
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn other_account_cannot_decrypt() {
        let blob = quick(ADMIN).encrypt_json(&serde_json::json!({ "a": 1 })).unwrap();
        assert!(matches!(
            quick(CUSTOMER).decrypt(&blob),
            Err(FidelityError::Encryption(_))
        ));
    }

    #[test]
    fn short_or_garbled_input_is_rejected() {
        let cipher = quick(ADMIN);
        assert!(cipher.decrypt(&STANDARD.encode([0u8; 4])).is_err());
        assert!(cipher.decrypt("not base64!").is_err());
    }

    #[test]
    fn sealed_balance_carries_version_and_time() {
        let cipher = quick(ADMIN);
        let blob = cipher.encrypt_balance(-3).unwrap();
        let snapshot: BalanceSnapshot = cipher.decrypt_json(&blob).unwrap();
        assert_eq!(snapshot.amount, -3);
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.timestamp > 0);
    }
}

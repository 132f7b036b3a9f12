use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{blake2b_256, DIGEST_LENGTH};
use crate::error::{FidelityError, Result};

const ED25519_TAG: u8 = 0x01;
const SECP256K1_TAG: u8 = 0x02;

const ED25519_LENGTH: usize = 32;
const SECP256K1_LENGTH: usize = 33;

/// Prefix used by the chain when printing account hashes.
pub const ACCOUNT_HASH_PREFIX: &str = "account-hash-";

/// A wallet's public key, which doubles as the account identifier everywhere in the app.
///
/// Hex form is the algorithm tag byte followed by the raw key: `01…` for
/// ed25519, `02…` for secp256k1 (compressed).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PublicKey {
    Ed25519([u8; ED25519_LENGTH]),
    Secp256k1([u8; SECP256K1_LENGTH]),
}

impl PublicKey {
    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed)?;
        Self::from_tagged_bytes(&bytes)
    }

    pub fn from_tagged_bytes(bytes: &[u8]) -> Result<Self> {
        let (&tag, key) = bytes
            .split_first()
            .ok_or_else(|| FidelityError::InvalidPublicKey("empty key".into()))?;
        match tag {
            ED25519_TAG => key
                .try_into()
                .map(Self::Ed25519)
                .map_err(|_| length_error("ed25519", ED25519_LENGTH, key.len())),
            SECP256K1_TAG => key
                .try_into()
                .map(Self::Secp256k1)
                .map_err(|_| length_error("secp256k1", SECP256K1_LENGTH, key.len())),
            other => Err(FidelityError::InvalidPublicKey(format!(
                "unknown algorithm tag {other:#04x}"
            ))),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            Self::Ed25519(_) => ED25519_TAG,
            Self::Secp256k1(_) => SECP256K1_TAG,
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Ed25519(_) => "ed25519",
            Self::Secp256k1(_) => "secp256k1",
        }
    }

    /// Key bytes without the tag.
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            Self::Ed25519(key) => key,
            Self::Secp256k1(key) => key,
        }
    }

    /// Tag byte followed by the raw key; this is also the on-chain encoding.
    pub fn to_tagged_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.raw_bytes().len());
        out.push(self.tag());
        out.extend_from_slice(self.raw_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_tagged_bytes())
    }

    pub fn account_hash(&self) -> AccountHash {
        let name = self.algorithm_name().as_bytes();
        let mut preimage = Vec::with_capacity(name.len() + 1 + self.raw_bytes().len());
        preimage.extend_from_slice(name);
        preimage.push(0);
        preimage.extend_from_slice(self.raw_bytes());
        AccountHash(blake2b_256(&preimage))
    }

    /// Abbreviated form for logs and headers, e.g. `0203406c56...259b0f`.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}...{}", &full[..10], &full[full.len() - 6..])
    }
}

fn length_error(algorithm: &str, expected: usize, actual: usize) -> FidelityError {
    FidelityError::InvalidPublicKey(format!(
        "{algorithm} key must be {expected} bytes, got {actual}"
    ))
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = FidelityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Blake2b digest identifying an account on chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountHash(pub [u8; DIGEST_LENGTH]);

impl AccountHash {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// `account-hash-<hex>`, the form the chain prints and parses.
    pub fn to_formatted_string(&self) -> String {
        format!("{ACCOUNT_HASH_PREFIX}{}", self.to_hex())
    }
}

impl fmt::Display for AccountHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formatted_string())
    }
}

impl fmt::Debug for AccountHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountHash({})", self.to_hex())
    }
}

/// Dictionary item keys to try, in order, when reading an account's balance.
///
/// Token contracts disagree on how they key their `balances` dictionary, so
/// the bare account-hash hex, the prefixed account-hash string and the raw
/// public-key hex are all attempted.
pub fn dictionary_key_candidates(account: &PublicKey) -> [String; 3] {
    let hash = account.account_hash();
    [hash.to_hex(), hash.to_formatted_string(), account.to_hex()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";
    const CUSTOMER: &str = "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";

    #[test]
    fn parses_both_algorithms() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        assert!(matches!(admin, PublicKey::Ed25519(_)));
        let customer = PublicKey::from_hex(CUSTOMER).unwrap();
        assert!(matches!(customer, PublicKey::Secp256k1(_)));
        assert_eq!(customer.to_hex(), CUSTOMER);
    }

    #[test]
    fn parsing_is_case_insensitive_and_accepts_0x() {
        let upper = PublicKey::from_hex(&ADMIN.to_uppercase()).unwrap();
        let prefixed = PublicKey::from_hex(&format!("0x{ADMIN}")).unwrap();
        assert_eq!(upper, prefixed);
        assert_eq!(upper.to_hex(), ADMIN);
    }

    #[test]
    fn rejects_bad_tag_and_length() {
        assert!(PublicKey::from_hex("03aabb").is_err());
        assert!(PublicKey::from_hex("01aabb").is_err());
        assert!(PublicKey::from_hex("").is_err());
        assert!(PublicKey::from_hex("zz").is_err());
    }

    #[test]
    fn account_hash_uses_algorithm_name_preimage() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        assert_eq!(
            admin.account_hash().to_hex(),
            "d2a32a47da96f9850e24f88c79da6f4d9ef5704873c87ed199543cfd0c5ddaaa"
        );
    }

    #[test]
    fn dictionary_keys_cover_three_encodings() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let [bare, prefixed, raw] = dictionary_key_candidates(&admin);
        assert_eq!(bare.len(), 64);
        assert_eq!(prefixed, format!("account-hash-{bare}"));
        assert_eq!(raw, ADMIN);
    }

    #[test]
    fn short_form_keeps_head_and_tail() {
        let customer = PublicKey::from_hex(CUSTOMER).unwrap();
        assert_eq!(customer.short(), "0203406c56...259b0f");
    }

    #[test]
    fn serde_round_trips_through_hex() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, format!("\"{ADMIN}\""));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, admin);
    }
}

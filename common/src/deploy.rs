//! Deploys: the signed, submittable unit of work sent to the chain.
//!
//! Hashes are computed exactly as the node recomputes them, so a deploy built
//! here is accepted by `account_put_deploy` once a valid approval is attached.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::account::PublicKey;
use crate::cl_value::{hex_bytes, CLValue, RuntimeArgs};
use crate::codec::{blake2b_256, Encoder, DIGEST_LENGTH};
use crate::error::{FidelityError, Result};

/// Entry point invoked for both grants and redemptions.
pub const TRANSFER_ENTRY_POINT: &str = "transfer";

const MODULE_BYTES_TAG: u8 = 0;
const STORED_CONTRACT_BY_HASH_TAG: u8 = 1;

// ─── Digest ──────────────────────────────────────────────────────────────────

/// 32-byte blake2b digest, printed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; DIGEST_LENGTH]);

impl Digest {
    pub fn hash(data: &[u8]) -> Self {
        Self(blake2b_256(data))
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        let input = input.trim();
        let input = input.strip_prefix("hash-").unwrap_or(input);
        let bytes = hex::decode(input)?;
        bytes
            .as_slice()
            .try_into()
            .map(Self)
            .map_err(|_| FidelityError::Config(format!("digest must be 32 bytes, got {}", bytes.len())))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ─── TTL ─────────────────────────────────────────────────────────────────────

/// Deploy time-to-live in milliseconds, printed the way the node prints it (`30m`, `1h 30m`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ttl(pub u64);

const UNITS: [(&str, u64); 5] = [
    ("day", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

impl Ttl {
    pub fn minutes(minutes: u64) -> Self {
        Self(minutes * 60_000)
    }

    pub fn millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        let mut remaining = self.0;
        let mut parts = Vec::new();
        for (suffix, unit) in UNITS {
            let count = remaining / unit;
            if count > 0 {
                parts.push(format!("{count}{suffix}"));
                remaining %= unit;
            }
        }
        f.write_str(&parts.join(" "))
    }
}

impl FromStr for Ttl {
    type Err = FidelityError;

    fn from_str(s: &str) -> Result<Self> {
        let mut total = 0u64;
        for part in s.split_whitespace() {
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| FidelityError::Config(format!("ttl part {part:?} has no unit")))?;
            let (digits, suffix) = part.split_at(split);
            let count: u64 = digits
                .parse()
                .map_err(|_| FidelityError::Config(format!("bad ttl part {part:?}")))?;
            let unit = UNITS
                .iter()
                .find(|(name, _)| *name == suffix)
                .map(|(_, unit)| *unit)
                .ok_or_else(|| FidelityError::Config(format!("unknown ttl unit {suffix:?}")))?;
            total += count * unit;
        }
        Ok(Self(total))
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ─── Header & body ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployHeader {
    pub account: PublicKey,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub ttl: Ttl,
    pub gas_price: u64,
    pub body_hash: Digest,
    pub dependencies: Vec<Digest>,
    pub chain_name: String,
}

impl DeployHeader {
    fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.raw(&self.account.to_tagged_bytes())
            .u64(self.timestamp.timestamp_millis().max(0) as u64)
            .u64(self.ttl.millis())
            .u64(self.gas_price)
            .raw(self.body_hash.as_bytes())
            .u32(self.dependencies.len() as u32);
        for dep in &self.dependencies {
            enc.raw(dep.as_bytes());
        }
        enc.string(&self.chain_name);
        enc.finish()
    }
}

/// Payment or session code of a deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutableDeployItem {
    ModuleBytes {
        #[serde(with = "hex_bytes")]
        module_bytes: Vec<u8>,
        args: RuntimeArgs,
    },
    StoredContractByHash {
        hash: Digest,
        entry_point: String,
        args: RuntimeArgs,
    },
}

impl ExecutableDeployItem {
    pub fn args(&self) -> &RuntimeArgs {
        match self {
            Self::ModuleBytes { args, .. } | Self::StoredContractByHash { args, .. } => args,
        }
    }

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Self::ModuleBytes { module_bytes, args } => {
                enc.u8(MODULE_BYTES_TAG).bytes(module_bytes);
                args.encode(enc)
            }
            Self::StoredContractByHash {
                hash,
                entry_point,
                args,
            } => {
                enc.u8(STORED_CONTRACT_BY_HASH_TAG)
                    .raw(hash.as_bytes())
                    .string(entry_point);
                args.encode(enc)
            }
        }
    }
}

/// Standard payment: empty module bytes with an `amount` budget in motes.
pub fn standard_payment(motes: u64) -> ExecutableDeployItem {
    ExecutableDeployItem::ModuleBytes {
        module_bytes: Vec::new(),
        args: RuntimeArgs::new().insert("amount", CLValue::u512(motes)),
    }
}

/// Call the token contract's `transfer` entry point.
pub fn transfer_session(contract: Digest, recipient: &PublicKey, amount: u64) -> ExecutableDeployItem {
    ExecutableDeployItem::StoredContractByHash {
        hash: contract,
        entry_point: TRANSFER_ENTRY_POINT.to_string(),
        args: RuntimeArgs::new()
            .insert("recipient", CLValue::account_key(recipient))
            .insert("amount", CLValue::u256(amount)),
    }
}

// ─── Approvals ───────────────────────────────────────────────────────────────

/// A signer's approval: the signature is tag-prefixed like the key (`01…`/`02…`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub signer: PublicKey,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

// ─── Deploy ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DeployParams {
    pub account: PublicKey,
    pub chain_name: String,
    pub gas_price: u64,
    pub ttl: Ttl,
    pub timestamp: DateTime<Utc>,
}

impl DeployParams {
    pub fn new(account: PublicKey, chain_name: impl Into<String>) -> Self {
        Self {
            account,
            chain_name: chain_name.into(),
            gas_price: 1,
            ttl: Ttl::minutes(30),
            timestamp: now_millis(),
        }
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current time truncated to milliseconds, the chain's timestamp resolution.
fn now_millis() -> DateTime<Utc> {
    let millis = Utc::now().timestamp_millis();
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
    pub hash: Digest,
    pub header: DeployHeader,
    pub payment: ExecutableDeployItem,
    pub session: ExecutableDeployItem,
    pub approvals: Vec<Approval>,
}

impl Deploy {
    /// Build an unsigned deploy, computing body and deploy hashes.
    pub fn make(
        params: DeployParams,
        session: ExecutableDeployItem,
        payment: ExecutableDeployItem,
    ) -> Result<Self> {
        let body_hash = body_hash(&payment, &session)?;
        let header = DeployHeader {
            account: params.account,
            timestamp: params.timestamp,
            ttl: params.ttl,
            gas_price: params.gas_price,
            body_hash,
            dependencies: Vec::new(),
            chain_name: params.chain_name,
        };
        let hash = Digest::hash(&header.encode());
        Ok(Self {
            hash,
            header,
            payment,
            session,
            approvals: Vec::new(),
        })
    }

    /// The signed envelope: a copy of this deploy with the approval appended.
    pub fn with_approval(&self, signer: PublicKey, signature: Vec<u8>) -> Self {
        let mut signed = self.clone();
        signed.approvals.push(Approval { signer, signature });
        signed
    }

    pub fn is_signed(&self) -> bool {
        !self.approvals.is_empty()
    }

    /// Recompute both hashes and compare against the stored ones.
    pub fn verify_hashes(&self) -> Result<bool> {
        let body = body_hash(&self.payment, &self.session)?;
        Ok(body == self.header.body_hash && Digest::hash(&self.header.encode()) == self.hash)
    }

    /// The `{ "deploy": … }` object wallets and `deployToJson` consumers expect.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::json!({ "deploy": serde_json::to_value(self)? }))
    }
}

fn body_hash(payment: &ExecutableDeployItem, session: &ExecutableDeployItem) -> Result<Digest> {
    let mut enc = Encoder::new();
    payment.encode(&mut enc)?;
    session.encode(&mut enc)?;
    Ok(Digest::hash(&enc.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "1854fbbde2bad5883e57dae1cb5d13334940cb9b0e13f9a12ca1ab66d186e839";
    const ADMIN: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";
    const CUSTOMER: &str = "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";

    fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_735_689_600_123).single().unwrap()
    }

    fn sample_deploy() -> Deploy {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let customer = PublicKey::from_hex(CUSTOMER).unwrap();
        let params = DeployParams::new(admin, "casper-test").with_timestamp(fixed_time());
        Deploy::make(
            params,
            transfer_session(Digest::from_hex(CONTRACT).unwrap(), &customer, 10),
            standard_payment(3_000_000_000),
        )
        .unwrap()
    }

    #[test]
    fn ttl_prints_and_parses_like_the_node() {
        assert_eq!(Ttl::minutes(30).to_string(), "30m");
        assert_eq!(Ttl::minutes(90).to_string(), "1h 30m");
        assert_eq!(Ttl(86_400_000).to_string(), "1day");
        assert_eq!("1h 30m".parse::<Ttl>().unwrap(), Ttl::minutes(90));
        assert!("30x".parse::<Ttl>().is_err());
    }

    #[test]
    fn digest_accepts_hash_prefix() {
        let plain = Digest::from_hex(CONTRACT).unwrap();
        let prefixed = Digest::from_hex(&format!("hash-{CONTRACT}")).unwrap();
        assert_eq!(plain, prefixed);
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn made_deploy_has_consistent_hashes() {
        let deploy = sample_deploy();
        assert!(deploy.verify_hashes().unwrap());
        assert!(!deploy.is_signed());
    }

    #[test]
    fn hash_depends_on_amount() {
        let a = sample_deploy();
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let customer = PublicKey::from_hex(CUSTOMER).unwrap();
        let b = Deploy::make(
            DeployParams::new(admin, "casper-test").with_timestamp(fixed_time()),
            transfer_session(Digest::from_hex(CONTRACT).unwrap(), &customer, 11),
            standard_payment(3_000_000_000),
        )
        .unwrap();
        assert_ne!(a.header.body_hash, b.header.body_hash);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn tampered_header_fails_verification() {
        let mut deploy = sample_deploy();
        deploy.header.chain_name = "casper".into();
        assert!(!deploy.verify_hashes().unwrap());
    }

    #[test]
    fn json_shape_matches_exchange_format() {
        let json = sample_deploy().to_json().unwrap();
        let deploy = &json["deploy"];
        assert_eq!(deploy["header"]["account"], ADMIN);
        assert_eq!(deploy["header"]["timestamp"], "2025-01-01T00:00:00.123Z");
        assert_eq!(deploy["header"]["ttl"], "30m");
        assert_eq!(deploy["header"]["chain_name"], "casper-test");
        assert_eq!(deploy["payment"]["ModuleBytes"]["module_bytes"], "");
        assert_eq!(deploy["payment"]["ModuleBytes"]["args"][0][1]["bytes"], "04005ed0b2");
        let session = &deploy["session"]["StoredContractByHash"];
        assert_eq!(session["hash"], CONTRACT);
        assert_eq!(session["entry_point"], "transfer");
        assert_eq!(session["args"][0][0], "recipient");
        assert_eq!(session["args"][1][1]["parsed"], "10");
        assert_eq!(deploy["approvals"], serde_json::json!([]));
    }

    #[test]
    fn json_round_trip_preserves_hashes() {
        let deploy = sample_deploy();
        let json = serde_json::to_string(&deploy).unwrap();
        let back: Deploy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, deploy);
        assert!(back.verify_hashes().unwrap());
    }

    #[test]
    fn approval_leaves_unsigned_deploy_untouched() {
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let mut tagged = vec![0x01];
        tagged.extend_from_slice(signing_key.verifying_key().as_bytes());
        let signer = PublicKey::from_tagged_bytes(&tagged).unwrap();

        let deploy = Deploy::make(
            DeployParams::new(signer, "casper-test").with_timestamp(fixed_time()),
            transfer_session(Digest::from_hex(CONTRACT).unwrap(), &signer, 1),
            standard_payment(3_000_000_000),
        )
        .unwrap();

        let mut signature = vec![0x01];
        signature.extend_from_slice(&signing_key.sign(deploy.hash.as_bytes()).to_bytes());
        let signed = deploy.with_approval(signer, signature);

        assert!(!deploy.is_signed());
        assert!(signed.is_signed());
        assert_eq!(signed.hash, deploy.hash);
        assert_eq!(signed.approvals[0].signature.len(), 65);
    }
}

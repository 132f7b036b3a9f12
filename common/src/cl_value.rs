//! Typed contract arguments in the chain's native encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::account::PublicKey;
use crate::codec::{decode_big_uint, encode_big_uint, Encoder};
use crate::error::{FidelityError, Result};

const KEY_ACCOUNT_TAG: u8 = 0;

/// The subset of contract value types this app produces, plus a catch-all for reads.
#[derive(Debug, Clone, PartialEq)]
pub enum CLType {
    U256,
    U512,
    Key,
    Other(Value),
}

impl CLType {
    /// Wire tag for simple types; `None` for types we only ever read.
    fn tag(&self) -> Option<u8> {
        match self {
            Self::U256 => Some(7),
            Self::U512 => Some(8),
            Self::Key => Some(11),
            Self::Other(_) => None,
        }
    }

    fn name(&self) -> Option<&'static str> {
        match self {
            Self::U256 => Some("U256"),
            Self::U512 => Some("U512"),
            Self::Key => Some("Key"),
            Self::Other(_) => None,
        }
    }
}

impl Serialize for CLType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Other(value) => value.serialize(serializer),
            known => serializer.serialize_str(known.name().unwrap_or_default()),
        }
    }
}

impl<'de> Deserialize<'de> for CLType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("U256") => Self::U256,
            Some("U512") => Self::U512,
            Some("Key") => Self::Key,
            _ => Self::Other(value),
        })
    }
}

/// A serialized contract value with its type and a human-readable rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CLValue {
    pub cl_type: CLType,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
}

impl CLValue {
    pub fn u256(value: u64) -> Self {
        Self {
            cl_type: CLType::U256,
            bytes: encode_big_uint(value as u128),
            parsed: Some(Value::String(value.to_string())),
        }
    }

    pub fn u512(value: u64) -> Self {
        Self {
            cl_type: CLType::U512,
            bytes: encode_big_uint(value as u128),
            parsed: Some(Value::String(value.to_string())),
        }
    }

    /// `Key::Account` pointing at the account owned by `key`.
    pub fn account_key(key: &PublicKey) -> Self {
        let hash = key.account_hash();
        let mut bytes = Vec::with_capacity(33);
        bytes.push(KEY_ACCOUNT_TAG);
        bytes.extend_from_slice(hash.as_bytes());
        Self {
            cl_type: CLType::Key,
            bytes,
            parsed: Some(serde_json::json!({ "Account": hash.to_formatted_string() })),
        }
    }

    /// Length-prefixed payload followed by the type tag.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let tag = self.cl_type.tag().ok_or_else(|| {
            FidelityError::MalformedResponse(format!(
                "cannot encode value of type {:?}",
                self.cl_type
            ))
        })?;
        enc.bytes(&self.bytes).u8(tag);
        Ok(())
    }

    /// Interpret the payload as a U256 that fits in a `u64`.
    pub fn to_u64(&self) -> Result<u64> {
        decode_u256(&self.bytes)
    }
}

/// Decode a U256 balance payload; values wider than `u64` are rejected.
pub fn decode_u256(bytes: &[u8]) -> Result<u64> {
    let value = decode_big_uint(bytes).ok_or_else(|| {
        FidelityError::MalformedResponse(format!("not a U256 payload: {}", hex::encode(bytes)))
    })?;
    u64::try_from(value)
        .map_err(|_| FidelityError::MalformedResponse(format!("balance {value} overflows u64")))
}

/// Named, ordered arguments for a contract call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeArgs(Vec<(String, CLValue)>);

impl RuntimeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, name: impl Into<String>, value: CLValue) -> Self {
        self.0.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&CLValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.u32(self.0.len() as u32);
        for (name, value) in &self.0 {
            enc.string(name);
            value.encode(enc)?;
        }
        Ok(())
    }
}

// Serialized as `[[name, value], …]`.
impl Serialize for RuntimeArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|(name, value)| (name, value)))
    }
}

impl<'de> Deserialize<'de> for RuntimeArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<(String, CLValue)>::deserialize(deserializer).map(Self)
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

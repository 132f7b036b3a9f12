//! Normalizing whatever the wallet hands back from a sign request.
//!
//! Wallet versions disagree on the response shape. Every shape is mapped to
//! a [`SignResponse`] variant up front; anything unrecognized fails closed
//! with [`FidelityError::SignatureMissing`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::account::PublicKey;
use crate::error::{FidelityError, Result};

/// Raw ed25519/secp256k1 signature length, without the algorithm tag.
pub const SIGNATURE_LENGTH: usize = 64;

/// A signature carried in the `signature` field: hex text or raw bytes.
///
/// Browser `Uint8Array`s stringify to `{"0": …, "1": …}`, hence `Indexed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SignatureField {
    Hex(String),
    Bytes(Vec<u8>),
    Indexed(BTreeMap<String, u8>),
}

impl SignatureField {
    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Hex(text) => decode_hex(&text),
            Self::Bytes(bytes) => Ok(bytes),
            Self::Indexed(map) => {
                let mut entries = map
                    .into_iter()
                    .map(|(index, byte)| {
                        index
                            .parse::<usize>()
                            .map(|i| (i, byte))
                            .map_err(|_| FidelityError::InvalidSignature(format!("bad index {index:?}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                entries.sort_by_key(|(i, _)| *i);
                Ok(entries.into_iter().map(|(_, byte)| byte).collect())
            }
        }
    }
}

/// Every response shape a wallet sign request is known to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum SignResponse {
    Cancelled,
    SignatureHex(String),
    Signature(SignatureField),
    /// The wallet returned the whole signed deploy; this is its first approval's signature.
    ApprovedDeploy(String),
    Unrecognized,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawSignResponse {
    #[serde(default)]
    cancelled: bool,
    #[serde(default)]
    signature_hex: Option<String>,
    #[serde(default)]
    signature: Option<Value>,
    #[serde(default)]
    deploy: Option<Value>,
}

impl SignResponse {
    /// Classify a wallet response. Precedence: cancellation, `signatureHex`,
    /// `signature`, then `deploy.approvals[0].signature`.
    pub fn from_json(value: &Value) -> Self {
        let Ok(raw) = RawSignResponse::deserialize(value) else {
            return Self::Unrecognized;
        };
        if raw.cancelled {
            return Self::Cancelled;
        }
        if let Some(hex) = raw.signature_hex.filter(|s| !s.is_empty()) {
            return Self::SignatureHex(hex);
        }
        if let Some(field) = raw
            .signature
            .and_then(|v| SignatureField::deserialize(v).ok())
            .filter(|f| !matches!(f, SignatureField::Hex(s) if s.is_empty()))
        {
            return Self::Signature(field);
        }
        raw.deploy
            .as_ref()
            .and_then(|d| d.pointer("/approvals/0/signature"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map_or(Self::Unrecognized, |s| Self::ApprovedDeploy(s.to_string()))
    }

    /// Tag-prefixed signature bytes suitable for a deploy approval by `signer`.
    pub fn signature_bytes(self, signer: &PublicKey) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Cancelled => return Err(FidelityError::UserCancelled),
            Self::Unrecognized => return Err(FidelityError::SignatureMissing),
            Self::SignatureHex(hex) | Self::ApprovedDeploy(hex) => decode_hex(&hex)?,
            Self::Signature(field) => field.into_bytes()?,
        };
        normalize(bytes, signer)
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    Ok(hex::decode(text)?)
}

fn normalize(bytes: Vec<u8>, signer: &PublicKey) -> Result<Vec<u8>> {
    match bytes.len() {
        SIGNATURE_LENGTH => {
            let mut tagged = Vec::with_capacity(SIGNATURE_LENGTH + 1);
            tagged.push(signer.tag());
            tagged.extend_from_slice(&bytes);
            Ok(tagged)
        }
        len if len == SIGNATURE_LENGTH + 1 && bytes[0] == signer.tag() => Ok(bytes),
        len if len == SIGNATURE_LENGTH + 1 => Err(FidelityError::InvalidSignature(format!(
            "tag {:#04x} does not match signer algorithm {}",
            bytes[0],
            signer.algorithm_name()
        ))),
        len => Err(FidelityError::InvalidSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {len}"
        ))),
    }
}

//! In-process fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ed25519_dalek::{Signer, SigningKey};
use fidelity_common::{FidelityConfig, FidelityError, PublicKey, Result};
use serde_json::{json, Value};

use crate::transport::RpcTransport;
use crate::wallet::WalletProvider;

pub const CUSTOMER: &str = "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";

/// How the fake wallet answers a sign request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    /// `{ signatureHex: <64 bytes> }`
    SignatureHex,
    /// `{ signature: <65 tagged bytes as hex> }`
    TaggedSignature,
    /// `{ deploy: { approvals: [...] } }`
    ApprovedDeploy,
    Cancel,
    Garbage,
}

struct WalletState {
    site_connected: bool,
    approve_connection: bool,
    mode: SignMode,
    sign_requests: Vec<String>,
}

/// A wallet holding a real ed25519 key.
#[derive(Clone)]
pub struct FakeWallet {
    key: SigningKey,
    state: Arc<Mutex<WalletState>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self::with_seed(7)
    }

    pub fn with_seed(seed: u8) -> Self {
        Self {
            key: SigningKey::from_bytes(&[seed; 32]),
            state: Arc::new(Mutex::new(WalletState {
                site_connected: false,
                approve_connection: true,
                mode: SignMode::SignatureHex,
                sign_requests: Vec::new(),
            })),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.key.verifying_key().to_bytes())
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().site_connected = connected;
    }

    pub fn set_approve_connection(&self, approve: bool) {
        self.state.lock().unwrap().approve_connection = approve;
    }

    pub fn set_mode(&self, mode: SignMode) {
        self.state.lock().unwrap().mode = mode;
    }

    pub fn is_site_connected(&self) -> bool {
        self.state.lock().unwrap().site_connected
    }

    pub fn sign_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().sign_requests.clone()
    }

    /// Verify an approval signature (tag byte + 64 bytes) over `hash`.
    pub fn verifies(&self, hash: &[u8; 32], tagged_signature: &[u8]) -> bool {
        let Ok(sig) = ed25519_dalek::Signature::from_slice(&tagged_signature[1..]) else {
            return false;
        };
        tagged_signature[0] == 0x01 && self.key.verifying_key().verify_strict(hash, &sig).is_ok()
    }
}

impl WalletProvider for FakeWallet {
    async fn request_connection(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.site_connected = state.approve_connection;
        Ok(state.approve_connection)
    }

    async fn get_active_public_key(&self) -> Result<PublicKey> {
        Ok(self.public_key())
    }

    async fn sign(&self, deploy_json: &str, signer: &PublicKey) -> Result<Value> {
        assert_eq!(*signer, self.public_key(), "asked to sign for a foreign key");
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.sign_requests.push(deploy_json.to_string());
            state.mode
        };
        let parsed: Value = serde_json::from_str(deploy_json)?;
        let hash = hex::decode(parsed["deploy"]["hash"].as_str().unwrap_or_default())?;
        let raw = hex::encode(self.key.sign(&hash).to_bytes());
        Ok(match mode {
            SignMode::SignatureHex => json!({ "cancelled": false, "signatureHex": raw }),
            SignMode::TaggedSignature => json!({ "signature": format!("0x01{raw}") }),
            SignMode::ApprovedDeploy => json!({
                "deploy": { "approvals": [{ "signer": signer.to_hex(), "signature": format!("01{raw}") }] }
            }),
            SignMode::Cancel => json!({ "cancelled": true }),
            SignMode::Garbage => json!({ "ok": true }),
        })
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.is_site_connected())
    }

    async fn disconnect_from_site(&self) -> Result<bool> {
        self.set_connected(false);
        Ok(true)
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<Value>>,
    requests: Vec<Value>,
}

/// Replays canned replies in order and records every request body.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, reply: Value) {
        self.script.lock().unwrap().replies.push_back(Ok(reply));
    }

    pub fn push_err(&self, err: FidelityError) {
        self.script.lock().unwrap().replies.push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<Value> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn calls(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }
}

impl RpcTransport for ScriptedTransport {
    async fn post(&self, body: &Value) -> Result<Value> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(body.clone());
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(FidelityError::Transport("no scripted reply".into())))
    }
}

pub fn rpc_result(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

pub fn rpc_error(code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
}

pub fn deploy_accepted(hash: &str) -> Value {
    rpc_result(json!({ "api_version": "1.5.6", "deploy_hash": hash }))
}

/// Testnet config with `admin` as the admin account.
pub fn config_with_admin(admin: PublicKey) -> FidelityConfig {
    FidelityConfig {
        admin,
        ..FidelityConfig::testnet().unwrap()
    }
}

//! JSON-RPC 2.0 envelopes and the three node methods the app calls.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cl_value::CLValue;
use crate::deploy::{Deploy, Digest};
use crate::error::{FidelityError, Result};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PUT_DEPLOY: &str = "account_put_deploy";
pub const GET_STATE_ROOT_HASH: &str = "chain_get_state_root_hash";
pub const GET_DICTIONARY_ITEM: &str = "state_get_dictionary_item";

/// Dictionary holding token balances inside the contract's named keys.
pub const BALANCES_DICTIONARY: &str = "balances";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: P,
}

impl<P: Serialize> RpcRequest<P> {
    pub fn new(id: u64, method: &str, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<R> {
    pub id: Option<Value>,
    pub result: Option<R>,
    pub error: Option<RpcErrorObject>,
}

impl<R: DeserializeOwned> RpcResponse<R> {
    /// Parse a response body; a body that is not a JSON-RPC envelope is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| FidelityError::MalformedResponse(e.to_string()))
    }

    /// `error` wins over `result`; a response carrying neither is malformed.
    pub fn into_result(self) -> Result<R> {
        if let Some(err) = self.error {
            return Err(FidelityError::RpcRejected {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| FidelityError::MalformedResponse("response has neither result nor error".into()))
    }
}

// ─── account_put_deploy ──────────────────────────────────────────────────────

/// Params are an object, never an array.
#[derive(Debug, Clone, Serialize)]
pub struct PutDeployParams<'a> {
    pub deploy: &'a Deploy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutDeployResult {
    pub deploy_hash: Digest,
    #[serde(default)]
    pub api_version: Option<String>,
}

// ─── chain_get_state_root_hash ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StateRootHashResult {
    pub state_root_hash: Digest,
}

// ─── state_get_dictionary_item ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DictionaryItemParams {
    pub state_root_hash: Digest,
    pub dictionary_identifier: DictionaryIdentifier,
}

#[derive(Debug, Clone, Serialize)]
pub enum DictionaryIdentifier {
    ContractNamedKey {
        key: String,
        dictionary_name: String,
        dictionary_item_key: String,
    },
}

impl DictionaryItemParams {
    /// Look up `item_key` in the contract's `balances` dictionary.
    pub fn balance(state_root_hash: Digest, contract: Digest, item_key: &str) -> Self {
        Self {
            state_root_hash,
            dictionary_identifier: DictionaryIdentifier::ContractNamedKey {
                key: format!("hash-{contract}"),
                dictionary_name: BALANCES_DICTIONARY.to_string(),
                dictionary_item_key: item_key.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryItemResult {
    pub stored_value: StoredValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredValue {
    #[serde(rename = "CLValue", default)]
    pub cl_value: Option<CLValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTRACT: &str = "1854fbbde2bad5883e57dae1cb5d13334940cb9b0e13f9a12ca1ab66d186e839";

    #[test]
    fn request_envelope_shape() {
        let req = RpcRequest::new(7, GET_STATE_ROOT_HASH, json!({}));
        assert_eq!(
            req.to_value().unwrap(),
            json!({ "jsonrpc": "2.0", "id": 7, "method": "chain_get_state_root_hash", "params": {} })
        );
    }

    #[test]
    fn dictionary_params_use_contract_named_key() {
        let root = Digest([1; 32]);
        let params = DictionaryItemParams::balance(root, Digest::from_hex(CONTRACT).unwrap(), "abc");
        let value = serde_json::to_value(&params).unwrap();
        let ident = &value["dictionary_identifier"]["ContractNamedKey"];
        assert_eq!(ident["key"], format!("hash-{CONTRACT}"));
        assert_eq!(ident["dictionary_name"], "balances");
        assert_eq!(ident["dictionary_item_key"], "abc");
        assert_eq!(value["state_root_hash"], root.to_hex());
    }

    #[test]
    fn error_object_becomes_rejection() {
        let resp: RpcResponse<PutDeployResult> = RpcResponse::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32008, "message": "invalid deploy" }
        }))
        .unwrap();
        match resp.into_result() {
            Err(FidelityError::RpcRejected { code, message }) => {
                assert_eq!(code, -32008);
                assert_eq!(message, "invalid deploy");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_result_and_error_is_malformed() {
        let resp: RpcResponse<PutDeployResult> =
            RpcResponse::from_value(json!({ "jsonrpc": "2.0", "id": 1 })).unwrap();
        assert!(matches!(resp.into_result(), Err(FidelityError::MalformedResponse(_))));
    }

    #[test]
    fn envelope_without_id_still_parses() {
        let resp: RpcResponse<StateRootHashResult> = RpcResponse::from_value(json!({
            "result": { "state_root_hash": "cd".repeat(32) }
        }))
        .unwrap();
        assert!(resp.id.is_none());
        assert!(resp.error.is_none());
        assert_eq!(resp.into_result().unwrap().state_root_hash, Digest([0xcd; 32]));
    }

    #[test]
    fn put_deploy_result_parses_hash() {
        let hash = "ab".repeat(32);
        let resp: RpcResponse<PutDeployResult> = RpcResponse::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "api_version": "1.5.6", "deploy_hash": hash }
        }))
        .unwrap();
        assert_eq!(resp.into_result().unwrap().deploy_hash.to_hex(), hash);
    }

    #[test]
    fn stored_value_without_cl_value() {
        let resp: RpcResponse<DictionaryItemResult> = RpcResponse::from_value(json!({
            "result": { "stored_value": { "Account": {} } }
        }))
        .unwrap();
        assert!(resp.into_result().unwrap().stored_value.cl_value.is_none());
    }
}

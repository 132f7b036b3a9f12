use std::sync::atomic::{AtomicU64, Ordering};

use fidelity_common::cl_value::CLValue;
use fidelity_common::rpc::{
    DictionaryItemParams, DictionaryItemResult, PutDeployParams, PutDeployResult, RpcRequest,
    RpcResponse, StateRootHashResult, GET_DICTIONARY_ITEM, GET_STATE_ROOT_HASH, PUT_DEPLOY,
};
use fidelity_common::{Deploy, Digest, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::transport::RpcTransport;

/// Typed calls to the node over some [`RpcTransport`].
pub struct RpcClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcClient<T> {
    /// Request ids start at the current Unix time in milliseconds.
    pub fn new(transport: T) -> Self {
        let seed = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self {
            transport,
            next_id: AtomicU64::new(seed),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest::new(id, method, params).to_value()?;
        tracing::debug!(method, id, "rpc call");
        let reply = self.transport.post(&body).await?;
        RpcResponse::<R>::from_value(reply)?.into_result()
    }

    /// Submit a signed deploy; returns the hash the node accepted it under.
    pub async fn put_deploy(&self, deploy: &Deploy) -> Result<Digest> {
        let result: PutDeployResult = self.call(PUT_DEPLOY, PutDeployParams { deploy }).await?;
        Ok(result.deploy_hash)
    }

    pub async fn state_root_hash(&self) -> Result<Digest> {
        let result: StateRootHashResult = self
            .call(GET_STATE_ROOT_HASH, serde_json::json!({}))
            .await?;
        Ok(result.state_root_hash)
    }

    /// Read one entry of the contract's `balances` dictionary.
    pub async fn dictionary_item(
        &self,
        state_root_hash: Digest,
        contract: Digest,
        item_key: &str,
    ) -> Result<Option<CLValue>> {
        let result: DictionaryItemResult = self
            .call(
                GET_DICTIONARY_ITEM,
                DictionaryItemParams::balance(state_root_hash, contract, item_key),
            )
            .await?;
        Ok(result.stored_value.cl_value)
    }
}

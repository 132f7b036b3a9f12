//! Best-effort read of the on-chain token balance.
//!
//! Nothing here returns an error to the caller: a node that is down, a
//! contract keyed differently, or an account that was never credited all read
//! as zero.

use fidelity_common::account::dictionary_key_candidates;
use fidelity_common::{Digest, PublicKey, Result};

use crate::rpc::RpcClient;
use crate::store::{BalanceStorage, BalanceStore};
use crate::transport::RpcTransport;

pub struct BalanceQuery<T> {
    rpc: RpcClient<T>,
    contract: Digest,
}

impl<T: RpcTransport> BalanceQuery<T> {
    pub fn new(rpc: RpcClient<T>, contract: Digest) -> Self {
        Self { rpc, contract }
    }

    /// On-chain balance, or 0 if it could not be read.
    pub async fn token_balance(&self, account: &PublicKey) -> u64 {
        match self.lookup(account).await {
            Ok(Some(balance)) => balance,
            Ok(None) => {
                tracing::info!(account = %account.short(), "no balance entry found, assuming 0");
                0
            }
            Err(e) => {
                tracing::warn!(account = %account.short(), error = %e, "balance query failed");
                0
            }
        }
    }

    /// Overwrite the cached balance with the on-chain one, but only if a
    /// value was actually read. Returns the value written.
    pub async fn reconcile<S: BalanceStorage>(
        &self,
        store: &BalanceStore<S>,
        account: &PublicKey,
    ) -> Option<u64> {
        let balance = match self.lookup(account).await {
            Ok(Some(balance)) => balance,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(account = %account.short(), error = %e, "reconcile skipped");
                return None;
            }
        };
        let cached = i64::try_from(balance).unwrap_or(i64::MAX);
        if let Err(e) = store.set(account, cached) {
            tracing::warn!(error = %e, "could not cache on-chain balance");
        }
        Some(balance)
    }

    /// `Ok(None)` when every key encoding missed.
    async fn lookup(&self, account: &PublicKey) -> Result<Option<u64>> {
        let root = self.rpc.state_root_hash().await?;
        tracing::debug!(state_root_hash = %root, "querying balances dictionary");

        for (attempt, key) in dictionary_key_candidates(account).iter().enumerate() {
            match self.rpc.dictionary_item(root, self.contract, key).await {
                Ok(Some(value)) => match value.to_u64() {
                    Ok(balance) => {
                        tracing::debug!(attempt, key = %key, balance, "balance found");
                        return Ok(Some(balance));
                    }
                    Err(e) => tracing::debug!(attempt, key = %key, error = %e, "undecodable balance"),
                },
                Ok(None) => tracing::debug!(attempt, key = %key, "entry is not a CLValue"),
                Err(e) => tracing::debug!(attempt, key = %key, error = %e, "lookup failed"),
            }
        }
        Ok(None)
    }
}

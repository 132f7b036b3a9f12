//! Build, sign and submit a transfer deploy.
//!
//! One attempt per call. Any failure aborts the whole operation before the
//! balance cache is touched; the cache only moves once the node has accepted
//! the deploy, which is before the chain has executed it.

use fidelity_common::activity::{EventSink, TxEvent};
use fidelity_common::signature::SignResponse;
use fidelity_common::transfer::TransferRequest;
use fidelity_common::{Digest, FidelityConfig, FidelityError, PublicKey, Result};

use crate::rpc::RpcClient;
use crate::store::{BalanceStorage, BalanceStore};
use crate::transport::RpcTransport;
use crate::wallet::WalletProvider;

pub struct Submitter<T, S> {
    config: FidelityConfig,
    rpc: RpcClient<T>,
    store: BalanceStore<S>,
}

impl<T: RpcTransport, S: BalanceStorage> Submitter<T, S> {
    pub fn new(config: FidelityConfig, rpc: RpcClient<T>, store: BalanceStore<S>) -> Self {
        Self { config, rpc, store }
    }

    pub fn config(&self) -> &FidelityConfig {
        &self.config
    }

    pub fn store(&self) -> &BalanceStore<S> {
        &self.store
    }

    pub fn rpc(&self) -> &RpcClient<T> {
        &self.rpc
    }

    /// Admin grants `amount` credits to `recipient`.
    pub async fn issue_points<W: WalletProvider>(
        &self,
        wallet: &W,
        connected: Option<PublicKey>,
        recipient: PublicKey,
        amount: u64,
        sink: &mut impl EventSink,
    ) -> Result<Digest> {
        let Some(admin) = connected else {
            return Err(failed(sink, FidelityError::NotConnected));
        };
        let request = TransferRequest::grant(admin, recipient, amount);
        self.submit(wallet, Some(admin), request, None, sink).await
    }

    /// Customer spends `cost` credits on `reward`; credits go back to the admin account.
    ///
    /// The balance check belongs to the caller.
    pub async fn redeem_reward<W: WalletProvider>(
        &self,
        wallet: &W,
        connected: Option<PublicKey>,
        reward: &str,
        cost: u64,
        sink: &mut impl EventSink,
    ) -> Result<Digest> {
        let Some(customer) = connected else {
            return Err(failed(sink, FidelityError::NotConnected));
        };
        let request = TransferRequest::redeem(customer, self.config.admin, cost);
        self.submit(wallet, Some(customer), request, Some(reward), sink).await
    }

    pub async fn submit<W: WalletProvider>(
        &self,
        wallet: &W,
        connected: Option<PublicKey>,
        request: TransferRequest,
        reward: Option<&str>,
        sink: &mut impl EventSink,
    ) -> Result<Digest> {
        sink.emit(TxEvent::Preparing {
            kind: request.kind,
            amount: request.amount,
            reward: reward.map(str::to_string),
        });
        match self.run(wallet, connected, &request, sink).await {
            Ok(hash) => Ok(hash),
            Err(e) => {
                tracing::warn!(kind = ?request.kind, error = %e, "transfer failed");
                Err(failed(sink, e))
            }
        }
    }

    async fn run<W: WalletProvider>(
        &self,
        wallet: &W,
        connected: Option<PublicKey>,
        request: &TransferRequest,
        sink: &mut impl EventSink,
    ) -> Result<Digest> {
        let signer = match connected {
            Some(key) if key == request.sender => key,
            Some(key) => {
                tracing::warn!(connected = %key.short(), sender = %request.sender.short(), "sender is not the connected account");
                return Err(FidelityError::NotConnected);
            }
            None => return Err(FidelityError::NotConnected),
        };

        let deploy = request.to_deploy(&self.config)?;
        tracing::info!(
            kind = ?request.kind,
            amount = request.amount,
            recipient = %request.recipient.short(),
            deploy = %deploy.hash,
            "deploy built"
        );
        let deploy_json = serde_json::to_string(&deploy.to_json()?)?;

        sink.emit(TxEvent::SignatureRequested);
        let response = wallet.sign(&deploy_json, &signer).await?;
        let signature = SignResponse::from_json(&response).signature_bytes(&signer)?;
        sink.emit(TxEvent::SignatureReceived);
        tracing::debug!(signer = %signer.short(), "signature received");

        let signed = deploy.with_approval(signer, signature);

        sink.emit(TxEvent::Submitting);
        let deploy_hash = self.rpc.put_deploy(&signed).await?;
        tracing::info!(%deploy_hash, "deploy accepted by node");
        if deploy_hash != signed.hash {
            tracing::warn!(local = %signed.hash, remote = %deploy_hash, "node reported a different deploy hash");
        }

        sink.emit(TxEvent::Submitted {
            kind: request.kind,
            deploy_hash,
        });

        let (account, delta) = request.cache_effect();
        match self.store.update(&account, delta) {
            Ok(balance) => tracing::debug!(account = %account.short(), balance, "cached balance updated"),
            // Deploy already accepted; still report success.
            Err(e) => tracing::error!(error = %e, "cached balance update failed"),
        }

        Ok(deploy_hash)
    }
}

fn failed(sink: &mut impl EventSink, error: FidelityError) -> FidelityError {
    sink.emit(TxEvent::Failed {
        message: error.to_string(),
    });
    error
}

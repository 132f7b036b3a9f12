//! The two token movements the app performs: grants and redemptions.

use serde::{Deserialize, Serialize};

use crate::account::PublicKey;
use crate::config::FidelityConfig;
use crate::deploy::{standard_payment, transfer_session, Deploy, DeployParams};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    /// Admin credits a customer.
    Grant,
    /// Customer returns credits to the admin for a reward.
    Redeem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub kind: TransferKind,
    pub sender: PublicKey,
    pub recipient: PublicKey,
    pub amount: u64,
}

impl TransferRequest {
    pub fn grant(admin: PublicKey, customer: PublicKey, amount: u64) -> Self {
        Self {
            kind: TransferKind::Grant,
            sender: admin,
            recipient: customer,
            amount,
        }
    }

    pub fn redeem(customer: PublicKey, admin: PublicKey, cost: u64) -> Self {
        Self {
            kind: TransferKind::Redeem,
            sender: customer,
            recipient: admin,
            amount: cost,
        }
    }

    /// Account whose cached balance moves on success, and by how much.
    pub fn cache_effect(&self) -> (PublicKey, i64) {
        let amount = i64::try_from(self.amount).unwrap_or(i64::MAX);
        match self.kind {
            TransferKind::Grant => (self.recipient, amount),
            TransferKind::Redeem => (self.sender, -amount),
        }
    }

    fn payment(&self, config: &FidelityConfig) -> u64 {
        match self.kind {
            TransferKind::Grant => config.grant_payment,
            TransferKind::Redeem => config.redeem_payment,
        }
    }

    /// Unsigned deploy calling the token contract's `transfer`, sent from `sender`.
    pub fn to_deploy(&self, config: &FidelityConfig) -> Result<Deploy> {
        self.to_deploy_with(config, config.deploy_params(self.sender))
    }

    pub fn to_deploy_with(&self, config: &FidelityConfig, params: DeployParams) -> Result<Deploy> {
        Deploy::make(
            params,
            transfer_session(config.contract_hash, &self.recipient, self.amount),
            standard_payment(self.payment(config)),
        )
    }
}

//! Everything the admin and customer screens do except drawing.

use fidelity_common::activity::{ActivityLog, LogLevel};
use fidelity_common::catalog::Reward;
use fidelity_common::{Digest, FidelityConfig, FidelityError, PublicKey, Result};

use crate::rpc::RpcClient;
use crate::store::{BalanceStorage, BalanceStore};
use crate::submit::Submitter;
use crate::transport::RpcTransport;
use crate::wallet::WalletProvider;

/// Prefilled by the admin screen's quick-test button.
pub const QUICK_TEST_RECIPIENT: &str =
    "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";
pub const QUICK_TEST_AMOUNT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

pub struct Dashboard<T, S> {
    submitter: Submitter<T, S>,
    log: ActivityLog,
    busy: bool,
}

impl<T: RpcTransport, S: BalanceStorage> Dashboard<T, S> {
    pub fn new(config: FidelityConfig, rpc: RpcClient<T>, store: BalanceStore<S>) -> Self {
        Self {
            submitter: Submitter::new(config, rpc, store),
            log: ActivityLog::new(),
            busy: false,
        }
    }

    pub fn config(&self) -> &FidelityConfig {
        self.submitter.config()
    }

    pub fn store(&self) -> &BalanceStore<S> {
        self.submitter.store()
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// True while a submission is in flight; screens disable their buttons.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn role(&self, account: Option<&PublicKey>) -> Option<Role> {
        account.map(|key| {
            if self.config().is_admin(key) {
                Role::Admin
            } else {
                Role::Customer
            }
        })
    }

    pub fn explorer_link(&self, deploy_hash: &Digest) -> String {
        self.config().explorer_link(deploy_hash)
    }

    /// Admin form submit: parse the inputs, then grant.
    pub async fn issue_points<W: WalletProvider>(
        &mut self,
        wallet: &W,
        connected: Option<PublicKey>,
        recipient_hex: &str,
        amount: &str,
    ) -> Result<Digest> {
        let parsed = connected
            .ok_or(FidelityError::NotConnected)
            .and_then(|admin| Ok((admin, parse_recipient(recipient_hex)?, parse_amount(amount)?)));
        let (admin, recipient, amount) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return Err(self.reject(e)),
        };

        self.log.push(
            format!("Issuing {amount} CFT to {}...", &recipient.to_hex()[..10]),
            LogLevel::Info,
            None,
        );
        self.busy = true;
        let result = self
            .submitter
            .issue_points(wallet, Some(admin), recipient, amount, &mut self.log)
            .await;
        self.busy = false;

        if let Ok(hash) = &result {
            self.log
                .push(format!("✅ Success! Hash: {hash}"), LogLevel::Success, Some(*hash));
        }
        result
    }

    /// Customer redeem button. Checks the cached balance before anything leaves the page.
    pub async fn redeem<W: WalletProvider>(
        &mut self,
        wallet: &W,
        connected: Option<PublicKey>,
        reward: &Reward,
    ) -> Result<Digest> {
        let customer = match connected {
            Some(key) => key,
            None => return Err(self.reject(FidelityError::NotConnected)),
        };
        let available = self.store().get(&customer);
        if available < i64::try_from(reward.cost).unwrap_or(i64::MAX) {
            return Err(self.reject(FidelityError::InsufficientBalance {
                available,
                requested: reward.cost,
            }));
        }

        self.log.push(
            format!("Redeeming \"{}\" ({} CFT)...", reward.name, reward.cost),
            LogLevel::Info,
            None,
        );
        self.busy = true;
        let result = self
            .submitter
            .redeem_reward(wallet, Some(customer), reward.name, reward.cost, &mut self.log)
            .await;
        self.busy = false;

        if let Ok(hash) = &result {
            self.log
                .push(format!("✅ Redeemed! Hash: {hash}"), LogLevel::Success, Some(*hash));
        }
        result
    }

    /// Log a failure that never reached the submitter and hand it back.
    pub fn reject(&mut self, error: FidelityError) -> FidelityError {
        tracing::info!(error = %error, "action rejected before submission");
        self.log
            .push(format!("❌ Error: {error}"), LogLevel::Error, None);
        error
    }
}

fn parse_recipient(input: &str) -> Result<PublicKey> {
    if input.trim().is_empty() {
        return Err(FidelityError::InvalidPublicKey("customer address is required".into()));
    }
    PublicKey::from_hex(input)
}

fn parse_amount(input: &str) -> Result<u64> {
    let amount: u64 = input
        .trim()
        .parse()
        .map_err(|_| FidelityError::InvalidAmount(format!("{input:?} is not a whole number")))?;
    if amount == 0 {
        return Err(FidelityError::InvalidAmount("amount must be positive".into()));
    }
    Ok(amount)
}

use fidelity_common::{PublicKey, Result};
use serde::{Deserialize, Serialize};

use crate::store::BalanceStorage;

pub const PRIVACY_KEY_PREFIX: &str = "privacy_";

/// Per-account display and storage preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    /// Seal cached balances with the wallet-derived key.
    pub encryption: bool,
    pub show_balance: bool,
    pub show_transactions: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            encryption: true,
            show_balance: true,
            show_transactions: false,
        }
    }
}

fn privacy_key(account: &PublicKey) -> String {
    format!("{PRIVACY_KEY_PREFIX}{}", account.to_hex())
}

impl PrivacySettings {
    /// Saved settings, or the defaults when none are saved or they don't parse.
    pub fn load<S: BalanceStorage>(storage: &S, account: &PublicKey) -> Self {
        match storage.get_item(&privacy_key(account)) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding unreadable privacy settings");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "privacy settings read failed");
                Self::default()
            }
        }
    }

    pub fn save<S: BalanceStorage>(&self, storage: &S, account: &PublicKey) -> Result<()> {
        storage.set_item(&privacy_key(account), &serde_json::to_string(self)?)
    }
}

//! Deployment constants for the fidelity token and how to override them.
//!
//! Overrides are baked in at compile time with `option_env!`, so the wasm
//! bundle and native binaries see the same values without a config file.

use crate::account::PublicKey;
use crate::deploy::{DeployParams, Digest, Ttl};
use crate::error::{FidelityError, Result};

pub const CONTRACT_HASH: &str = "1854fbbde2bad5883e57dae1cb5d13334940cb9b0e13f9a12ca1ab66d186e839";
pub const ADMIN_ADDRESS: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";
pub const NETWORK_NAME: &str = "casper-test";

/// Submission endpoint, relative to the page origin (served by the proxy).
pub const NODE_URL: &str = "/api/rpc";
/// State queries go straight to the node.
pub const DIRECT_RPC_URL: &str = "https://node.testnet.casper.network/rpc";
pub const EXPLORER_DEPLOY_URL: &str = "https://testnet.cspr.live/deploy/";

/// Gas budget in motes for both grants and redemptions.
pub const DEFAULT_PAYMENT_MOTES: u64 = 3_000_000_000;
pub const DEFAULT_TTL_MINUTES: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct FidelityConfig {
    pub contract_hash: Digest,
    pub admin: PublicKey,
    pub network_name: String,
    pub node_url: String,
    pub query_url: String,
    pub grant_payment: u64,
    pub redeem_payment: u64,
    pub ttl: Ttl,
    pub explorer_url: String,
}

impl FidelityConfig {
    /// The deployed testnet contract and admin account.
    pub fn testnet() -> Result<Self> {
        Self::build(
            CONTRACT_HASH,
            ADMIN_ADDRESS,
            NETWORK_NAME,
            NODE_URL,
            DIRECT_RPC_URL,
        )
    }

    /// Testnet values with any `FIDELITY_*` compile-time overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::build(
            option_env!("FIDELITY_CONTRACT_HASH").unwrap_or(CONTRACT_HASH),
            option_env!("FIDELITY_ADMIN_ADDRESS").unwrap_or(ADMIN_ADDRESS),
            option_env!("FIDELITY_NETWORK").unwrap_or(NETWORK_NAME),
            option_env!("FIDELITY_NODE_URL").unwrap_or(NODE_URL),
            option_env!("FIDELITY_QUERY_URL").unwrap_or(DIRECT_RPC_URL),
        )
    }

    pub fn build(
        contract_hash: &str,
        admin: &str,
        network_name: &str,
        node_url: &str,
        query_url: &str,
    ) -> Result<Self> {
        let contract_hash = Digest::from_hex(contract_hash)
            .map_err(|e| FidelityError::Config(format!("contract hash: {e}")))?;
        let admin = PublicKey::from_hex(admin)
            .map_err(|e| FidelityError::Config(format!("admin address: {e}")))?;
        if network_name.is_empty() {
            return Err(FidelityError::Config("network name is empty".into()));
        }
        Ok(Self {
            contract_hash,
            admin,
            network_name: network_name.to_string(),
            node_url: node_url.to_string(),
            query_url: query_url.to_string(),
            grant_payment: DEFAULT_PAYMENT_MOTES,
            redeem_payment: DEFAULT_PAYMENT_MOTES,
            ttl: Ttl::minutes(DEFAULT_TTL_MINUTES),
            explorer_url: EXPLORER_DEPLOY_URL.to_string(),
        })
    }

    pub fn is_admin(&self, account: &PublicKey) -> bool {
        *account == self.admin
    }

    pub fn deploy_params(&self, account: PublicKey) -> DeployParams {
        DeployParams::new(account, self.network_name.clone()).with_ttl(self.ttl)
    }

    pub fn explorer_link(&self, deploy_hash: &Digest) -> String {
        format!("{}{}", self.explorer_url, deploy_hash)
    }

    /// Submission URL as seen from a page served at `origin`.
    pub fn submission_url(&self, origin: &str) -> String {
        resolve_url(origin, &self.node_url)
    }
}

/// Absolute URLs pass through; relative ones are joined onto `origin`.
pub fn resolve_url(origin: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_constants_parse() {
        let config = FidelityConfig::testnet().unwrap();
        assert_eq!(config.contract_hash.to_hex(), CONTRACT_HASH);
        assert_eq!(config.admin.to_hex(), ADMIN_ADDRESS);
        assert_eq!(config.grant_payment, 3_000_000_000);
        assert_eq!(config.ttl.to_string(), "30m");
    }

    #[test]
    fn admin_detection_is_exact() {
        let config = FidelityConfig::testnet().unwrap();
        let admin = PublicKey::from_hex(&ADMIN_ADDRESS.to_uppercase()).unwrap();
        assert!(config.is_admin(&admin));
        let customer = PublicKey::from_hex(
            "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f",
        )
        .unwrap();
        assert!(!config.is_admin(&customer));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        assert!(matches!(
            FidelityConfig::build("nothex", ADMIN_ADDRESS, NETWORK_NAME, NODE_URL, DIRECT_RPC_URL),
            Err(FidelityError::Config(_))
        ));
        assert!(FidelityConfig::build(CONTRACT_HASH, "03ff", NETWORK_NAME, NODE_URL, DIRECT_RPC_URL).is_err());
        assert!(FidelityConfig::build(CONTRACT_HASH, ADMIN_ADDRESS, "", NODE_URL, DIRECT_RPC_URL).is_err());
    }

    #[test]
    fn urls_resolve_against_origin() {
        assert_eq!(resolve_url("http://localhost:3000/", "/api/rpc"), "http://localhost:3000/api/rpc");
        assert_eq!(resolve_url("http://localhost:3000", DIRECT_RPC_URL), DIRECT_RPC_URL);
    }

    #[test]
    fn explorer_link_appends_hash() {
        let config = FidelityConfig::testnet().unwrap();
        let hash = Digest([0xab; 32]);
        assert_eq!(
            config.explorer_link(&hash),
            format!("https://testnet.cspr.live/deploy/{}", "ab".repeat(32))
        );
    }
}

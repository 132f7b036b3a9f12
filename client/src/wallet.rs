use fidelity_common::{PublicKey, Result};
use serde_json::Value;

/// The browser wallet extension, as seen by the app.
///
/// Implemented over `window.CasperWalletProvider()` in the web UI and by
/// in-process fakes in tests. `sign` returns the provider's raw response;
/// callers classify it with [`SignResponse`](fidelity_common::signature::SignResponse).
#[allow(async_fn_in_trait)]
pub trait WalletProvider {
    /// Prompt the user to connect this site. `false` means the user declined.
    async fn request_connection(&self) -> Result<bool>;

    async fn get_active_public_key(&self) -> Result<PublicKey>;

    /// Ask the wallet to sign `deploy_json` (the `{ "deploy": … }` form) as `signer`.
    async fn sign(&self, deploy_json: &str, signer: &PublicKey) -> Result<Value>;

    async fn is_connected(&self) -> Result<bool>;

    async fn disconnect_from_site(&self) -> Result<bool>;
}

/// Notifications the extension pushes to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The extension finished injecting itself.
    Loaded,
    /// `None` when the user locked the wallet or removed the site.
    ActiveKeyChanged(Option<PublicKey>),
    Disconnected,
}

//! Wallet session: which account is connected and what its cached balance is.
//!
//! Every transition is published as a [`SessionSnapshot`] on a watch channel,
//! so views only ever render the latest state.

use std::time::Duration;

use fidelity_common::encryption::WalletCipher;
use fidelity_common::{FidelityConfig, FidelityError, PublicKey, Result};
use tokio::sync::watch;

use crate::privacy::PrivacySettings;
use crate::store::{BalanceChanged, BalanceStorage, BalanceStore};
use crate::time::sleep;
use crate::wallet::{WalletEvent, WalletProvider};

/// Grace period for the extension to inject itself before the first probe.
pub const PROVIDER_PROBE_DELAY: Duration = Duration::from_millis(500);
/// How long the session reads as disconnected while switching accounts.
pub const ACCOUNT_SWITCH_PULSE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub active_key: Option<PublicKey>,
    pub balance: i64,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The active key, only while connected.
    pub fn connected_key(&self) -> Option<PublicKey> {
        self.active_key.filter(|_| self.is_connected())
    }
}

pub struct SessionManager<W, S> {
    provider: Option<W>,
    store: BalanceStore<S>,
    snapshot: watch::Sender<SessionSnapshot>,
    /// Present while the connected account has encryption turned on.
    cipher: Option<WalletCipher>,
}

impl<W: WalletProvider, S: BalanceStorage> SessionManager<W, S> {
    pub fn new(store: BalanceStore<S>) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            provider: None,
            store,
            snapshot,
            cipher: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn active_key(&self) -> Option<PublicKey> {
        self.snapshot.borrow().connected_key()
    }

    pub fn provider(&self) -> Option<&W> {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &BalanceStore<S> {
        &self.store
    }

    pub fn is_admin(&self, config: &FidelityConfig) -> bool {
        self.active_key().is_some_and(|key| config.is_admin(&key))
    }

    /// Wait once for the extension, then resume an existing connection if there is one.
    ///
    /// There is no retry: if `locate` finds nothing the user has to connect explicitly.
    pub async fn mount(&mut self, locate: impl FnOnce() -> Option<W>) -> bool {
        sleep(PROVIDER_PROBE_DELAY).await;
        match locate() {
            Some(provider) => self.attach(provider).await,
            None => {
                tracing::info!("wallet provider not detected at mount");
                false
            }
        }
    }

    /// Adopt `provider` and silently resume its connection, if any.
    pub async fn attach(&mut self, provider: W) -> bool {
        self.provider = Some(provider);
        self.reconnect_silently().await
    }

    async fn reconnect_silently(&mut self) -> bool {
        let Some(provider) = self.provider.as_ref() else {
            return false;
        };
        let key = match provider.is_connected().await {
            Ok(true) => provider.get_active_public_key().await,
            Ok(false) => return false,
            Err(e) => Err(e),
        };
        match key {
            Ok(key) => {
                tracing::info!(account = %key.short(), "wallet session resumed");
                self.enter_connected(key);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "silent reconnect failed");
                false
            }
        }
    }

    /// User-initiated connect. `locate` is consulted first so a freshly
    /// injected extension replaces a stale handle.
    pub async fn connect(&mut self, locate: impl FnOnce() -> Option<W>) -> Result<PublicKey> {
        if let Some(found) = locate() {
            self.provider = Some(found);
        }
        let Some(provider) = self.provider.as_ref() else {
            return Err(FidelityError::ProviderAbsent);
        };

        self.publish(ConnectionState::Connecting, None);
        let outcome = match provider.request_connection().await {
            Ok(true) => provider.get_active_public_key().await,
            Ok(false) => Err(FidelityError::NotConnected),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(key) => {
                tracing::info!(account = %key.short(), "wallet connected");
                self.enter_connected(key);
                Ok(key)
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet connection failed");
                self.enter_disconnected();
                Err(e)
            }
        }
    }

    /// Soft sign-out: forget the session locally, leave the site authorised in the wallet.
    pub fn disconnect(&mut self) {
        tracing::info!("wallet signed out");
        self.provider = None;
        self.enter_disconnected();
    }

    /// Revoke the site's access in the wallet, then sign out.
    pub async fn revoke(&mut self) -> Result<()> {
        if let Some(provider) = self.provider.as_ref() {
            provider.disconnect_from_site().await?;
        }
        self.disconnect();
        Ok(())
    }

    pub async fn handle_event(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::Loaded => {
                self.reconnect_silently().await;
            }
            WalletEvent::ActiveKeyChanged(Some(key)) => {
                // Only a live session follows the wallet; after a sign-out the user reconnects.
                if self.provider.is_none() || !self.snapshot.borrow().is_connected() {
                    tracing::debug!(account = %key.short(), "account change ignored while disconnected");
                    return;
                }
                tracing::info!(account = %key.short(), "active account changed");
                // Drop to disconnected briefly so dependants re-render for the new account.
                self.snapshot
                    .send_modify(|snap| snap.state = ConnectionState::Disconnected);
                sleep(ACCOUNT_SWITCH_PULSE).await;
                self.enter_connected(key);
            }
            WalletEvent::ActiveKeyChanged(None) | WalletEvent::Disconnected => {
                tracing::info!("wallet disconnected");
                self.enter_disconnected();
            }
        }
    }

    /// Follow a change to the connected account's encryption preference:
    /// start keeping a sealed copy of its balance, or drop the one there is.
    pub fn set_encryption(&mut self, enabled: bool) {
        let Some(key) = self.active_key() else {
            return;
        };
        if enabled {
            self.cipher = Some(WalletCipher::for_account(&key));
            self.seal_balance(&key);
        } else {
            self.cipher = None;
            if let Err(e) = self.store.discard_sealed(&key) {
                tracing::warn!(error = %e, "could not remove sealed balance");
            }
        }
    }

    /// Apply a cache change if it concerns the active account. Returns whether
    /// the published balance moved.
    pub fn refresh_balance(&self, change: &BalanceChanged) -> bool {
        if self.active_key() == Some(change.account) {
            self.seal_balance(&change.account);
        }
        self.snapshot.send_if_modified(|snap| {
            if snap.connected_key() == Some(change.account) && snap.balance != change.balance {
                snap.balance = change.balance;
                true
            } else {
                false
            }
        })
    }

    fn enter_connected(&mut self, key: PublicKey) {
        self.cipher = PrivacySettings::load(self.store.storage(), &key)
            .encryption
            .then(|| WalletCipher::for_account(&key));
        if let Some(cipher) = &self.cipher {
            match self.store.restore_sealed(&key, cipher) {
                Ok(Some(balance)) => {
                    tracing::info!(account = %key.short(), balance, "cached balance restored from sealed copy")
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "sealed balance unreadable"),
            }
        }
        let balance = self.store.get(&key);
        self.publish(ConnectionState::Connected, Some((key, balance)));
        self.seal_balance(&key);
    }

    fn enter_disconnected(&mut self) {
        self.cipher = None;
        self.publish(ConnectionState::Disconnected, None);
    }

    fn seal_balance(&self, key: &PublicKey) {
        if let Some(cipher) = &self.cipher {
            if let Err(e) = self.store.seal(key, cipher) {
                tracing::warn!(error = %e, "could not seal cached balance");
            }
        }
    }

    fn publish(&self, state: ConnectionState, account: Option<(PublicKey, i64)>) {
        let (active_key, balance) = match account {
            Some((key, balance)) => (Some(key), balance),
            None => (None, 0),
        };
        self.snapshot.send_replace(SessionSnapshot {
            state,
            active_key,
            balance,
        });
    }
}

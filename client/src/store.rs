//! Local balance cache.
//!
//! Balances are approximations of on-chain state: the submitter bumps them
//! after a successful submission and the balance query overwrites them when a
//! real read succeeds. Values are stored as decimal strings under
//! `balance_<account hex>` and are never clamped.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fidelity_common::encryption::WalletCipher;
use fidelity_common::{FidelityError, PublicKey, Result};
use tokio::sync::broadcast;

pub const BALANCE_KEY_PREFIX: &str = "balance_";
/// Encrypted copy of the balance, kept while the account has encryption on.
pub const SEALED_BALANCE_KEY_PREFIX: &str = "sealed_balance_";

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// String key/value persistence, shaped like browser `localStorage`.
pub trait BalanceStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

pub fn balance_key(account: &PublicKey) -> String {
    format!("{BALANCE_KEY_PREFIX}{}", account.to_hex())
}

pub fn sealed_balance_key(account: &PublicKey) -> String {
    format!("{SEALED_BALANCE_KEY_PREFIX}{}", account.to_hex())
}

// ─── Backends ────────────────────────────────────────────────────────────────

/// Process-local storage; forgets everything on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> FidelityError {
    FidelityError::Storage("storage lock poisoned".into())
}

impl BalanceStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// JSON file on disk, rewritten on every change so it survives restarts.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(FidelityError::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(items)?;
        std::fs::write(&self.path, bytes)
            .map_err(|e| FidelityError::Storage(format!("{}: {e}", self.path.display())))
    }
}

impl BalanceStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(poisoned)?;
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(poisoned)?;
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Broadcast after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChanged {
    pub account: PublicKey,
    pub balance: i64,
}

/// Shared handle to the balance cache. Cloning is cheap; clones see the same
/// storage and the same subscribers.
pub struct BalanceStore<S> {
    storage: Arc<S>,
    changes: broadcast::Sender<BalanceChanged>,
}

impl<S> Clone for BalanceStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            changes: self.changes.clone(),
        }
    }
}

impl<S: BalanceStorage> BalanceStore<S> {
    pub fn new(storage: S) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            storage: Arc::new(storage),
            changes,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Cached balance, 0 when unset or unreadable.
    pub fn get(&self, account: &PublicKey) -> i64 {
        let key = balance_key(account);
        match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(%key, %raw, "ignoring non-numeric cached balance");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(%key, error = %e, "balance cache read failed");
                0
            }
        }
    }

    pub fn set(&self, account: &PublicKey, balance: i64) -> Result<()> {
        self.storage
            .set_item(&balance_key(account), &balance.to_string())?;
        tracing::debug!(account = %account.short(), balance, "balance cached");
        // No subscribers is fine.
        let _ = self.changes.send(BalanceChanged {
            account: *account,
            balance,
        });
        Ok(())
    }

    /// Read-modify-write; returns the new balance.
    pub fn update(&self, account: &PublicKey, delta: i64) -> Result<i64> {
        let balance = self.get(account).saturating_add(delta);
        self.set(account, balance)?;
        Ok(balance)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BalanceChanged> {
        self.changes.subscribe()
    }

    /// Write an encrypted copy of the cached balance next to the plain entry.
    pub fn seal(&self, account: &PublicKey, cipher: &WalletCipher) -> Result<()> {
        let blob = cipher.encrypt_balance(self.get(account))?;
        self.storage.set_item(&sealed_balance_key(account), &blob)
    }

    /// Bring the plain entry back from the sealed copy when it has gone missing.
    ///
    /// An existing plain entry always wins. Returns the restored balance, if any.
    pub fn restore_sealed(&self, account: &PublicKey, cipher: &WalletCipher) -> Result<Option<i64>> {
        if self.storage.get_item(&balance_key(account))?.is_some() {
            return Ok(None);
        }
        let Some(blob) = self.storage.get_item(&sealed_balance_key(account))? else {
            return Ok(None);
        };
        let balance = cipher.decrypt_balance(&blob)?;
        self.set(account, balance)?;
        Ok(Some(balance))
    }

    pub fn discard_sealed(&self, account: &PublicKey) -> Result<()> {
        self.storage.remove_item(&sealed_balance_key(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER: &str = "0203406c56d6f200a7c757b23447aa3f68e3c41d6555f18ff307fe87fe55c4259b0f";
    const ADMIN: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";

    fn customer() -> PublicKey {
        PublicKey::from_hex(CUSTOMER).unwrap()
    }

    #[test]
    fn unknown_account_reads_zero() {
        let store = BalanceStore::new(MemoryStorage::new());
        assert_eq!(store.get(&customer()), 0);
    }

    #[test]
    fn update_adds_delta_without_clamping() {
        let store = BalanceStore::new(MemoryStorage::new());
        let account = customer();
        for (delta, expected) in [(10, 10), (-4, 6), (-10, -4), (0, -4)] {
            let before = store.get(&account);
            assert_eq!(store.update(&account, delta).unwrap(), before + delta);
            assert_eq!(store.get(&account), expected);
        }
    }

    #[test]
    fn values_are_decimal_strings_under_prefixed_key() {
        let store = BalanceStore::new(MemoryStorage::new());
        store.set(&customer(), 42).unwrap();
        assert_eq!(
            store.storage().get_item(&format!("balance_{CUSTOMER}")).unwrap(),
            Some("42".to_string())
        );
    }

    #[test]
    fn garbage_value_reads_as_zero() {
        let store = BalanceStore::new(MemoryStorage::new());
        store.storage().set_item(&balance_key(&customer()), "lots").unwrap();
        assert_eq!(store.get(&customer()), 0);
    }

    #[test]
    fn clones_share_storage_and_subscribers() {
        let store = BalanceStore::new(MemoryStorage::new());
        let mut rx = store.subscribe();
        let clone = store.clone();
        clone.set(&customer(), 3).unwrap();
        assert_eq!(store.get(&customer()), 3);
        assert_eq!(
            rx.try_recv().unwrap(),
            BalanceChanged { account: customer(), balance: 3 }
        );
    }

    #[test]
    fn file_storage_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balances.json");
        {
            let store = BalanceStore::new(FileStorage::open(&path).unwrap());
            store.set(&customer(), 10).unwrap();
            store.update(&customer(), 5).unwrap();
        }
        let reloaded = BalanceStore::new(FileStorage::open(&path).unwrap());
        assert_eq!(reloaded.get(&customer()), 15);
        reloaded.storage().remove_item(&balance_key(&customer())).unwrap();
        let again = BalanceStore::new(FileStorage::open(&path).unwrap());
        assert_eq!(again.get(&customer()), 0);
    }

    #[test]
    fn sealed_copy_restores_a_cleared_balance() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let cipher = WalletCipher::for_account(&admin);
        let store = BalanceStore::new(MemoryStorage::new());
        store.set(&admin, 77).unwrap();
        store.seal(&admin, &cipher).unwrap();

        let sealed = store.storage().get_item(&sealed_balance_key(&admin)).unwrap().unwrap();
        assert!(!sealed.contains("77"));

        // Plain entry present: nothing to restore.
        assert_eq!(store.restore_sealed(&admin, &cipher).unwrap(), None);

        store.storage().remove_item(&balance_key(&admin)).unwrap();
        assert_eq!(store.restore_sealed(&admin, &cipher).unwrap(), Some(77));
        assert_eq!(store.get(&admin), 77);

        store.discard_sealed(&admin).unwrap();
        assert_eq!(store.storage().get_item(&sealed_balance_key(&admin)).unwrap(), None);
    }

    #[test]
    fn sealed_copy_is_useless_to_other_accounts() {
        let admin = PublicKey::from_hex(ADMIN).unwrap();
        let store = BalanceStore::new(MemoryStorage::new());
        store.set(&admin, 5).unwrap();
        store.seal(&admin, &WalletCipher::for_account(&admin)).unwrap();
        store.storage().remove_item(&balance_key(&admin)).unwrap();

        let wrong = WalletCipher::for_account(&customer());
        assert!(store.restore_sealed(&admin, &wrong).is_err());
        assert_eq!(store.get(&admin), 0);
    }
}

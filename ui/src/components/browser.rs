//! Page-side adapters: `window.localStorage`, the injected Casper Wallet
//! provider and the events it dispatches on `window`.
//!
//! Native builds get stand-ins so the crate type-checks off wasm.

use fidelity_client::WalletEvent;
use fidelity_common::PublicKey;
use serde_json::Value;

pub const ACTIVE_KEY_CHANGED: &str = "casper-wallet:activeKeyChanged";
pub const DISCONNECTED: &str = "casper-wallet:disconnected";
pub const LOADED: &str = "casper-wallet:loaded";

/// Map a wallet event name and its `detail` payload to a [`WalletEvent`].
///
/// The extension sends `detail` either as an object or as a JSON string.
pub fn wallet_event(name: &str, detail: &Value) -> Option<WalletEvent> {
    match name {
        ACTIVE_KEY_CHANGED => {
            let detail = match detail {
                Value::String(raw) => serde_json::from_str(raw).unwrap_or(Value::Null),
                other => other.clone(),
            };
            let key = detail
                .get("activeKey")
                .and_then(Value::as_str)
                .and_then(|hex| PublicKey::from_hex(hex).ok());
            Some(WalletEvent::ActiveKeyChanged(key))
        }
        DISCONNECTED => Some(WalletEvent::Disconnected),
        LOADED => Some(WalletEvent::Loaded),
        _ => None,
    }
}

#[cfg(target_family = "wasm")]
pub use wasm::{listen_wallet_events, page_origin, InjectedWallet, LocalStorage};

#[cfg(not(target_family = "wasm"))]
pub use native::{listen_wallet_events, page_origin, InjectedWallet, LocalStorage};

// ─── WASM ───────────────────────────────────────────────────────────────────

#[cfg(target_family = "wasm")]
mod wasm {
    use fidelity_client::{BalanceStorage, WalletEvent, WalletProvider};
    use fidelity_common::{FidelityError, PublicKey, Result};
    use serde_json::Value;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    use super::{wallet_event, ACTIVE_KEY_CHANGED, DISCONNECTED, LOADED};

    fn js_message(err: &JsValue) -> String {
        js_sys::Reflect::get(err, &"message".into())
            .ok()
            .and_then(|m| m.as_string())
            .or_else(|| err.as_string())
            .unwrap_or_else(|| format!("{err:?}"))
    }

    fn window() -> Result<web_sys::Window> {
        web_sys::window().ok_or_else(|| FidelityError::Storage("no window".into()))
    }

    pub fn page_origin() -> String {
        web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default()
    }

    pub struct LocalStorage {
        inner: web_sys::Storage,
    }

    impl LocalStorage {
        pub fn open() -> Result<Self> {
            let inner = window()?
                .local_storage()
                .map_err(|e| FidelityError::Storage(js_message(&e)))?
                .ok_or_else(|| FidelityError::Storage("localStorage unavailable".into()))?;
            Ok(Self { inner })
        }
    }

    impl BalanceStorage for LocalStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.inner
                .get_item(key)
                .map_err(|e| FidelityError::Storage(js_message(&e)))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.inner
                .set_item(key, value)
                .map_err(|e| FidelityError::Storage(js_message(&e)))
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            self.inner
                .remove_item(key)
                .map_err(|e| FidelityError::Storage(js_message(&e)))
        }
    }

    /// Handle returned by `window.CasperWalletProvider()`.
    #[derive(Clone)]
    pub struct InjectedWallet {
        provider: JsValue,
    }

    impl InjectedWallet {
        /// `None` when the extension has not injected itself (yet).
        pub fn locate() -> Option<Self> {
            let window = web_sys::window()?;
            let factory: js_sys::Function = js_sys::Reflect::get(&window, &"CasperWalletProvider".into())
                .ok()?
                .dyn_into()
                .ok()?;
            let provider = factory.call0(&JsValue::NULL).ok()?;
            if provider.is_undefined() || provider.is_null() {
                return None;
            }
            Some(Self { provider })
        }

        async fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue> {
            let func: js_sys::Function = js_sys::Reflect::get(&self.provider, &method.into())
                .map_err(|e| FidelityError::Transport(js_message(&e)))?
                .dyn_into()
                .map_err(|_| FidelityError::ProviderAbsent)?;
            let args: js_sys::Array = args.iter().collect();
            let returned = func
                .apply(&self.provider, &args)
                .map_err(|e| FidelityError::Transport(js_message(&e)))?;
            JsFuture::from(js_sys::Promise::resolve(&returned))
                .await
                .map_err(|e| FidelityError::Transport(js_message(&e)))
        }
    }

    impl WalletProvider for InjectedWallet {
        async fn request_connection(&self) -> Result<bool> {
            Ok(self.call("requestConnection", &[]).await?.as_bool().unwrap_or(false))
        }

        async fn get_active_public_key(&self) -> Result<PublicKey> {
            let key = self.call("getActivePublicKey", &[]).await?;
            let hex = key.as_string().ok_or(FidelityError::NotConnected)?;
            PublicKey::from_hex(&hex)
        }

        async fn sign(&self, deploy_json: &str, signer: &PublicKey) -> Result<Value> {
            let response = self
                .call("sign", &[deploy_json.into(), signer.to_hex().into()])
                .await?;
            // Uint8Array signatures become plain arrays so they deserialize as bytes.
            if let Ok(sig) = js_sys::Reflect::get(&response, &"signature".into()) {
                if sig.is_instance_of::<js_sys::Uint8Array>() {
                    js_sys::Reflect::set(&response, &"signature".into(), &js_sys::Array::from(&sig))
                        .map_err(|e| FidelityError::Transport(js_message(&e)))?;
                }
            }
            serde_wasm_bindgen::from_value(response)
                .map_err(|e| FidelityError::MalformedResponse(e.to_string()))
        }

        async fn is_connected(&self) -> Result<bool> {
            Ok(self.call("isConnected", &[]).await?.as_bool().unwrap_or(false))
        }

        async fn disconnect_from_site(&self) -> Result<bool> {
            Ok(self.call("disconnectFromSite", &[]).await?.as_bool().unwrap_or(false))
        }
    }

    /// Forward the extension's window events to `on_event` for the life of the page.
    pub fn listen_wallet_events(on_event: impl Fn(WalletEvent) + Clone + 'static) {
        let Some(window) = web_sys::window() else {
            return;
        };
        for name in [ACTIVE_KEY_CHANGED, DISCONNECTED, LOADED] {
            let on_event = on_event.clone();
            let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
                let detail = event
                    .dyn_ref::<web_sys::CustomEvent>()
                    .map(|e| e.detail())
                    .and_then(|d| serde_wasm_bindgen::from_value::<Value>(d).ok())
                    .unwrap_or(Value::Null);
                if let Some(wallet_event) = wallet_event(name, &detail) {
                    on_event(wallet_event);
                }
            }) as Box<dyn Fn(web_sys::Event)>);
            if let Err(e) = window.add_event_listener_with_callback(name, callback.as_ref().unchecked_ref()) {
                tracing::warn!(event = name, error = %js_message(&e), "could not listen for wallet event");
            }
            callback.forget();
        }
    }
}

// ─── Native stand-ins ───────────────────────────────────────────────────────

#[cfg(not(target_family = "wasm"))]
mod native {
    use fidelity_client::{BalanceStorage, MemoryStorage, WalletEvent, WalletProvider};
    use fidelity_common::{FidelityError, PublicKey, Result};
    use serde_json::Value;

    pub fn page_origin() -> String {
        "http://localhost:8080".into()
    }

    #[derive(Default)]
    pub struct LocalStorage(MemoryStorage);

    impl LocalStorage {
        pub fn open() -> Result<Self> {
            Ok(Self::default())
        }
    }

    impl BalanceStorage for LocalStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.0.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            self.0.remove_item(key)
        }
    }

    #[derive(Clone)]
    pub struct InjectedWallet;

    impl InjectedWallet {
        pub fn locate() -> Option<Self> {
            None
        }
    }

    impl WalletProvider for InjectedWallet {
        async fn request_connection(&self) -> Result<bool> {
            Err(FidelityError::ProviderAbsent)
        }

        async fn get_active_public_key(&self) -> Result<PublicKey> {
            Err(FidelityError::ProviderAbsent)
        }

        async fn sign(&self, _deploy_json: &str, _signer: &PublicKey) -> Result<Value> {
            Err(FidelityError::ProviderAbsent)
        }

        async fn is_connected(&self) -> Result<bool> {
            Ok(false)
        }

        async fn disconnect_from_site(&self) -> Result<bool> {
            Ok(false)
        }
    }

    pub fn listen_wallet_events(_on_event: impl Fn(WalletEvent) + Clone + 'static) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "01986450980cee31adf342ae2dfe9cf28432599df43689fec8315d82eb0c87aa0a";

    #[test]
    fn account_switch_detail_as_object_or_string() {
        let expected = Some(WalletEvent::ActiveKeyChanged(PublicKey::from_hex(KEY).ok()));
        assert_eq!(wallet_event(ACTIVE_KEY_CHANGED, &json!({ "activeKey": KEY })), expected);
        let as_string = json!(json!({ "activeKey": KEY, "isConnected": true }).to_string());
        assert_eq!(wallet_event(ACTIVE_KEY_CHANGED, &as_string), expected);
    }

    #[test]
    fn locked_wallet_reports_no_key() {
        assert_eq!(
            wallet_event(ACTIVE_KEY_CHANGED, &json!({ "activeKey": null })),
            Some(WalletEvent::ActiveKeyChanged(None))
        );
        assert_eq!(wallet_event(DISCONNECTED, &Value::Null), Some(WalletEvent::Disconnected));
        assert_eq!(wallet_event("click", &Value::Null), None);
    }

    #[test]
    fn unreadable_detail_reads_as_no_key() {
        for detail in [json!({}), json!("{not json"), json!({ "activeKey": "zz" }), Value::Null] {
            assert_eq!(
                wallet_event(ACTIVE_KEY_CHANGED, &detail),
                Some(WalletEvent::ActiveKeyChanged(None))
            );
        }
        assert_eq!(wallet_event(LOADED, &json!({ "activeKey": KEY })), Some(WalletEvent::Loaded));
    }
}

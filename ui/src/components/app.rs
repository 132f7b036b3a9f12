use dioxus::prelude::*;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;

use fidelity_client::{Role, WalletEvent};
use fidelity_common::catalog::find_reward;
use fidelity_common::FidelityError;

use super::admin_view::AdminView;
use super::browser::{listen_wallet_events, InjectedWallet};
use super::shared_state::{use_handles, use_view_state, AppHandles, ViewState};
use super::user_view::UserView;

/// What the views ask the session loop to do.
#[derive(Debug, Clone)]
pub enum SessionAction {
    Connect,
    SignOut,
    Wallet(WalletEvent),
    /// The customer flipped the encryption checkbox.
    Encryption(bool),
}

/// What the views ask the dashboard loop to do.
#[derive(Debug, Clone)]
pub enum DashboardAction {
    Issue { recipient: String, amount: String },
    Redeem { reward_id: u32 },
}

#[component]
pub fn App() -> Element {
    let handles = use_hook(|| AppHandles::new().map_err(|e| e.to_string()));
    match handles {
        Ok(handles) => rsx! { Shell { handles } },
        Err(e) => rsx! {
            div { class: "fidelity-app config-error",
                h1 { "CasperFidelity" }
                p { "Configuration error: {e}" }
            }
        },
    }
}

#[component]
fn Shell(handles: AppHandles) -> Element {
    let handles = use_context_provider(|| handles);
    let initial = handles.snapshots.borrow().clone();
    let view = use_context_provider(|| ViewState {
        session: Signal::new(initial),
        logs: Signal::new(Vec::new()),
        busy: Signal::new(false),
    });

    use_session_loop(&handles, view);
    use_dashboard_loop(&handles, view);

    if view.session.read().is_connected() {
        rsx! { DashboardScreen {} }
    } else {
        rsx! { LoginScreen {} }
    }
}

/// Runs session actions one at a time and mirrors the session into `view.session`.
fn use_session_loop(handles: &AppHandles, view: ViewState) {
    let mut session_signal = view.session;

    // Snapshot mirror.
    let mut snapshots = handles.snapshots.clone();
    use_hook(move || {
        spawn(async move {
            while snapshots.changed().await.is_ok() {
                let latest = snapshots.borrow_and_update().clone();
                session_signal.set(latest);
            }
        })
    });

    // Balance cache changes from the submitter or a reconcile.
    let session = handles.session.clone();
    let mut changes = handles.store.subscribe();
    use_hook(move || {
        spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        session.lock().await.refresh_balance(&change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "balance change notifications dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let handles = handles.clone();
    let actions = use_coroutine(move |mut rx: UnboundedReceiver<SessionAction>| {
        let AppHandles {
            session,
            balance_query,
            store,
            ..
        } = handles.clone();
        async move {
            session.lock().await.mount(InjectedWallet::locate).await;

            while let Some(action) = rx.next().await {
                let mut manager = session.lock().await;
                match action {
                    SessionAction::Connect => {
                        if let Err(e) = manager.connect(InjectedWallet::locate).await {
                            tracing::warn!(error = %e, "connect failed");
                        }
                    }
                    SessionAction::SignOut => manager.disconnect(),
                    SessionAction::Wallet(event) => manager.handle_event(event).await,
                    SessionAction::Encryption(enabled) => manager.set_encryption(enabled),
                }
                let connected = manager.snapshot().connected_key();
                drop(manager);

                if let Some(account) = connected {
                    balance_query.reconcile(&store, &account).await;
                }
            }
        }
    });

    use_hook(move || listen_wallet_events(move |event| actions.send(SessionAction::Wallet(event))));
}

/// Runs grants and redemptions one at a time and copies the activity log out after each.
fn use_dashboard_loop(handles: &AppHandles, view: ViewState) {
    let ViewState {
        session,
        mut logs,
        mut busy,
    } = view;
    let handles = handles.clone();

    use_coroutine(move |mut rx: UnboundedReceiver<DashboardAction>| {
        let dashboard = handles.dashboard.clone();
        let wallet_session = handles.session.clone();
        async move {
            while let Some(action) = rx.next().await {
                busy.set(true);
                let connected = session.peek().connected_key();
                // A fresh handle from the page, falling back to the session's.
                let wallet = match InjectedWallet::locate() {
                    Some(wallet) => Some(wallet),
                    None => wallet_session.lock().await.provider().cloned(),
                };

                let mut controller = dashboard.lock().await;
                let outcome = match (wallet, action) {
                    (None, _) => Err(controller.reject(FidelityError::ProviderAbsent)),
                    (Some(wallet), DashboardAction::Issue { recipient, amount }) => {
                        controller
                            .issue_points(&wallet, connected, &recipient, &amount)
                            .await
                    }
                    (Some(wallet), DashboardAction::Redeem { reward_id }) => {
                        match find_reward(reward_id) {
                            Some(reward) => controller.redeem(&wallet, connected, reward).await,
                            None => Err(controller.reject(FidelityError::InvalidAmount(
                                format!("unknown reward {reward_id}"),
                            ))),
                        }
                    }
                };
                match outcome {
                    Ok(hash) => tracing::info!(deploy = %hash, "transaction submitted"),
                    Err(e) => tracing::warn!(error = %e, "transaction failed"),
                }

                logs.set(controller.log().entries().cloned().collect());
                drop(controller);
                busy.set(false);
            }
        }
    });
}

#[component]
fn LoginScreen() -> Element {
    let actions = use_coroutine_handle::<SessionAction>();
    let view = use_view_state();
    let connecting = view.session.read().state == fidelity_client::ConnectionState::Connecting;

    rsx! {
        div { class: "fidelity-app login",
            div { class: "login-card",
                div { class: "login-icon", "🎁" }
                h1 { "CasperFidelity" }
                p { "Loyalty Points on Blockchain" }
                button {
                    disabled: connecting,
                    onclick: move |_| actions.send(SessionAction::Connect),
                    if connecting { "Connecting..." } else { "Connect Casper Wallet" }
                }
                div { class: "login-footer", "Testnet • Secure & Decentralized" }
            }
        }
    }
}

#[component]
fn DashboardScreen() -> Element {
    let handles = use_handles();
    let view = use_view_state();
    let actions = use_coroutine_handle::<SessionAction>();

    let snapshot = view.session.read().clone();
    let Some(account) = snapshot.connected_key() else {
        return rsx! {};
    };
    let role = if handles.config.is_admin(&account) {
        Role::Admin
    } else {
        Role::Customer
    };
    let hex = account.to_hex();
    let short = format!("{}...{}", &hex[..10], &hex[hex.len() - 6..]);
    let balance = snapshot.balance;

    rsx! {
        div { class: "fidelity-app",
            nav { class: "navbar",
                span { class: "brand", "Casper" span { class: "brand-accent", "Fidelity" } }
                div { class: "navbar-right",
                    match role {
                        Role::Admin => rsx! { span { class: "role-badge admin", "ADMIN" } },
                        Role::Customer => rsx! {
                            span { class: "role-badge customer", "CUSTOMER" }
                            div { class: "nav-balance",
                                div { class: "nav-balance-label", "CFT Balance" }
                                div { class: "nav-balance-value", "{balance} CFT" }
                            }
                        },
                    }
                    div { class: "nav-account",
                        span { class: "nav-account-label", "Connected" }
                        span { class: "nav-account-key", "{short}" }
                    }
                    button {
                        class: "sign-out",
                        onclick: move |_| actions.send(SessionAction::SignOut),
                        "Sign Out"
                    }
                }
            }
            main {
                match role {
                    Role::Admin => rsx! {
                        div { class: "role-header admin",
                            h2 { "Administrator Mode" }
                            p { "Authorized to issue Fidelity Points" }
                        }
                        AdminView {}
                    },
                    Role::Customer => rsx! {
                        div { class: "role-header customer",
                            h2 { "Customer Portal" }
                            p { "Redeem your rewards below" }
                        }
                        UserView { account, balance }
                    },
                }
            }
        }
    }
}

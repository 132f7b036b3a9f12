use std::rc::Rc;

use dioxus::prelude::*;
use futures::lock::Mutex;
use tokio::sync::watch;

use fidelity_client::{
    BalanceQuery, BalanceStore, Dashboard, HttpTransport, RpcClient, SessionManager,
    SessionSnapshot,
};
use fidelity_common::activity::LogEntry;
use fidelity_common::config::resolve_url;
use fidelity_common::{FidelityConfig, Result};

use super::browser::{page_origin, InjectedWallet, LocalStorage};

pub type Session = SessionManager<InjectedWallet, LocalStorage>;
pub type Controller = Dashboard<HttpTransport, LocalStorage>;

/// Long-lived services, created once per page load.
///
/// Async locks: a signing prompt can hold the dashboard for as long as the
/// user leaves it open.
#[derive(Clone)]
pub struct AppHandles {
    pub config: FidelityConfig,
    pub store: BalanceStore<LocalStorage>,
    pub session: Rc<Mutex<Session>>,
    pub dashboard: Rc<Mutex<Controller>>,
    pub balance_query: Rc<BalanceQuery<HttpTransport>>,
    pub snapshots: watch::Receiver<SessionSnapshot>,
}

impl AppHandles {
    pub fn new() -> Result<Self> {
        let config = FidelityConfig::from_env()?;
        let store = BalanceStore::new(LocalStorage::open()?);
        let origin = page_origin();

        let session = SessionManager::new(store.clone());
        let snapshots = session.subscribe();
        let dashboard = Dashboard::new(
            config.clone(),
            RpcClient::new(HttpTransport::new(config.submission_url(&origin))),
            store.clone(),
        );
        let balance_query = BalanceQuery::new(
            RpcClient::new(HttpTransport::new(resolve_url(&origin, &config.query_url))),
            config.contract_hash,
        );
        tracing::info!(network = %config.network_name, origin = %origin, "fidelity dashboard starting");

        Ok(Self {
            config,
            store,
            session: Rc::new(Mutex::new(session)),
            dashboard: Rc::new(Mutex::new(dashboard)),
            balance_query: Rc::new(balance_query),
            snapshots,
        })
    }
}

impl PartialEq for AppHandles {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
    }
}

/// Reactive copies of service state, read by the views.
#[derive(Clone, Copy)]
pub struct ViewState {
    pub session: Signal<SessionSnapshot>,
    pub logs: Signal<Vec<LogEntry>>,
    /// Gates every submit button while a transaction is in flight.
    pub busy: Signal<bool>,
}

pub fn use_handles() -> AppHandles {
    use_context::<AppHandles>()
}

pub fn use_view_state() -> ViewState {
    use_context::<ViewState>()
}

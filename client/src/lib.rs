pub mod balance_query;
pub mod dashboard;
pub mod privacy;
pub mod rpc;
pub mod session;
pub mod store;
pub mod submit;
pub mod transport;
pub mod wallet;

mod time;

#[cfg(test)]
mod testing;

pub use balance_query::BalanceQuery;
pub use dashboard::{Dashboard, Role};
pub use rpc::RpcClient;
pub use session::{ConnectionState, SessionManager, SessionSnapshot};
pub use store::{BalanceChanged, BalanceStorage, BalanceStore, FileStorage, MemoryStorage};
pub use submit::Submitter;
pub use transport::{HttpTransport, RpcTransport};
pub use wallet::{WalletEvent, WalletProvider};

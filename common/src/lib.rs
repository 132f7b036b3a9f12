pub mod account;
pub mod activity;
pub mod catalog;
pub mod cl_value;
pub mod codec;
pub mod config;
pub mod deploy;
pub mod encryption;
pub mod error;
pub mod rpc;
pub mod signature;
pub mod transfer;

pub use account::PublicKey;
pub use config::FidelityConfig;
pub use deploy::{Deploy, Digest};
pub use error::{FidelityError, Result};

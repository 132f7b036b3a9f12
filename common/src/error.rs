use thiserror::Error;

pub type Result<T> = std::result::Result<T, FidelityError>;

/// Everything that can go wrong between a button press and a submitted deploy.
///
/// The first six variants are the user-facing taxonomy; the rest describe
/// malformed input or a broken collaborator.
#[derive(Debug, Error)]
pub enum FidelityError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("signature request cancelled by user")]
    UserCancelled,
    #[error("wallet response did not contain a signature")]
    SignatureMissing,
    #[error("RPC error {code}: {message}")]
    RpcRejected { code: i64, message: String },
    #[error("insufficient balance: have {available} CFT, need {requested} CFT")]
    InsufficientBalance { available: i64, requested: u64 },
    #[error("Casper Wallet extension not detected")]
    ProviderAbsent,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed RPC response: {0}")]
    MalformedResponse(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FidelityError {
    /// Whether the failure came from the user declining, rather than from the system.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

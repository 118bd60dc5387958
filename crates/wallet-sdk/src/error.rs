use thiserror::Error;

/// Wallet- and protocol-level error taxonomy.
///
/// Messages never interpolate key material, destination addresses beyond
/// the one under discussion, or anything that would let a caller
/// distinguish a wrong passphrase from a tampered ciphertext.
#[derive(Debug, Error)]
pub enum Error {
    #[error("spending limit breach: {0}")]
    LimitBreach(String),

    #[error("simulation rejected: {0}")]
    SimulationFailed(String),

    #[error("insufficient funds: balance {balance} < requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error("rpc error: {0}")]
    RpcError(String),

    #[error("invalid keystore: {0}")]
    InvalidKeystore(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("mainnet operation blocked")]
    MainnetBlocked,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("quote failed: {0}")]
    QuoteFailed(String),

    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("slippage exceeded: {0}")]
    SlippageExceeded(String),

    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("price fetch failed: {0}")]
    PriceFetchFailed(String),

    #[error("invalid mint: {0}")]
    InvalidMint(String),
}

impl Error {
    /// Machine-readable code, used by the AgentLoop to classify a thrown
    /// error into the right audit event kind (§4.7 step 8).
    pub fn code(&self) -> &'static str {
        match self {
            Error::LimitBreach(_) => "LIMIT_BREACH",
            Error::SimulationFailed(_) => "SIMULATION_FAILED",
            Error::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Error::RpcError(_) => "RPC_ERROR",
            Error::InvalidKeystore(_) => "INVALID_KEYSTORE",
            Error::SigningFailed(_) => "SIGNING_FAILED",
            Error::MainnetBlocked => "MAINNET_BLOCKED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::QuoteFailed(_) => "QUOTE_FAILED",
            Error::SwapFailed(_) => "SWAP_FAILED",
            Error::SlippageExceeded(_) => "SLIPPAGE_EXCEEDED",
            Error::PoolNotFound(_) => "POOL_NOT_FOUND",
            Error::AdapterUnavailable(_) => "ADAPTER_UNAVAILABLE",
            Error::PriceFetchFailed(_) => "PRICE_FETCH_FAILED",
            Error::InvalidMint(_) => "INVALID_MINT",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

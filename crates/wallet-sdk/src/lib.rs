pub mod action;
pub mod agent_state;
pub mod chain_client;
pub mod error;
pub mod guard;
pub mod keystore;
pub mod network;
pub mod redact;
pub mod send;
pub mod strategy;
pub mod swap;
#[cfg(test)]
pub(crate) mod test_support;
pub mod wallet_client;

pub use action::{Action, LpParams, SwapParams, TransferParams};
pub use agent_state::AgentState;
pub use chain_client::ChainClient;
pub use error::{Error, Result};
pub use guard::{SpendingLimitGuard, SpendingLimitStatus, SpendingLimits};
pub use keystore::{KeystoreRecord, SigningIdentity, create, load_secret_from_env, open, peek_public};
pub use network::{Network, is_mainnet_url};
pub use send::{
    Commitment, ConfirmationStatus, RpcClient, SendConfig, SignatureStatusReport, SignerCallback, SimulationReport,
    SubmitOutcome, TxResult, TxStatus, send_and_confirm,
};
pub use strategy::{DcaStrategy, MarketMakerStrategy, MonitorStrategy, RebalancerStrategy, Strategy};
pub use swap::{Quote, SwapAdapter, SwapAdapterRegistry, SwapResult, finish_swap};
pub use wallet_client::{WalletClient, WalletConfig};

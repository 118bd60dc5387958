//! Strategies are dynamically dispatched via a small closed interface,
//! registered through a factory (§9 design note) — a sum type would be
//! slightly faster but less extensible, and the source treats them as an
//! interface table.

mod dca;
mod market_maker;
mod monitor;
mod rebalancer;

pub use dca::{DcaParams, DcaStrategy};
pub use market_maker::{MarketMakerParams, MarketMakerStrategy};
pub use monitor::MonitorStrategy;
pub use rebalancer::{RebalancerParams, RebalancerStrategy};

use crate::action::Action;
use crate::agent_state::AgentState;
use crate::send::TxResult;
use crate::swap::SwapAdapterRegistry;
use crate::wallet_client::WalletClient;

/// Strategies may raise freely — the AgentLoop catches unconditionally
/// (§4.7 step 8, §7 propagation policy).
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, state: &AgentState) -> anyhow::Result<Action>;

    async fn execute(
        &self,
        action: &Action,
        wallet: &WalletClient,
        registry: &SwapAdapterRegistry,
    ) -> anyhow::Result<Option<TxResult>>;
}

/// Constructs a strategy by name from free-form JSON params (§4.8 config
/// loader: `strategy ∈ {dca, rebalancer, monitor, market_maker}`).
pub fn build(kind: &str, params: &serde_json::Value) -> anyhow::Result<Box<dyn Strategy>> {
    match kind {
        "dca" => Ok(Box::new(DcaStrategy::from_params(params)?)),
        "rebalancer" => Ok(Box::new(RebalancerStrategy::from_params(params)?)),
        "monitor" => Ok(Box::new(MonitorStrategy)),
        "market_maker" => Ok(Box::new(MarketMakerStrategy::from_params(params)?)),
        other => Err(anyhow::anyhow!("unknown strategy kind `{other}`")),
    }
}

//! Observes balances and never acts. Used as the crash-isolation and
//! remote-stop test vehicle — a strategy whose `decide`/`execute` have no
//! side effects of their own keeps those AgentLoop tests about the loop,
//! not about strategy math.

use crate::action::Action;
use crate::agent_state::AgentState;
use crate::send::TxResult;
use crate::swap::SwapAdapterRegistry;
use crate::wallet_client::WalletClient;

use super::Strategy;

pub struct MonitorStrategy;

#[async_trait::async_trait]
impl Strategy for MonitorStrategy {
    fn name(&self) -> &str {
        "monitor"
    }

    fn decide(&self, state: &AgentState) -> anyhow::Result<Action> {
        Ok(Action::noop(format!(
            "monitoring only: sol_balance={} tracked_mints={}",
            state.sol_balance,
            state.balances.len()
        )))
    }

    async fn execute(
        &self,
        _action: &Action,
        _wallet: &WalletClient,
        _registry: &SwapAdapterRegistry,
    ) -> anyhow::Result<Option<TxResult>> {
        Ok(None)
    }
}

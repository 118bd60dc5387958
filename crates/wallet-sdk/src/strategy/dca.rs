//! Dollar-cost-averaging strategy: swaps a fixed amount on a fixed cadence.

use std::str::FromStr;

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;

use crate::action::{Action, SwapParams};
use crate::agent_state::AgentState;
use crate::send::TxResult;
use crate::swap::SwapAdapterRegistry;
use crate::wallet_client::WalletClient;

use super::Strategy;

#[derive(Debug, Clone)]
pub struct DcaParams {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub slippage_bps: u16,
    pub interval_secs: i64,
}

pub struct DcaStrategy {
    params: DcaParams,
}

impl DcaStrategy {
    pub fn from_params(value: &serde_json::Value) -> anyhow::Result<Self> {
        let input_mint = parse_mint(value, "inputMint")?;
        let output_mint = parse_mint(value, "outputMint")?;
        let amount_in = value
            .get("amountIn")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("dca: `amountIn` missing or not a u64"))?;
        let slippage_bps = value
            .get("slippageBps")
            .and_then(|v| v.as_u64())
            .unwrap_or(50) as u16;
        let interval_secs = value
            .get("intervalSecs")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| anyhow::anyhow!("dca: `intervalSecs` missing or not an integer"))?;
        Ok(DcaStrategy {
            params: DcaParams {
                input_mint,
                output_mint,
                amount_in,
                slippage_bps,
                interval_secs,
            },
        })
    }
}

fn parse_mint(value: &serde_json::Value, field: &str) -> anyhow::Result<Pubkey> {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("dca: `{field}` missing or not a string"))?;
    Pubkey::from_str(raw).map_err(|e| anyhow::anyhow!("dca: `{field}` is not a valid pubkey: {e}"))
}

#[async_trait::async_trait]
impl Strategy for DcaStrategy {
    fn name(&self) -> &str {
        "dca"
    }

    fn decide(&self, state: &AgentState) -> anyhow::Result<Action> {
        let due = match state.last_action_at {
            None => true,
            Some(last) => Utc::now().signed_duration_since(last).num_seconds() >= self.params.interval_secs,
        };
        if !due {
            return Ok(Action::noop("interval not yet elapsed"));
        }
        Ok(Action::Swap(SwapParams {
            input_mint: self.params.input_mint,
            output_mint: self.params.output_mint,
            amount_in: self.params.amount_in,
            slippage_bps: self.params.slippage_bps,
        }))
    }

    async fn execute(
        &self,
        action: &Action,
        wallet: &WalletClient,
        registry: &SwapAdapterRegistry,
    ) -> anyhow::Result<Option<TxResult>> {
        let p = match action {
            Action::Swap(p) => p,
            Action::Noop { .. } => return Ok(None),
            other => return Err(anyhow::anyhow!("dca: unexpected action {other:?}")),
        };
        let quote = registry
            .get_best_quote(&p.input_mint, &p.output_mint, p.amount_in)
            .await?;
        let adapter = registry.get(&quote.provider)?;
        let result = adapter.swap(wallet, &quote, p.slippage_bps)?;
        Ok(Some(result.as_tx_result()))
    }
}

//! Target-weight rebalancer: swaps the most overweight tracked mint into
//! SOL, or SOL into the most underweight mint, whenever drift exceeds a
//! threshold. Price data is supplied directly in the strategy params
//! (lamport value per whole token unit) rather than fetched live — live
//! pricing is an external collaborator's concern the runtime does not own.

use std::collections::HashMap;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::action::{Action, SwapParams};
use crate::agent_state::AgentState;
use crate::send::TxResult;
use crate::swap::SwapAdapterRegistry;
use crate::wallet_client::WalletClient;

use super::Strategy;

const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct RebalancerParams {
    /// Target weight (0.0-1.0) per tracked mint, including the SOL mint
    /// itself if SOL should be weighted among the tracked assets.
    pub target_weights: HashMap<Pubkey, f64>,
    /// Lamport value of one whole unit of each mint, used to value
    /// balances in a common denominator.
    pub lamports_per_unit: HashMap<Pubkey, u64>,
    pub drift_bps: u64,
    pub slippage_bps: u16,
}

pub struct RebalancerStrategy {
    params: RebalancerParams,
}

impl RebalancerStrategy {
    pub fn from_params(value: &serde_json::Value) -> anyhow::Result<Self> {
        let target_weights = parse_mint_map_f64(value, "targetWeights")?;
        let lamports_per_unit = parse_mint_map_u64(value, "lamportsPerUnit")?;
        let drift_bps = value
            .get("driftBps")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("rebalancer: `driftBps` missing or not a u64"))?;
        let slippage_bps = value
            .get("slippageBps")
            .and_then(|v| v.as_u64())
            .unwrap_or(50) as u16;
        Ok(RebalancerStrategy {
            params: RebalancerParams {
                target_weights,
                lamports_per_unit,
                drift_bps,
                slippage_bps,
            },
        })
    }

    fn sol_mint() -> Pubkey {
        Pubkey::from_str(SOL_MINT).expect("hardcoded SOL mint is valid")
    }

    /// Lamport-denominated value of the whole portfolio, and per-mint
    /// values keyed the same way as `target_weights`.
    fn valuation(&self, state: &AgentState) -> (u64, HashMap<Pubkey, u64>) {
        let mut values = HashMap::new();
        let sol_mint = Self::sol_mint();
        for mint in self.params.target_weights.keys() {
            let value = if *mint == sol_mint {
                state.sol_balance
            } else {
                let balance = state.balances.get(mint).copied().unwrap_or(0);
                let price = self.params.lamports_per_unit.get(mint).copied().unwrap_or(0);
                balance.saturating_mul(price) / 1_000_000_000
            };
            values.insert(*mint, value);
        }
        let total: u64 = values.values().sum();
        (total, values)
    }
}

fn parse_mint_map_f64(value: &serde_json::Value, field: &str) -> anyhow::Result<HashMap<Pubkey, f64>> {
    let obj = value
        .get(field)
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow::anyhow!("rebalancer: `{field}` missing or not an object"))?;
    let mut out = HashMap::new();
    for (key, val) in obj {
        let mint = Pubkey::from_str(key).map_err(|e| anyhow::anyhow!("rebalancer: `{field}.{key}` invalid mint: {e}"))?;
        let weight = val
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("rebalancer: `{field}.{key}` is not a number"))?;
        out.insert(mint, weight);
    }
    Ok(out)
}

fn parse_mint_map_u64(value: &serde_json::Value, field: &str) -> anyhow::Result<HashMap<Pubkey, u64>> {
    let obj = value
        .get(field)
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow::anyhow!("rebalancer: `{field}` missing or not an object"))?;
    let mut out = HashMap::new();
    for (key, val) in obj {
        let mint = Pubkey::from_str(key).map_err(|e| anyhow::anyhow!("rebalancer: `{field}.{key}` invalid mint: {e}"))?;
        let lamports = val
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("rebalancer: `{field}.{key}` is not a u64"))?;
        out.insert(mint, lamports);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl Strategy for RebalancerStrategy {
    fn name(&self) -> &str {
        "rebalancer"
    }

    fn decide(&self, state: &AgentState) -> anyhow::Result<Action> {
        let (total, values) = self.valuation(state);
        if total == 0 {
            return Ok(Action::noop("portfolio has no value to rebalance"));
        }

        let sol_mint = Self::sol_mint();
        let mut worst: Option<(Pubkey, f64)> = None;
        for (mint, target) in &self.params.target_weights {
            let actual = values.get(mint).copied().unwrap_or(0) as f64 / total as f64;
            let drift = actual - target;
            let drift_bps = (drift.abs() * 10_000.0) as u64;
            if drift_bps > self.params.drift_bps {
                let replace = match &worst {
                    None => true,
                    Some((_, best_drift)) => drift.abs() > *best_drift,
                };
                if replace {
                    worst = Some((*mint, drift));
                }
            }
        }

        let Some((mint, drift)) = worst else {
            return Ok(Action::noop("all tracked mints within drift tolerance"));
        };

        // Overweight (drift > 0): sell the excess into SOL. Underweight
        // (drift < 0): buy it with SOL.
        let excess_value = (drift.abs() * total as f64) as u64;
        if mint == sol_mint || excess_value == 0 {
            return Ok(Action::noop("drift detected on SOL itself or excess too small"));
        }
        let price = self.params.lamports_per_unit.get(&mint).copied().unwrap_or(0);
        if price == 0 {
            return Ok(Action::noop("no price available for the drifting mint"));
        }

        let (input_mint, output_mint, amount_in) = if drift > 0.0 {
            let units = excess_value.saturating_mul(1_000_000_000) / price;
            (mint, sol_mint, units)
        } else {
            (sol_mint, mint, excess_value)
        };

        if amount_in == 0 {
            return Ok(Action::noop("computed rebalance amount rounded to zero"));
        }

        Ok(Action::Swap(SwapParams {
            input_mint,
            output_mint,
            amount_in,
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
            other => return Err(anyhow::anyhow!("rebalancer: unexpected action {other:?}")),
        };
        let quote = registry
            .get_best_quote(&p.input_mint, &p.output_mint, p.amount_in)
            .await?;
        let adapter = registry.get(&quote.provider)?;
        let result = adapter.swap(wallet, &quote, p.slippage_bps)?;
        Ok(Some(result.as_tx_result()))
    }
}

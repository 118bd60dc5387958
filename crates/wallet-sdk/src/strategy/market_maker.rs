//! Alternates small two-sided swaps around a reference price. A
//! deliberately simple placeholder — real market making needs an order
//! book, which is out of scope here.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use solana_sdk::pubkey::Pubkey;

use crate::action::{Action, SwapParams};
use crate::agent_state::AgentState;
use crate::send::TxResult;
use crate::swap::SwapAdapterRegistry;
use crate::wallet_client::WalletClient;

use super::Strategy;

#[derive(Debug, Clone)]
pub struct MarketMakerParams {
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub clip_size: u64,
    pub slippage_bps: u16,
}

pub struct MarketMakerStrategy {
    params: MarketMakerParams,
    /// Flips each tick: true means the next clip sells base for quote.
    sell_base_next: AtomicBool,
}

impl MarketMakerStrategy {
    pub fn from_params(value: &serde_json::Value) -> anyhow::Result<Self> {
        let base_mint = parse_mint(value, "baseMint")?;
        let quote_mint = parse_mint(value, "quoteMint")?;
        let clip_size = value
            .get("clipSize")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("market_maker: `clipSize` missing or not a u64"))?;
        let slippage_bps = value
            .get("slippageBps")
            .and_then(|v| v.as_u64())
            .unwrap_or(50) as u16;
        Ok(MarketMakerStrategy {
            params: MarketMakerParams {
                base_mint,
                quote_mint,
                clip_size,
                slippage_bps,
            },
            sell_base_next: AtomicBool::new(true),
        })
    }
}

fn parse_mint(value: &serde_json::Value, field: &str) -> anyhow::Result<Pubkey> {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("market_maker: `{field}` missing or not a string"))?;
    Pubkey::from_str(raw).map_err(|e| anyhow::anyhow!("market_maker: `{field}` is not a valid pubkey: {e}"))
}

#[async_trait::async_trait]
impl Strategy for MarketMakerStrategy {
    fn name(&self) -> &str {
        "market_maker"
    }

    fn decide(&self, _state: &AgentState) -> anyhow::Result<Action> {
        if self.params.clip_size == 0 {
            return Ok(Action::noop("clip size is zero"));
        }
        let sell_base = self.sell_base_next.fetch_xor(true, Ordering::SeqCst);
        let (input_mint, output_mint) = if sell_base {
            (self.params.base_mint, self.params.quote_mint)
        } else {
            (self.params.quote_mint, self.params.base_mint)
        };
        Ok(Action::Swap(SwapParams {
            input_mint,
            output_mint,
            amount_in: self.params.clip_size,
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
            other => return Err(anyhow::anyhow!("market_maker: unexpected action {other:?}")),
        };
        let quote = registry
            .get_best_quote(&p.input_mint, &p.output_mint, p.amount_in)
            .await?;
        let adapter = registry.get(&quote.provider)?;
        let result = adapter.swap(wallet, &quote, p.slippage_bps)?;
        Ok(Some(result.as_tx_result()))
    }
}

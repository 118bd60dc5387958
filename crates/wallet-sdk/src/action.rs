//! Tagged-variant replacement for the dynamic casts a scripting-language
//! source would use for action params (§9 design note).

use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone)]
pub struct SwapParams {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone)]
pub struct TransferParams {
    pub to: Pubkey,
    pub lamports: u64,
}

#[derive(Debug, Clone)]
pub struct LpParams {
    pub pool: Pubkey,
    pub amount_a: u64,
    pub amount_b: u64,
}

/// A strategy's decision for one tick. The loop pattern-matches
/// exhaustively instead of casting an untyped map, so a new variant that
/// isn't handled somewhere is a compile error, not a runtime surprise.
#[derive(Debug, Clone)]
pub enum Action {
    Swap(SwapParams),
    Transfer(TransferParams),
    ProvideLiquidity(LpParams),
    Noop { rationale: String },
}

impl Action {
    pub fn noop(rationale: impl Into<String>) -> Self {
        Action::Noop {
            rationale: rationale.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Action::Noop { .. })
    }

    /// Params sanitized for logs/audit (§4.7): a JSON projection with
    /// nothing that cannot round-trip through a log line.
    pub fn params_json(&self) -> serde_json::Value {
        match self {
            Action::Swap(p) => serde_json::json!({
                "kind": "swap",
                "inputMint": p.input_mint.to_string(),
                "outputMint": p.output_mint.to_string(),
                "amountIn": p.amount_in.to_string(),
                "slippageBps": p.slippage_bps,
            }),
            Action::Transfer(p) => serde_json::json!({
                "kind": "transfer",
                "to": p.to.to_string(),
                "lamports": p.lamports.to_string(),
            }),
            Action::ProvideLiquidity(p) => serde_json::json!({
                "kind": "provide_liquidity",
                "pool": p.pool.to_string(),
                "amountA": p.amount_a.to_string(),
                "amountB": p.amount_b.to_string(),
            }),
            Action::Noop { rationale } => serde_json::json!({
                "kind": "noop",
                "rationale": rationale,
            }),
        }
    }
}

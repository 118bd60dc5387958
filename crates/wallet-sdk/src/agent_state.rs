//! Ephemeral per-tick state (§3 AgentState snapshot). Produced by the
//! gather-state phase, passed to the strategy, then discarded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone)]
pub struct AgentState {
    pub balances: HashMap<Pubkey, u64>,
    pub sol_balance: u64,
    pub tick_count: u64,
    pub last_action_at: Option<DateTime<Utc>>,
}

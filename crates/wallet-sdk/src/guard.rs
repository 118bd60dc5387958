//! Synchronous, non-suspending pre-sign invariant gate (§4.2). `check` is
//! side-effect-free; `record` is the only mutation of session spend.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SpendingLimits {
    pub max_per_tx_lamports: u64,
    pub max_session_lamports: u64,
    /// `None` means "allow any destination". `Some(vec![])` is invalid.
    pub destination_allowlist: Option<Vec<String>>,
}

impl SpendingLimits {
    pub fn new(
        max_per_tx_lamports: u64,
        max_session_lamports: u64,
        destination_allowlist: Option<Vec<String>>,
    ) -> Result<Self> {
        if max_per_tx_lamports == 0 {
            return Err(Error::InvalidConfig("maxPerTxLamports must be > 0".to_string()));
        }
        if max_session_lamports == 0 {
            return Err(Error::InvalidConfig("maxSessionLamports must be > 0".to_string()));
        }
        if max_per_tx_lamports > max_session_lamports {
            return Err(Error::InvalidConfig(
                "maxPerTxLamports must be <= maxSessionLamports".to_string(),
            ));
        }
        if let Some(list) = &destination_allowlist
            && list.is_empty()
        {
            return Err(Error::InvalidConfig(
                "destination allowlist must be non-empty when present".to_string(),
            ));
        }
        Ok(SpendingLimits {
            max_per_tx_lamports,
            max_session_lamports,
            destination_allowlist,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendingLimitStatus {
    pub max_per_tx_lamports: u64,
    pub max_session_lamports: u64,
    pub session_spend_lamports: u64,
}

/// Synchronous pre-sign gate. Every signing path in [`crate::wallet_client::WalletClient`]
/// calls [`check`](SpendingLimitGuard::check) before invoking the signer
/// closure and [`record`](SpendingLimitGuard::record) only after a
/// `confirmed` result.
pub struct SpendingLimitGuard {
    limits: SpendingLimits,
    session_spend_lamports: u64,
}

impl SpendingLimitGuard {
    pub fn new(limits: SpendingLimits) -> Self {
        SpendingLimitGuard {
            limits,
            session_spend_lamports: 0,
        }
    }

    /// No I/O, no suspension, no mutation.
    pub fn check(&self, estimated_lamports: u64, destination: Option<&str>) -> Result<()> {
        if estimated_lamports > self.limits.max_per_tx_lamports {
            return Err(Error::LimitBreach(format!(
                "per-tx limit exceeded: {:.6} SOL requested, limit {:.6} SOL",
                lamports_to_sol(estimated_lamports),
                lamports_to_sol(self.limits.max_per_tx_lamports),
            )));
        }
        if self.session_spend_lamports + estimated_lamports > self.limits.max_session_lamports {
            return Err(Error::LimitBreach(format!(
                "session cap exceeded: spend {:.6} SOL + request {:.6} SOL > cap {:.6} SOL",
                lamports_to_sol(self.session_spend_lamports),
                lamports_to_sol(estimated_lamports),
                lamports_to_sol(self.limits.max_session_lamports),
            )));
        }
        if let Some(allowlist) = &self.limits.destination_allowlist {
            match destination {
                Some(dest) if allowlist.iter().any(|a| a == dest) => {}
                _ => {
                    return Err(Error::LimitBreach(
                        "destination not in allowlist".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Must only be called after a `confirmed` TxResult (§4.2, §5 ordering
    /// guarantee: confirmation strictly precedes `record`).
    pub fn record(&mut self, actual_lamports: u64) -> Result<()> {
        self.session_spend_lamports = self.session_spend_lamports.saturating_add(actual_lamports);
        Ok(())
    }

    pub fn get_status(&self) -> SpendingLimitStatus {
        SpendingLimitStatus {
            max_per_tx_lamports: self.limits.max_per_tx_lamports,
            max_session_lamports: self.limits.max_session_lamports,
            session_spend_lamports: self.session_spend_lamports,
        }
    }

    pub fn get_session_spend(&self) -> u64 {
        self.session_spend_lamports
    }

    /// Test-only: resets session spend to zero.
    pub fn reset(&mut self) {
        self.session_spend_lamports = 0;
    }
}

fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

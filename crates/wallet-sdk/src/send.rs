//! Blockhash refresh, simulation, submission, retry/backoff, and
//! confirmation polling (§4.3). Grounded on `chain_watcher.rs`'s
//! doubling-backoff reconnect loop, adapted from "reconnect a socket" to
//! "resubmit a transaction."
//!
//! The RPC surface is a narrow trait rather than a concrete client: actual
//! wire encoding and network I/O are chain-library internals and are out
//! of scope (§1) — callers provide an [`RpcClient`] implementation backed
//! by whatever client crate they choose.

use std::time::Duration;

use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// Outcome of submitting a signed transaction. The three non-`Submitted`
/// variants drive the retry classification in step 5 of the algorithm.
pub enum SubmitOutcome {
    Submitted(Signature),
    BlockhashExpired,
    /// A known, terminal submission error (e.g. an instruction error) —
    /// no retry.
    Known(String),
    /// Network/transient failure — log and retry.
    Transient(String),
}

pub struct SimulationReport {
    pub success: bool,
    pub error: Option<String>,
    pub compute_units_consumed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Reached(Commitment),
    Errored,
}

pub struct SignatureStatusReport {
    pub status: ConfirmationStatus,
    pub slot: Option<u64>,
    pub err: Option<String>,
}

/// The chain access this engine needs. Implementations typically wrap a
/// real RPC client; tests use an in-memory fake.
pub trait RpcClient: Send + Sync {
    fn get_latest_blockhash(&self, commitment: Commitment) -> Result<Hash>;
    fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulationReport>;
    fn submit_transaction(&self, tx: &Transaction) -> SubmitOutcome;
    fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatusReport>;
    fn get_compute_units_consumed(&self, _signature: &Signature) -> Option<u64> {
        None
    }
}

/// The only way this engine obtains a signed artifact — it never sees the
/// raw secret (§4.3).
pub trait SignerCallback {
    fn sign(&self, tx: &mut Transaction) -> Result<()>;
}

impl<F> SignerCallback for F
where
    F: Fn(&mut Transaction) -> Result<()> + Send + Sync,
{
    fn sign(&self, tx: &mut Transaction) -> Result<()> {
        self(tx)
    }
}

#[derive(Debug, Clone)]
pub struct SendConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub commitment: Commitment,
    pub simulate_before_send: bool,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        SendConfig {
            max_retries: 3,
            retry_delay_ms: 500,
            commitment: Commitment::Confirmed,
            simulate_before_send: true,
            poll_interval_ms: 2000,
            poll_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Confirmed,
    Failed,
    Timeout,
    Simulated,
}

#[derive(Debug, Clone)]
pub struct TxResult {
    pub signature: Option<String>,
    pub status: TxStatus,
    pub slot: Option<u64>,
    pub error: Option<String>,
    pub compute_units_consumed: Option<u64>,
}

impl TxResult {
    fn confirmed(signature: Signature, slot: Option<u64>, compute_units_consumed: Option<u64>) -> Self {
        TxResult {
            signature: Some(signature.to_string()),
            status: TxStatus::Confirmed,
            slot,
            error: None,
            compute_units_consumed,
        }
    }

    fn failed(signature: Option<Signature>, error: impl Into<String>) -> Self {
        TxResult {
            signature: signature.map(|s| s.to_string()),
            status: TxStatus::Failed,
            slot: None,
            error: Some(error.into()),
            compute_units_consumed: None,
        }
    }

    fn timeout(signature: Option<Signature>, error: impl Into<String>) -> Self {
        TxResult {
            signature: signature.map(|s| s.to_string()),
            status: TxStatus::Timeout,
            slot: None,
            error: Some(error.into()),
            compute_units_consumed: None,
        }
    }

    fn simulated(error: impl Into<String>) -> Self {
        TxResult {
            signature: None,
            status: TxStatus::Simulated,
            slot: None,
            error: Some(error.into()),
            compute_units_consumed: None,
        }
    }
}

/// Sends `tx` and drives it to a terminal [`TxResult`]. Never returns
/// `Err` for chain-level failures — those are mapped to a non-confirmed
/// status; `Err` is reserved for the signer-callback failure path, which
/// the caller surfaces as `signingFailed` without retry.
pub async fn send_and_confirm(
    mut tx: Transaction,
    signer: &dyn SignerCallback,
    rpc: &dyn RpcClient,
    config: &SendConfig,
) -> Result<TxResult> {
    let mut delay = Duration::from_millis(config.retry_delay_ms);
    let mut last_signature: Option<Signature> = None;

    for attempt in 0..config.max_retries {
        let blockhash = match rpc.get_latest_blockhash(config.commitment) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("blockhash fetch failed (attempt {attempt}): {e}");
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
        };
        tx.message.recent_blockhash = blockhash;

        signer.sign(&mut tx)?; // signingFailed — no retry, propagate.

        if config.simulate_before_send {
            let report = rpc.simulate_transaction(&tx)?;
            if !report.success {
                let message = report.error.unwrap_or_else(|| "simulation rejected".to_string());
                return Ok(TxResult::simulated(message));
            }
        }

        match rpc.submit_transaction(&tx) {
            SubmitOutcome::Submitted(signature) => {
                last_signature = Some(signature);
                return Ok(poll_for_confirmation(signature, rpc, config).await);
            }
            SubmitOutcome::BlockhashExpired => {
                log::warn!("blockhash expired on attempt {attempt}, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            SubmitOutcome::Known(message) => {
                return Ok(TxResult::failed(last_signature, message));
            }
            SubmitOutcome::Transient(message) => {
                log::warn!("transient submission error on attempt {attempt}: {message}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    Ok(TxResult::timeout(
        last_signature,
        format!("Exhausted {} attempts: no successful submission", config.max_retries),
    ))
}

/// Polls until the reported status reaches at least `config.commitment`
/// (§4.3 step 6 — `Commitment`'s derived `Ord` is the ≥ comparison). A
/// status below the configured level is treated the same as `Pending`:
/// keep polling until the deadline.
async fn poll_for_confirmation(signature: Signature, rpc: &dyn RpcClient, config: &SendConfig) -> TxResult {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(config.poll_timeout_ms);
    loop {
        match rpc.get_signature_status(&signature) {
            Ok(report) => match report.status {
                ConfirmationStatus::Reached(level) if level >= config.commitment => {
                    let compute_units = rpc.get_compute_units_consumed(&signature);
                    return TxResult::confirmed(signature, report.slot, compute_units);
                }
                ConfirmationStatus::Errored => {
                    return TxResult::failed(
                        Some(signature),
                        report.err.unwrap_or_else(|| "transaction failed on-chain".to_string()),
                    );
                }
                ConfirmationStatus::Reached(_) | ConfirmationStatus::Pending => {}
            },
            Err(e) => {
                log::warn!("signature status poll failed: {e}");
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return TxResult::timeout(Some(signature), "confirmation polling timed out".to_string());
        }
        tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
    }
}

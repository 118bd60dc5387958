//! Per-agent tick loop (§4.7). `idle → running → stopped` is terminal; a
//! thrown error within a tick never leaves `running` — it is caught,
//! classified, and logged, and the loop proceeds to the next tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use audit_store::{AuditDb, NewEvent};
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use wallet_sdk::{Action, AgentState, Strategy, SwapAdapterRegistry, TxStatus, WalletClient};

const REMOTE_STOP_SAFETY_BUFFER: chrono::Duration = chrono::Duration::seconds(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

#[derive(Debug, Clone)]
pub struct AgentLoopState {
    pub status: LoopStatus,
    pub tick_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_action_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for AgentLoopState {
    fn default() -> Self {
        AgentLoopState {
            status: LoopStatus::Idle,
            tick_count: 0,
            started_at: None,
            last_tick_at: None,
            last_action_at: None,
            last_error: None,
        }
    }
}

pub struct AgentLoop {
    agent_id: String,
    wallet: Arc<WalletClient>,
    strategy: Box<dyn Strategy>,
    registry: Arc<SwapAdapterRegistry>,
    audit: Arc<tokio::sync::Mutex<AuditDb>>,
    tracked_mints: Vec<Pubkey>,
    interval: Duration,
    state: Arc<Mutex<AgentLoopState>>,
    stop_flag: Arc<AtomicBool>,
}

impl AgentLoop {
    pub fn new(
        agent_id: String,
        wallet: Arc<WalletClient>,
        strategy: Box<dyn Strategy>,
        registry: Arc<SwapAdapterRegistry>,
        audit: Arc<tokio::sync::Mutex<AuditDb>>,
        tracked_mints: Vec<Pubkey>,
        interval: Duration,
    ) -> Self {
        AgentLoop {
            agent_id,
            wallet,
            strategy,
            registry,
            audit,
            tracked_mints,
            interval,
            state: Arc::new(Mutex::new(AgentLoopState::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn get_state(&self) -> AgentLoopState {
        self.state.lock().unwrap().clone()
    }

    /// Flips a flag without interrupting the in-flight tick (§5 cancellation).
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// The main driver. MUST NOT reject — every failure mode inside a tick
    /// is caught and recorded as an audit event instead.
    pub async fn start(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.status == LoopStatus::Running {
                return;
            }
            state.status = LoopStatus::Running;
            state.started_at = Some(Utc::now());
        }
        let started_at = self.state.lock().unwrap().started_at.expect("just set");
        self.emit("agent_start", None, None, serde_json::json!({})).await;

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            self.tick(started_at).await;
            if self.state.lock().unwrap().status == LoopStatus::Stopped {
                // The remote-stop path inside `tick` already emitted its own
                // `agent_stop` with a specific reason.
                return;
            }
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        self.state.lock().unwrap().status = LoopStatus::Stopped;
        self.emit("agent_stop", None, None, serde_json::json!({"reason": "stop() called"}))
            .await;
    }

    async fn tick(&self, started_at: DateTime<Utc>) {
        {
            let mut state = self.state.lock().unwrap();
            state.tick_count += 1;
            state.last_tick_at = Some(Utc::now());
        }

        match self.check_remote_stop(started_at).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                self.record_failure(&e.to_string(), "agent_error").await;
                return;
            }
        }

        if let Err(e) = self.run_tick_body().await {
            let code = e.downcast_ref::<wallet_sdk::Error>().map(|err| err.code());
            let event = if code == Some("LIMIT_BREACH") { "limit_breach" } else { "agent_error" };
            self.record_failure(&e.to_string(), event).await;
        }
    }

    /// Steps 2 of the tick pipeline: the audit database doubles as a
    /// cross-process mailbox for remote stop requests (§9 design note). The
    /// safety buffer rejects a stale signal from halting a freshly
    /// restarted loop instance.
    async fn check_remote_stop(&self, started_at: DateTime<Utc>) -> Result<bool, audit_store::StoreError> {
        let row = {
            let mut db = self.audit.lock().await;
            db.latest_stop_request(&self.agent_id)?
        };
        let Some(row) = row else {
            return Ok(false);
        };
        let Ok(signal_at) = DateTime::parse_from_rfc3339(&row.ts) else {
            return Ok(false);
        };
        if signal_at.with_timezone(&Utc) <= started_at - REMOTE_STOP_SAFETY_BUFFER {
            return Ok(false);
        }
        self.state.lock().unwrap().status = LoopStatus::Stopped;
        self.emit("agent_stop", None, None, serde_json::json!({"reason": "Remote stop signal received"}))
            .await;
        Ok(true)
    }

    /// Steps 3-7: gather state, decide, and (unless noop) execute.
    async fn run_tick_body(&self) -> anyhow::Result<()> {
        let state = self.gather_state().await;
        let action = self.strategy.decide(&state)?;

        if let Action::Noop { rationale } = &action {
            self.emit(
                "agent_noop",
                None,
                None,
                serde_json::json!({"rationale": rationale, "solBalance": state.sol_balance}),
            )
            .await;
            return Ok(());
        }

        let result = self.strategy.execute(&action, &self.wallet, &self.registry).await?;
        self.state.lock().unwrap().last_action_at = Some(Utc::now());

        match result {
            None => {
                self.emit("agent_action", None, None, action.params_json()).await;
            }
            Some(tx) => {
                let (event, status) = match tx.status {
                    TxStatus::Confirmed => ("tx_confirmed", "confirmed"),
                    TxStatus::Failed => ("tx_failed", "failed"),
                    TxStatus::Timeout => ("tx_timeout", "timeout"),
                    TxStatus::Simulated => ("tx_failed", "simulated"),
                };
                self.emit(event, tx.signature.as_deref(), Some(status), action.params_json())
                    .await;
            }
        }
        Ok(())
    }

    /// Reads SOL balance and every tracked mint's token balance
    /// concurrently; a failed per-mint read degrades to zero rather than
    /// failing the tick (§4.7 step 3).
    async fn gather_state(&self) -> AgentState {
        let tick_count = self.state.lock().unwrap().tick_count;
        let last_action_at = self.state.lock().unwrap().last_action_at;

        let wallet = self.wallet.clone();
        let sol_balance = match tokio::task::spawn_blocking(move || wallet.get_sol_balance()).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(e)) => {
                log::warn!("agent {}: sol balance read failed, degrading to 0: {e}", self.agent_id);
                0
            }
            Err(e) => {
                log::warn!("agent {}: sol balance task panicked: {e}", self.agent_id);
                0
            }
        };

        let mut balances = HashMap::new();
        if !self.tracked_mints.is_empty() {
            let mut set = tokio::task::JoinSet::new();
            for mint in self.tracked_mints.iter().copied() {
                let wallet = self.wallet.clone();
                set.spawn_blocking(move || (mint, wallet.get_token_balance(&mint)));
            }
            while let Some(joined) = set.join_next().await {
                if let Ok((mint, result)) = joined {
                    let balance = result.unwrap_or_else(|e| {
                        log::warn!("agent {}: token balance read failed for {mint}, degrading to 0: {e}", self.agent_id);
                        0
                    });
                    balances.insert(mint, balance);
                }
            }
        }

        AgentState {
            balances,
            sol_balance,
            tick_count,
            last_action_at,
        }
    }

    async fn record_failure(&self, message: &str, event: &str) {
        self.state.lock().unwrap().last_error = Some(message.to_string());
        self.emit(event, None, None, serde_json::json!({"error": message})).await;
    }

    async fn emit(&self, event: &str, signature: Option<&str>, status: Option<&str>, details: serde_json::Value) {
        let pubkey = self.wallet.public_key().to_string();
        let mut db = self.audit.lock().await;
        let outcome = db.append(NewEvent {
            ts: Utc::now(),
            agent_id: &self.agent_id,
            event,
            wallet_pk: &pubkey,
            signature,
            status,
            details,
        });
        if let Err(e) = outcome {
            log::error!("agent {}: failed to write audit event `{event}`: {e}", self.agent_id);
        }
    }
}

//! MultiAgentManager (§4.8). Owns one shared `AuditDb`, one shared RPC
//! client and swap registry, and one isolated `WalletClient`/`AgentLoop`
//! pair per configured agent.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use audit_store::AuditDb;
use wallet_sdk::keystore::load_secret_from_env;
use wallet_sdk::send::SendConfig;
use wallet_sdk::{ChainClient, SigningIdentity, SwapAdapterRegistry, WalletClient, WalletConfig};

use crate::agent_loop::{AgentLoop, AgentLoopState};
use crate::config::AgentConfig;
use crate::env::EnvConfig;

pub struct MultiAgentManager {
    loops: HashMap<String, Arc<AgentLoop>>,
    audit: Arc<tokio::sync::Mutex<AuditDb>>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for MultiAgentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiAgentManager")
            .field("agent_ids", &self.loops.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MultiAgentManager {
    /// Opens the shared audit store and constructs one isolated
    /// `WalletClient`/`AgentLoop` per agent entry. Fails fast — before any
    /// loop is started — on a bad keystore, bad params, or an id with no
    /// resolvable secret.
    pub fn new(
        env: &EnvConfig,
        agents: &[AgentConfig],
        chain: Arc<dyn ChainClient>,
        swap_registry: Arc<SwapAdapterRegistry>,
    ) -> Result<Self, String> {
        let audit = AuditDb::open(&env.audit_db_path).map_err(|e| format!("failed to open audit store: {e}"))?;
        let audit = Arc::new(tokio::sync::Mutex::new(audit));

        let mut loops = HashMap::with_capacity(agents.len());
        for agent in agents {
            let wallet = build_wallet_client(env, agent, chain.clone())?;
            let strategy = wallet_sdk::strategy::build(&agent.strategy, &agent.strategy_params)
                .map_err(|e| format!("agent `{}`: {e}", agent.id))?;
            let agent_loop = AgentLoop::new(
                agent.id.clone(),
                Arc::new(wallet),
                strategy,
                swap_registry.clone(),
                audit.clone(),
                agent.tracked_mints.clone(),
                Duration::from_millis(agent.interval_ms),
            );
            loops.insert(agent.id.clone(), Arc::new(agent_loop));
        }

        Ok(MultiAgentManager {
            loops,
            audit,
            handles: Vec::new(),
        })
    }

    /// Spawns every agent's loop as an independent task. One agent's panic
    /// or persistent error never stops another's (§5 isolation).
    pub fn start_all(&mut self) {
        for agent_loop in self.loops.values() {
            let agent_loop = agent_loop.clone();
            self.handles.push(tokio::spawn(async move {
                agent_loop.start().await;
            }));
        }
    }

    /// Signals every loop to stop, waits for each to finish its in-flight
    /// tick, then closes the shared audit store.
    pub async fn stop(&mut self) {
        for agent_loop in self.loops.values() {
            agent_loop.stop();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        let mut db = self.audit.lock().await;
        let _ = db.close();
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.loops.keys().map(|id| id.as_str()).collect()
    }

    pub fn get_agent_state(&self, agent_id: &str) -> Option<AgentLoopState> {
        self.loops.get(agent_id).map(|l| l.get_state())
    }

    pub fn get_agent_states(&self) -> HashMap<String, AgentLoopState> {
        self.loops.iter().map(|(id, l)| (id.clone(), l.get_state())).collect()
    }

    pub fn audit(&self) -> Arc<tokio::sync::Mutex<AuditDb>> {
        self.audit.clone()
    }
}

/// Secret load order (§4.8): per-agent env override, then keystore file +
/// `WALLET_PASSWORD`. The dev/test-only raw `WALLET_SECRET_KEY` global is
/// intentionally not consulted here — it exists for single-agent manual
/// runs, not as a fallback across a fleet of keystore-backed agents.
fn build_wallet_client(env: &EnvConfig, agent: &AgentConfig, chain: Arc<dyn ChainClient>) -> Result<WalletClient, String> {
    let identity = if let Some(raw_secret) = env.agent_secret_key(&agent.id) {
        let is_production = env.mode == crate::env::AppMode::Production;
        let secret = load_secret_from_env(&raw_secret, is_production).map_err(|e| format!("agent `{}`: {e}", agent.id))?;
        SigningIdentity::from_secret(secret)
    } else {
        let password = env
            .wallet_password
            .as_ref()
            .ok_or_else(|| format!("agent `{}`: no WALLET_SECRET_KEY_{} and no WALLET_PASSWORD set", agent.id, agent.id.to_uppercase()))?;
        wallet_sdk::keystore::open(Path::new(&agent.keystore_path), password).map_err(|e| format!("agent `{}`: {e}", agent.id))?
    };

    let config = WalletConfig {
        rpc_url: env.rpc_url.clone(),
        limits: agent.limits.clone(),
        send_config: SendConfig::default(),
    };
    WalletClient::new(identity, chain, config).map_err(|e| format!("agent `{}`: {e}", agent.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::Transaction;
    use wallet_sdk::send::{Commitment, ConfirmationStatus, RpcClient, SignatureStatusReport, SimulationReport, SubmitOutcome};

    struct FakeChain;

    impl RpcClient for FakeChain {
        fn get_latest_blockhash(&self, _commitment: Commitment) -> wallet_sdk::Result<Hash> {
            Ok(Hash::default())
        }
        fn simulate_transaction(&self, _tx: &Transaction) -> wallet_sdk::Result<SimulationReport> {
            Ok(SimulationReport { success: true, error: None, compute_units_consumed: Some(0) })
        }
        fn submit_transaction(&self, _tx: &Transaction) -> SubmitOutcome {
            SubmitOutcome::Submitted(Signature::default())
        }
        fn get_signature_status(&self, _signature: &Signature) -> wallet_sdk::Result<SignatureStatusReport> {
            Ok(SignatureStatusReport { status: ConfirmationStatus::Reached(Commitment::Confirmed), slot: Some(1), err: None })
        }
    }

    impl ChainClient for FakeChain {
        fn rpc(&self) -> &dyn RpcClient {
            self
        }
        fn get_sol_balance(&self, _owner: &Pubkey) -> wallet_sdk::Result<u64> {
            Ok(1_000_000_000)
        }
        fn get_token_account(&self, _owner: &Pubkey, _mint: &Pubkey) -> wallet_sdk::Result<Option<Pubkey>> {
            Ok(None)
        }
        fn get_token_balance(&self, _token_account: &Pubkey) -> wallet_sdk::Result<u64> {
            Ok(0)
        }
        fn get_token_decimals(&self, _mint: &Pubkey) -> wallet_sdk::Result<u8> {
            Ok(6)
        }
        fn build_create_ata_transaction(&self, _owner: &Pubkey, _mint: &Pubkey) -> wallet_sdk::Result<Transaction> {
            Ok(Transaction::default())
        }
        fn build_transfer_transaction(&self, _from: &Pubkey, _to: &Pubkey, _lamports: u64) -> wallet_sdk::Result<Transaction> {
            Ok(Transaction::default())
        }
        fn build_transfer_checked_transaction(
            &self,
            _owner: &Pubkey,
            _mint: &Pubkey,
            _source_ata: &Pubkey,
            _dest_ata: &Pubkey,
            _create_dest_ata: bool,
            _amount: u64,
            _decimals: u8,
        ) -> wallet_sdk::Result<Transaction> {
            Ok(Transaction::default())
        }
    }

    fn env_with(audit_db_path: String) -> EnvConfig {
        EnvConfig::from_lookup(move |key| {
            if key == "AUDIT_DB_PATH" {
                Some(audit_db_path.clone())
            } else {
                None
            }
        })
        .unwrap()
    }

    fn make_agent(dir: &tempfile::TempDir, id: &str) -> AgentConfig {
        let keystore_path = dir.path().join(format!("{id}.json"));
        let mut secret = [5u8; 64];
        secret[32..].copy_from_slice(&[6u8; 32]);
        wallet_sdk::keystore::create(secret, "correcthorsebattery", &keystore_path).unwrap();
        AgentConfig {
            id: id.to_string(),
            keystore_path: keystore_path.to_string_lossy().to_string(),
            strategy: "monitor".to_string(),
            strategy_params: serde_json::json!({}),
            interval_ms: 50,
            limits: wallet_sdk::guard::SpendingLimits::new(100_000_000, 500_000_000, None).unwrap(),
            tracked_mints: Vec::new(),
        }
    }

    #[tokio::test]
    async fn builds_one_loop_per_agent_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = env_with(dir.path().join("audit.db").to_string_lossy().to_string());
        env.wallet_password = Some("correcthorsebattery".to_string());
        let agents = vec![make_agent(&dir, "agent-a"), make_agent(&dir, "agent-b")];

        let chain: Arc<dyn ChainClient> = Arc::new(FakeChain);
        let registry = Arc::new(SwapAdapterRegistry::new(vec![]));
        let mut manager = MultiAgentManager::new(&env, &agents, chain, registry).unwrap();

        assert_eq!(manager.agent_ids().len(), 2);
        manager.start_all();
        tokio::time::sleep(Duration::from_millis(80)).await;
        manager.stop().await;

        let state = manager.get_agent_state("agent-a").unwrap();
        assert!(state.tick_count >= 1);
    }

    #[tokio::test]
    async fn three_agents_tick_independently_and_one_failure_does_not_spread() {
        use crate::agent_loop::LoopStatus;

        let dir = tempfile::tempdir().unwrap();
        let mut env = env_with(dir.path().join("audit.db").to_string_lossy().to_string());
        env.wallet_password = Some("correcthorsebattery".to_string());

        let agent_a = make_agent(&dir, "agent-a");
        let agent_b = make_agent(&dir, "agent-b");
        let mut agent_c = make_agent(&dir, "agent-c");
        agent_c.strategy = "dca".to_string();
        agent_c.strategy_params = serde_json::json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "amountIn": 1_000_000,
            "intervalSecs": 0,
        });

        let chain: Arc<dyn ChainClient> = Arc::new(FakeChain);
        // No adapters registered: agent-c's dca strategy swaps every tick and
        // always fails with `quoteFailed`, proving that a repeatedly-failing
        // loop doesn't affect its siblings sharing the same registry.
        let registry = Arc::new(SwapAdapterRegistry::new(vec![]));
        let mut manager = MultiAgentManager::new(&env, &[agent_a, agent_b, agent_c], chain, registry).unwrap();

        manager.start_all();
        tokio::time::sleep(Duration::from_millis(150)).await;
        manager.stop().await;

        let states = manager.get_agent_states();
        for id in ["agent-a", "agent-b", "agent-c"] {
            let state = states.get(id).unwrap_or_else(|| panic!("missing state for {id}"));
            assert!(state.tick_count >= 1, "{id} never ticked");
            assert_eq!(state.status, LoopStatus::Stopped, "{id} did not stop cleanly");
        }
        assert!(states["agent-c"].last_error.is_some(), "agent-c's quote failures should be recorded");
        assert!(states["agent-a"].last_error.is_none(), "agent-a should be unaffected by agent-c's failures");
        assert!(states["agent-b"].last_error.is_none(), "agent-b should be unaffected by agent-c's failures");
    }

    #[test]
    fn rejects_agent_with_no_resolvable_secret() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_with(dir.path().join("audit.db").to_string_lossy().to_string());
        let agents = vec![make_agent(&dir, "agent-a")];

        let chain: Arc<dyn ChainClient> = Arc::new(FakeChain);
        let registry = Arc::new(SwapAdapterRegistry::new(vec![]));
        let err = MultiAgentManager::new(&env, &agents, chain, registry).unwrap_err();
        assert!(err.contains("WALLET_PASSWORD"));
    }
}

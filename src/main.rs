//! Thin binary entry point (§6). The CLI surface proper — a pretty-printer,
//! a dashboard, anything that drives a live chain — is an external
//! collaborator's concern (§1); what ships here loads and validates the
//! environment and agent configuration the library needs, the same
//! validation a real embedder's process would run before constructing a
//! [`agent_wallet_runtime::MultiAgentManager`] with its own `ChainClient`
//! and `SwapAdapter` implementations.

use std::process::ExitCode;

use agent_wallet_runtime::env::EnvConfig;
use agent_wallet_runtime::{logging, parse_agents_config};

fn main() -> ExitCode {
    let env = match EnvConfig::from_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    logging::init(&env.log_level);

    let agents_json = match std::fs::read_to_string(&env.agents_config_path) {
        Ok(contents) => contents,
        Err(e) => {
            log::error!("failed to read {}: {e}", env.agents_config_path);
            return ExitCode::from(1);
        }
    };

    let agents = match parse_agents_config(&agents_json) {
        Ok(agents) => agents,
        Err(e) => {
            log::error!("{}: {e}", env.agents_config_path);
            return ExitCode::from(1);
        }
    };

    log::info!(
        "loaded {} agent(s) against {} ({:?}); audit store at {}",
        agents.len(),
        env.rpc_url,
        env.network,
        env.audit_db_path
    );
    for agent in &agents {
        log::info!("  agent `{}`: strategy={} interval={}ms", agent.id, agent.strategy, agent.interval_ms);
    }
    log::info!(
        "configuration is valid. Running agents requires an embedder to supply a ChainClient \
         and SwapAdapter set (chain-library internals and quote APIs are out of scope) and call \
         MultiAgentManager::new/start_all."
    );

    ExitCode::SUCCESS
}

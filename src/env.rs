//! Environment contract (§4.10, §6). Parsed once at startup into a typed
//! config; any failure is a readable diagnostic on stderr before any I/O,
//! never a panic.

use wallet_sdk::guard::SpendingLimits;
use wallet_sdk::network::{Network, is_mainnet_url};

const DEFAULT_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
const DEFAULT_AUDIT_DB_PATH: &str = "audit.db";
const DEFAULT_AGENTS_CONFIG_PATH: &str = "agents.json";
const DEFAULT_AGENT_INTERVAL_MS: u64 = 60_000;
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Development,
    Test,
    Production,
}

impl std::str::FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppMode::Development),
            "test" => Ok(AppMode::Test),
            "production" => Ok(AppMode::Production),
            other => Err(format!("NODE_ENV must be one of development|test|production, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub rpc_url: String,
    pub network: Network,
    pub mode: AppMode,
    pub wallet_password: Option<String>,
    pub wallet_secret_key: Option<String>,
    pub default_limits: SpendingLimits,
    pub log_level: String,
    pub audit_db_path: String,
    pub agents_config_path: String,
    pub agent_interval_ms: u64,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Injectable lookup so tests can exercise parsing without mutating the
    /// real process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mode = match lookup("NODE_ENV") {
            Some(raw) => raw.parse::<AppMode>()?,
            None => AppMode::Development,
        };

        let wallet_secret_key = lookup("WALLET_SECRET_KEY");
        if mode == AppMode::Production && wallet_secret_key.is_some() {
            return Err("NODE_ENV=production forbids WALLET_SECRET_KEY — use a keystore file instead".to_string());
        }

        let rpc_url = lookup("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_DEVNET_RPC_URL.to_string());
        if is_mainnet_url(&rpc_url) {
            return Err(format!("SOLANA_RPC_URL `{rpc_url}` looks like a mainnet endpoint, which is not permitted"));
        }

        let network = match lookup("SOLANA_NETWORK") {
            Some(raw) => raw.parse::<Network>().map_err(|e| e.to_string())?,
            None => Network::Devnet,
        };

        let wallet_password = lookup("WALLET_PASSWORD");
        if let Some(password) = &wallet_password {
            if password.chars().count() < 8 {
                return Err("WALLET_PASSWORD must be at least 8 characters".to_string());
            }
        }

        let max_per_tx_sol = parse_sol_env(&lookup, "MAX_PER_TX_SOL", 0.1)?;
        let max_session_sol = parse_sol_env(&lookup, "MAX_SESSION_SOL", 1.0)?;
        let default_limits = SpendingLimits::new(sol_to_lamports(max_per_tx_sol), sol_to_lamports(max_session_sol), None)
            .map_err(|e| e.to_string())?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let audit_db_path = lookup("AUDIT_DB_PATH").unwrap_or_else(|| DEFAULT_AUDIT_DB_PATH.to_string());
        let agents_config_path = lookup("AGENTS_CONFIG_PATH").unwrap_or_else(|| DEFAULT_AGENTS_CONFIG_PATH.to_string());
        let agent_interval_ms = match lookup("AGENT_INTERVAL_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("AGENT_INTERVAL_MS must be a positive integer, got `{raw}`"))?,
            None => DEFAULT_AGENT_INTERVAL_MS,
        };

        Ok(EnvConfig {
            rpc_url,
            network,
            mode,
            wallet_password,
            wallet_secret_key,
            default_limits,
            log_level,
            audit_db_path,
            agents_config_path,
            agent_interval_ms,
        })
    }

    /// Per-agent override, preferred over the global `WALLET_SECRET_KEY`
    /// (§4.8 load order).
    pub fn agent_secret_key(&self, agent_id: &str) -> Option<String> {
        let var = format!("WALLET_SECRET_KEY_{}", agent_id.to_uppercase().replace('-', "_"));
        std::env::var(var).ok()
    }
}

fn parse_sol_env(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64, String> {
    match lookup(key) {
        Some(raw) => raw.parse::<f64>().map_err(|_| format!("{key} must be a number, got `{raw}`")),
        None => Ok(default),
    }
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + use<'a> {
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = EnvConfig::from_lookup(lookup(HashMap::new())).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_DEVNET_RPC_URL);
        assert_eq!(config.mode, AppMode::Development);
    }

    #[test]
    fn rejects_mainnet_rpc_url() {
        let mut vars = HashMap::new();
        vars.insert("SOLANA_RPC_URL", "https://api.mainnet-beta.solana.com");
        let err = EnvConfig::from_lookup(lookup(vars)).unwrap_err();
        assert!(err.contains("mainnet"));
    }

    #[test]
    fn rejects_production_with_raw_secret_key() {
        let mut vars = HashMap::new();
        vars.insert("NODE_ENV", "production");
        vars.insert("WALLET_SECRET_KEY", "whatever");
        let err = EnvConfig::from_lookup(lookup(vars)).unwrap_err();
        assert!(err.contains("production"));
    }

    #[test]
    fn rejects_short_wallet_password() {
        let mut vars = HashMap::new();
        vars.insert("WALLET_PASSWORD", "short");
        let err = EnvConfig::from_lookup(lookup(vars)).unwrap_err();
        assert!(err.contains("WALLET_PASSWORD"));
    }

    #[test]
    fn converts_sol_limits_to_lamports() {
        let mut vars = HashMap::new();
        vars.insert("MAX_PER_TX_SOL", "0.1");
        vars.insert("MAX_SESSION_SOL", "0.5");
        let config = EnvConfig::from_lookup(lookup(vars)).unwrap();
        assert_eq!(config.default_limits.max_per_tx_lamports, 100_000_000);
        assert_eq!(config.default_limits.max_session_lamports, 500_000_000);
    }
}

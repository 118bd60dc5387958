//! Agent configuration file loader (§4.8, §6). A JSON array of per-agent
//! entries; invalid entries abort loading with a message naming the field
//! and the index.

use std::str::FromStr;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use wallet_sdk::guard::SpendingLimits;

use crate::env::sol_to_lamports;

#[derive(Debug, Deserialize)]
struct RawLimits {
    #[serde(rename = "maxPerTxSol")]
    max_per_tx_sol: Option<f64>,
    #[serde(rename = "maxSessionSol")]
    max_session_sol: Option<f64>,
    #[serde(rename = "maxPerTxLamports")]
    max_per_tx_lamports: Option<serde_json::Value>,
    #[serde(rename = "maxSessionLamports")]
    max_session_lamports: Option<serde_json::Value>,
    #[serde(rename = "destinationAllowlist")]
    destination_allowlist: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawAgentConfig {
    id: String,
    #[serde(rename = "keystorePath")]
    keystore_path: String,
    strategy: String,
    #[serde(rename = "strategyParams", default = "default_params")]
    strategy_params: serde_json::Value,
    #[serde(rename = "intervalMs")]
    interval_ms: u64,
    limits: RawLimits,
    #[serde(rename = "trackedMints", default)]
    tracked_mints: Vec<String>,
}

fn default_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

const KNOWN_STRATEGIES: &[&str] = &["dca", "rebalancer", "monitor", "market_maker"];

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub id: String,
    pub keystore_path: String,
    pub strategy: String,
    pub strategy_params: serde_json::Value,
    pub interval_ms: u64,
    pub limits: SpendingLimits,
    pub tracked_mints: Vec<Pubkey>,
}

/// Parses and validates the agent configuration file's contents. Does not
/// touch the filesystem itself so callers can feed fixtures in tests.
pub fn parse_agents_config(json: &str) -> Result<Vec<AgentConfig>, String> {
    let raw: Vec<RawAgentConfig> =
        serde_json::from_str(json).map_err(|e| format!("agents config is not a valid JSON array: {e}"))?;

    if raw.is_empty() {
        return Err("agents config must contain at least one agent".to_string());
    }

    let mut seen_ids = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        out.push(validate_entry(index, entry, &mut seen_ids)?);
    }
    Ok(out)
}

fn validate_entry(
    index: usize,
    entry: RawAgentConfig,
    seen_ids: &mut std::collections::HashSet<String>,
) -> Result<AgentConfig, String> {
    if entry.id.is_empty() {
        return Err(format!("agents[{index}]: `id` must not be empty"));
    }
    if !seen_ids.insert(entry.id.clone()) {
        return Err(format!("agents[{index}]: duplicate agent id `{}`", entry.id));
    }
    if entry.keystore_path.is_empty() {
        return Err(format!("agents[{index}] (`{}`): `keystorePath` must not be empty", entry.id));
    }
    if !KNOWN_STRATEGIES.contains(&entry.strategy.as_str()) {
        return Err(format!(
            "agents[{index}] (`{}`): `strategy` must be one of {KNOWN_STRATEGIES:?}, got `{}`",
            entry.id, entry.strategy
        ));
    }
    if entry.interval_ms == 0 {
        return Err(format!("agents[{index}] (`{}`): `intervalMs` must be > 0", entry.id));
    }

    let limits = resolve_limits(index, &entry.id, &entry.limits)?;

    let mut tracked_mints = Vec::with_capacity(entry.tracked_mints.len());
    for raw_mint in &entry.tracked_mints {
        let mint = Pubkey::from_str(raw_mint)
            .map_err(|e| format!("agents[{index}] (`{}`): `trackedMints` contains an invalid mint `{raw_mint}`: {e}", entry.id))?;
        tracked_mints.push(mint);
    }

    Ok(AgentConfig {
        id: entry.id,
        keystore_path: entry.keystore_path,
        strategy: entry.strategy,
        strategy_params: entry.strategy_params,
        interval_ms: entry.interval_ms,
        limits,
        tracked_mints,
    })
}

fn resolve_limits(index: usize, id: &str, raw: &RawLimits) -> Result<SpendingLimits, String> {
    let max_per_tx_lamports = resolve_lamport_field(index, id, "maxPerTxSol/maxPerTxLamports", raw.max_per_tx_sol, &raw.max_per_tx_lamports)?;
    let max_session_lamports =
        resolve_lamport_field(index, id, "maxSessionSol/maxSessionLamports", raw.max_session_sol, &raw.max_session_lamports)?;

    SpendingLimits::new(max_per_tx_lamports, max_session_lamports, raw.destination_allowlist.clone())
        .map_err(|e| format!("agents[{index}] (`{id}`): {e}"))
}

fn resolve_lamport_field(
    index: usize,
    id: &str,
    field_name: &str,
    sol_value: Option<f64>,
    lamport_value: &Option<serde_json::Value>,
) -> Result<u64, String> {
    if let Some(sol) = sol_value {
        return Ok(sol_to_lamports(sol));
    }
    match lamport_value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| format!("agents[{index}] (`{id}`): `{field_name}` must be a non-negative integer")),
        Some(serde_json::Value::String(s)) => s
            .parse::<u64>()
            .map_err(|_| format!("agents[{index}] (`{id}`): `{field_name}` string is not an integer")),
        Some(_) => Err(format!("agents[{index}] (`{id}`): `{field_name}` has an unsupported type")),
        None => Err(format!("agents[{index}] (`{id}`): one of {field_name} must be set")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sol_float_limits() {
        let json = r#"[{
            "id": "agent-a",
            "keystorePath": "a.json",
            "strategy": "monitor",
            "strategyParams": {},
            "intervalMs": 1000,
            "limits": {"maxPerTxSol": 0.1, "maxSessionSol": 0.5}
        }]"#;
        let configs = parse_agents_config(json).unwrap();
        assert_eq!(configs[0].limits.max_per_tx_lamports, 100_000_000);
        assert_eq!(configs[0].limits.max_session_lamports, 500_000_000);
    }

    #[test]
    fn parses_lamport_integer_limits() {
        let json = r#"[{
            "id": "agent-a",
            "keystorePath": "a.json",
            "strategy": "monitor",
            "intervalMs": 1000,
            "limits": {"maxPerTxLamports": "100000000", "maxSessionLamports": 500000000}
        }]"#;
        let configs = parse_agents_config(json).unwrap();
        assert_eq!(configs[0].limits.max_per_tx_lamports, 100_000_000);
        assert_eq!(configs[0].limits.max_session_lamports, 500_000_000);
    }

    #[test]
    fn rejects_unknown_strategy() {
        let json = r#"[{
            "id": "agent-a",
            "keystorePath": "a.json",
            "strategy": "yolo",
            "intervalMs": 1000,
            "limits": {"maxPerTxSol": 0.1, "maxSessionSol": 0.5}
        }]"#;
        let err = parse_agents_config(json).unwrap_err();
        assert!(err.contains("strategy"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": "a", "keystorePath": "a.json", "strategy": "monitor", "intervalMs": 1000, "limits": {"maxPerTxSol": 0.1, "maxSessionSol": 0.5}},
            {"id": "a", "keystorePath": "b.json", "strategy": "monitor", "intervalMs": 1000, "limits": {"maxPerTxSol": 0.1, "maxSessionSol": 0.5}}
        ]"#;
        let err = parse_agents_config(json).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn rejects_zero_interval() {
        let json = r#"[{
            "id": "agent-a",
            "keystorePath": "a.json",
            "strategy": "monitor",
            "intervalMs": 0,
            "limits": {"maxPerTxSol": 0.1, "maxSessionSol": 0.5}
        }]"#;
        let err = parse_agents_config(json).unwrap_err();
        assert!(err.contains("intervalMs"));
    }
}

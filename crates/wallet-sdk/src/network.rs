use serde::Deserialize;

/// Network variants this runtime is allowed to talk to. There is
/// deliberately no `Mainnet` variant — mainnet operation is blocked by
/// construction, not by a runtime check on a value that could otherwise be
/// selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Devnet,
    Testnet,
}

impl Network {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(format!("invalid network: {s}")),
        }
    }
}

/// Returns true when `rpc_url`'s host looks like a mainnet endpoint.
///
/// Matches on the `mainnet-beta` substring per the environment contract;
/// this is the sole gate standing between this runtime and a real wallet.
pub fn is_mainnet_url(rpc_url: &str) -> bool {
    rpc_url.to_lowercase().contains("mainnet-beta")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mainnet_beta_hosts() {
        assert!(is_mainnet_url("https://api.mainnet-beta.solana.com"));
        assert!(is_mainnet_url("https://SOME.MAINNET-BETA.example.com"));
    }

    #[test]
    fn accepts_devnet_and_testnet_hosts() {
        assert!(!is_mainnet_url("https://api.devnet.solana.com"));
        assert!(!is_mainnet_url("https://api.testnet.solana.com"));
    }

    #[test]
    fn network_from_str_round_trips() {
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("mainnet".parse::<Network>().is_err());
    }
}

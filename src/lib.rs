pub mod agent_loop;
pub mod config;
pub mod env;
pub mod logging;
pub mod manager;

pub use agent_loop::{AgentLoop, AgentLoopState, LoopStatus};
pub use config::{AgentConfig, parse_agents_config};
pub use env::{AppMode, EnvConfig, sol_to_lamports};
pub use manager::MultiAgentManager;

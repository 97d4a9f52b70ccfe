use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// parley chat server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "parley-server", version, about = "Minimal real-time chat server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PARLEY_PORT", default_value = "3000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "PARLEY_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./parley.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "PARLEY_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Seconds a polling session may stay idle before the server closes it
    #[arg(long, env = "PARLEY_POLL_SESSION_TIMEOUT_SECS", default_value = "60")]
    pub poll_session_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            config: "./parley.toml".to_string(),
            json_logs: false,
            generate_config: false,
            poll_session_timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (PARLEY_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("PARLEY_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# parley chat server configuration
# Place this file at ./parley.toml or specify with --config <path>
# All settings can be overridden via environment variables (PARLEY_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3000)
# port = 3000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Seconds a polling session may stay idle before the server closes it
# and announces the leave (default: 60)
# poll_session_timeout_secs = 60
"#
    .to_string()
}

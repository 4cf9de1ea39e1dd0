use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Frames queued per peer before further forwards to it are dropped.
    pub outbound_buffer: usize,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

impl RelayConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    environment: &str,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    builder
        .set_default("environment", environment)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("relay.outbound_buffer", 64)?
        .set_default("relay.heartbeat_interval_secs", 30)?
        .set_default("relay.client_timeout_secs", 60)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = with_defaults(Config::builder(), "development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        Self::from_config(s)
    }

    /// Deserializes a built configuration and rejects values the relay cannot run with.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        if settings.relay.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Message(
                "relay.heartbeat_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Applies the positional `[host] [port]` process arguments on top of the
    /// layered configuration. Missing arguments leave the loaded values alone.
    pub fn with_args<I>(mut self, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(host) = args.next() {
            self.server.host = host;
        }
        if let Some(port) = args.next() {
            self.server.port = port.parse().map_err(|e| {
                ConfigError::Message(format!("invalid port argument {:?}: {}", port, e))
            })?;
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults(Config::builder(), "test")?
            .set_override("server.host", "127.0.0.1")?
            .set_override("server.port", 0)?
            .set_override("server.workers", 1)?
            .build()
            .and_then(Self::from_config)
    }
}

use crate::prelude::*;

use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub listening_port: u16,

    #[serde(default = "Config::default_forward_mode")]
    pub forward_mode: bool,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// GatewayConfig {{{
/// The only knobs the gateway exposes to whatever embeds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    pub listening_port: u16,
    pub forward_mode: bool,
}

impl GatewayConfig {
    pub fn new(listening_port: u16, forward_mode: bool) -> Self {
        Self {
            listening_port,
            forward_mode,
        }
    }

    pub fn listening_port(&self) -> u16 {
        self.listening_port
    }

    pub fn forward_mode(&self) -> bool {
        self.forward_mode
    }
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn config(&self) -> Config {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn gateway(&self) -> GatewayConfig {
        self.config().gateway()
    }

    pub fn listening_port(&self) -> u16 {
        self.config().listening_port
    }

    pub fn forward_mode(&self) -> bool {
        self.config().forward_mode
    }

    pub fn loglevel(&self) -> String {
        self.config().loglevel
    }

    pub fn log_summary(&self) {
        self.config().log_summary()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
            .map_err(|err| anyhow!("config.rs:error parsing {}: {}", file, err))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig::new(self.listening_port, self.forward_mode)
    }

    // logging is not up yet while the file is read, so the summary is
    // printed separately once it is
    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Listening Port: {}", self.listening_port);
        info!(
            "  Forward Mode: {}",
            if self.forward_mode { "enabled" } else { "disabled" }
        );
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.listening_port == 0 {
            bail!("listening_port must be between 1 and 65535");
        }

        if self.loglevel.trim().is_empty() {
            return Err(anyhow!("config.rs:loglevel cannot be empty"));
        }

        Ok(())
    }

    fn default_forward_mode() -> bool {
        false
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

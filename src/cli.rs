//! Command-line interface.
//!
//! Flags override values from the optional TOML file; the merged result is
//! validated once.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{loader, ConfigError, ProxyConfig};

#[derive(Debug, Parser)]
#[command(name = "petstore-proxy")]
#[command(about = "Forward every request to a fixed upstream with an injected API key", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port (keeps the configured bind host).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Upstream base URL, e.g. https://petstore.swagger.io/v2
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Value of the injected credential header.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags.
    pub fn load(&self) -> Result<ProxyConfig, ConfigError> {
        loader::load_config(self.config.as_deref(), |config| self.apply(config))
    }

    /// Apply the flags that were given.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            // An unparsable bind address is left for validation to report.
            if let Ok(mut addr) = config.listener.bind_address.parse::<SocketAddr>() {
                addr.set_port(port);
                config.listener.bind_address = addr.to_string();
            }
        }
        if let Some(upstream) = &self.upstream {
            config.upstream.base_url = upstream.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.credential.value = api_key.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener
//! - Announce listen address, upstream target and credential
//!
//! # Design Decisions
//! - Fail fast: a failed bind is fatal
//! - The announcement happens only after a successful bind

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;

/// Bind the configured listen address and announce the proxy.
pub async fn bind(config: &ProxyConfig) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    for line in banner(local_addr, config) {
        tracing::info!("{}", line);
    }
    Ok(listener)
}

/// Human-readable startup lines.
pub fn banner(local_addr: SocketAddr, config: &ProxyConfig) -> Vec<String> {
    vec![
        format!("Petstore API Proxy running on http://{}", local_addr),
        format!("Proxying to: {}", config.upstream.base_url),
        format!(
            "Injecting {}: {}",
            config.credential.header, config.credential.value
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_address_target_and_credential() {
        let config = ProxyConfig::default();
        let lines = banner("127.0.0.1:3000".parse().unwrap(), &config);
        assert_eq!(
            lines,
            vec![
                "Petstore API Proxy running on http://127.0.0.1:3000",
                "Proxying to: https://petstore.swagger.io/v2",
                "Injecting api_key: special-key",
            ]
        );
    }

    #[tokio::test]
    async fn bind_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = ProxyConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        assert!(bind(&config).await.is_err());
    }
}

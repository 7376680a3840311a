//! Service mode
//!
//! Runs the poll loop and, unless disabled, the local status server until
//! Ctrl-C.

use crate::{
    cli::{init_logging, load_settings},
    config::CliOverrides,
    server::app,
    session::RefreshCoordinator,
    utils::version,
};
use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for `pdsync run`
#[derive(Debug, Default)]
pub struct RunArgs {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub config: Option<String>,
    pub verbose: bool,
}

/// Run the service with the given arguments
pub async fn run_service(args: RunArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides {
        config: args.config.map(PathBuf::from),
        host: args.host,
        port: args.port,
    });

    init_logging(&settings, args.verbose);

    tracing::info!(
        "Starting parent dashboard sync v{}",
        version::get_version()
    );

    let coordinator = Arc::new(
        RefreshCoordinator::from_settings(&settings)
            .context("Failed to set up the refresh coordinator")?,
    );
    coordinator.start();

    let served = if settings.server.enabled {
        let app = app::create_app(Arc::clone(&coordinator));
        let addr = resolve_bind_address(&settings.server.host, settings.server.port).await?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        tracing::info!("Status server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Status server failed")
    } else {
        tracing::info!("Status server disabled, running poll loop only");
        shutdown_signal().await;
        Ok(())
    };

    coordinator.shutdown().await;
    tracing::info!("Shutdown complete");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// Turn the configured host into a socket address
///
/// Accepts literal IP addresses. `::` falls back to `0.0.0.0` when the
/// host has no IPv6 stack.
pub async fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    if host == "::" {
        let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
        return match tokio::net::TcpListener::bind(addr).await {
            Ok(_) => Ok(addr),
            Err(e) => {
                tracing::warn!(
                    "Could not listen on [::]:{} ({}), falling back to 0.0.0.0",
                    port,
                    e
                );
                Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            }
        };
    }

    match host.parse::<IpAddr>() {
        Ok(ip) => Ok(SocketAddr::new(ip, port)),
        Err(_) => anyhow::bail!(
            "Invalid host address: {}. Use an IP address such as 127.0.0.1, 0.0.0.0 or ::",
            host
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("127.0.0.1", IpAddr::V4(Ipv4Addr::LOCALHOST))]
    #[case("0.0.0.0", IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    #[case("::1", IpAddr::V6(Ipv6Addr::LOCALHOST))]
    #[tokio::test]
    async fn test_resolve_literal_addresses(#[case] host: &str, #[case] expected: IpAddr) {
        let addr = resolve_bind_address(host, 0).await.unwrap();
        assert_eq!(addr.ip(), expected);
    }

    #[tokio::test]
    async fn test_resolve_ipv6_any_or_fallback() {
        let addr = resolve_bind_address("::", 0).await.unwrap();
        assert!(addr.ip().is_unspecified());
    }

    #[rstest]
    #[case("localhost")]
    #[case("")]
    #[case("not a host")]
    #[tokio::test]
    async fn test_resolve_rejects_names(#[case] host: &str) {
        let err = resolve_bind_address(host, 8787).await.unwrap_err();
        assert!(err.to_string().contains("Invalid host address"));
    }
}

//! TCP listener acquisition.
//!
//! # Responsibilities
//! - Bind to a configured `host:port`
//! - Acquire an ephemeral loopback listener for tests, retrying on
//!   transient failures

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

/// Loopback address with an OS-assigned port.
pub const EPHEMERAL_ADDRESS: &str = "127.0.0.1:0";

/// Name used in a [`BindError`] for a listener that was handed over already
/// bound.
pub const SUPPLIED_LISTENER: &str = "<supplied listener>";

/// Attempts made by [`bind_ephemeral`] before giving up.
pub const EPHEMERAL_BIND_ATTEMPTS: u32 = 5;

/// Failed to bind a listener.
#[derive(Debug, Error)]
#[error("failed to bind {address}: {source}")]
pub struct BindError {
    /// Address that was requested.
    pub address: String,
    #[source]
    pub source: std::io::Error,
}

/// Bind a TCP listener on `address`.
///
/// `address` may be a socket address or a `host:port` pair that resolves.
pub async fn bind(address: &str) -> Result<TcpListener, BindError> {
    let listener = TcpListener::bind(address).await.map_err(|source| BindError {
        address: address.to_string(),
        source,
    })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }

    Ok(listener)
}

/// Read the bound address of a listener.
///
/// A listener whose address cannot be read is not usable, so the failure is
/// reported like a failed bind.
pub fn local_addr(listener: &TcpListener) -> Result<SocketAddr, BindError> {
    listener.local_addr().map_err(|source| BindError {
        address: SUPPLIED_LISTENER.to_string(),
        source,
    })
}

/// Bind a loopback listener on a random port.
///
/// Retries a few times so parallel tests do not flake on port collisions.
pub async fn bind_ephemeral() -> Result<TcpListener, BindError> {
    let mut attempt = 1;
    loop {
        match bind(EPHEMERAL_ADDRESS).await {
            Ok(listener) => return Ok(listener),
            Err(err) if attempt < EPHEMERAL_BIND_ATTEMPTS => {
                tracing::debug!(attempt, error = %err, "Ephemeral bind failed, retrying");
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_listener_gets_a_port() {
        let listener = bind_ephemeral().await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_reports_address_in_use() {
        let taken = bind_ephemeral().await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = bind(&addr).await.unwrap_err();
        assert_eq!(err.address, addr);
        assert_eq!(err.source.kind(), std::io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn local_addr_of_bound_listener() {
        let listener = bind_ephemeral().await.unwrap();
        assert_eq!(local_addr(&listener).unwrap(), listener.local_addr().unwrap());
    }

    #[tokio::test]
    async fn bind_rejects_garbage_address() {
        let err = bind("not an address").await.unwrap_err();
        assert_eq!(err.address, "not an address");
    }
}

//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured interface and port
//! - Map failures to the gateway's listener-bind error code

use tokio::net::TcpListener;

use crate::config::HttpConfig;
use crate::error::GatewayError;

/// Bind the listening socket described by `config`. Port 0 picks a free port.
pub async fn bind(config: &HttpConfig) -> Result<TcpListener, GatewayError> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| GatewayError::ListenerBind { addr: addr.clone(), source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| GatewayError::ListenerBind { addr: addr.clone(), source })?;

    tracing::info!(
        address = %local_addr,
        access_token = config.requires_token(),
        read_anon = config.read_anon,
        max_body_size = config.max_body_size,
        "Listener bound"
    );

    Ok(listener)
}

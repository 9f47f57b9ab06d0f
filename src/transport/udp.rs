//! # UDP Socket Loop
//!
//! Binds the endpoint socket and pumps datagrams through the core, one at
//! a time. Server-browser queries (datagrams starting with ASCII `SAMP`)
//! bypass the de-obfuscation step and the core entirely.

use crate::config::EndpointConfig;
use crate::endpoint::ServerCore;
use crate::error::Result;
use crate::transport::{Deobfuscate, Passthrough};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Largest datagram the endpoint will accept.
const MAX_DATAGRAM: usize = 2048;

/// Run the endpoint until ctrl-c, with the identity de-obfuscation.
pub async fn serve(config: EndpointConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    serve_with_shutdown(config, Passthrough, shutdown_rx).await
}

/// Run the endpoint with an external shutdown channel and de-obfuscation
/// transform.
pub async fn serve_with_shutdown<D: Deobfuscate>(
    config: EndpointConfig,
    deobfuscator: D,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    config.validate_strict()?;

    let bind: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .map_err(|e| {
            crate::error::ProtocolError::ConfigError(format!("invalid bind address: {e}"))
        })?;
    let port = config.server.port;

    let socket = UdpSocket::bind(bind).await?;
    info!(%bind, max_players = config.server.max_players, "endpoint listening");

    let mut core = ServerCore::new(config);
    let metrics = core.metrics();
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("endpoint shutting down");
                metrics.summarize();
                return Ok(());
            }

            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(%error, "recv_from failed");
                        continue;
                    }
                };
                let datagram = &buf[..len];

                // Browser queries never reach the core.
                if datagram.starts_with(b"SAMP") {
                    metrics.browser_query();
                    trace!(addr = %from, len, "browser query ignored");
                    continue;
                }

                let decoded = deobfuscator.transform(datagram, port, 0);
                let replies = core.handle_datagram(&decoded, from);

                for outbound in replies {
                    match socket.send_to(&outbound.data, outbound.to).await {
                        Ok(sent) => {
                            metrics.datagram_sent(sent);
                            debug!(addr = %outbound.to, len = sent, "datagram sent");
                        }
                        // Fire-and-forget: state already applied stays.
                        Err(error) => warn!(addr = %outbound.to, %error, "datagram send failed"),
                    }
                }
            }
        }
    }
}

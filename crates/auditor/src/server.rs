// Snapshot Server
//
// Answers every TCP connection with one JSON array of active musicians, then
// closes it. Each connection is served in its own task.

use crate::net::{is_resource_exhausted, is_transient};
use crate::registry::PresenceRegistry;
use orchestra_core::config::AuditorConfig;
use orchestra_core::error::InfraError;
use orchestra_core::protocol::encode_snapshot;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Pause after a transient accept error, so a persistent one does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Snapshot server
///
/// Every accepted connection receives one JSON array of active musicians and
/// is then closed.
pub struct SnapshotServer {
    listener: TcpListener,
    registry: Arc<PresenceRegistry>,
    write_timeout: Duration,
}

impl SnapshotServer {
    pub async fn bind(
        config: &AuditorConfig,
        registry: Arc<PresenceRegistry>,
    ) -> Result<Self, InfraError> {
        let addr = config.tcp_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| InfraError::bind(addr.clone(), e))?;
        tracing::info!("Snapshot server listening on {}", addr);

        Ok(Self {
            listener,
            registry,
            write_timeout: config.write_timeout(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<(), InfraError> {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Snapshot server stopped");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    let registry = self.registry.clone();
                    let write_timeout = self.write_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, write_timeout).await {
                            tracing::warn!("Connection {} abandoned: {}", addr, e);
                        }
                    });
                }
                Err(e) if is_transient(&e) || is_resource_exhausted(&e) => {
                    tracing::warn!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                Err(e) => {
                    tracing::error!("TCP listener failed: {}", e);
                    return Err(InfraError::socket_unusable("tcp", e));
                }
            }
        }
    }
}

// Send one snapshot and close the connection
async fn handle_connection(
    mut stream: TcpStream,
    registry: Arc<PresenceRegistry>,
    write_timeout: Duration,
) -> io::Result<()> {
    let statuses = registry.snapshot(Instant::now()).await;
    let payload = encode_snapshot(&statuses)?;

    let write = async {
        stream.write_all(&payload).await?;
        stream.shutdown().await
    };

    match tokio::time::timeout(write_timeout, write).await {
        Ok(result) => {
            result?;
            tracing::debug!("Sent {} musician(s)", statuses.len());
            Ok(())
        }
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("write timed out after {:?}", write_timeout),
        )),
    }
}

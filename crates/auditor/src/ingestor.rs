// Presence Ingestor
//
// Receives musician datagrams from the multicast group and turns each valid
// one into a registry upsert. Bad datagrams are dropped; the loop only stops
// on cancellation or when the socket itself fails.

use crate::net::{bind_reusable_udp, is_transient};
use crate::registry::PresenceRegistry;
use async_trait::async_trait;
use orchestra_core::config::{AuditorConfig, MAX_UDP_PAYLOAD};
use orchestra_core::error::InfraError;
use orchestra_core::protocol::{decode_datagram, DecodeError};
use orchestra_core::vocabulary::Vocabulary;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Anything the ingestor can receive datagrams from
#[async_trait]
pub trait DatagramSource: Send {
    /// Receive one datagram into `buf`
    async fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl DatagramSource for UdpSocket {
    async fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

/// Multicast receive loop feeding the presence registry
pub struct PresenceIngestor<S = UdpSocket> {
    source: S,
    registry: Arc<PresenceRegistry>,
    vocabulary: Vocabulary,
    max_datagram_size: usize,
}

impl PresenceIngestor<UdpSocket> {
    /// Bind the UDP port and join the configured multicast group
    pub async fn bind(
        config: &AuditorConfig,
        registry: Arc<PresenceRegistry>,
        vocabulary: Vocabulary,
    ) -> Result<Self, InfraError> {
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.udp_port);
        let socket = bind_reusable_udp(addr).map_err(|e| InfraError::bind(addr.to_string(), e))?;

        socket
            .join_multicast_v4(config.multicast_group, config.interface)
            .map_err(|e| {
                InfraError::join_multicast(
                    format!("{} on {}", config.multicast_group, config.interface),
                    e,
                )
            })?;

        tracing::info!(
            "Listening for musicians on {}:{}",
            config.multicast_group,
            config.udp_port
        );

        Ok(Self::new(socket, registry, vocabulary).with_max_datagram_size(config.max_datagram_size))
    }
}

impl<S: DatagramSource> PresenceIngestor<S> {
    pub fn new(source: S, registry: Arc<PresenceRegistry>, vocabulary: Vocabulary) -> Self {
        Self {
            source,
            registry,
            vocabulary,
            max_datagram_size: orchestra_core::protocol::MAX_DATAGRAM_SIZE,
        }
    }

    /// Datagrams above this size are dropped; capped at the largest UDP payload
    pub fn with_max_datagram_size(mut self, max_datagram_size: usize) -> Self {
        self.max_datagram_size = max_datagram_size.min(MAX_UDP_PAYLOAD);
        self
    }

    /// Decode one datagram and record it as heard at `now`
    pub async fn handle_datagram(&self, bytes: &[u8], now: Instant) -> Result<(), DecodeError> {
        let status = decode_datagram(bytes, self.max_datagram_size, &self.vocabulary)?;
        self.registry.upsert(&status.uuid, status.instrument, now).await;
        Ok(())
    }

    /// Run until `shutdown` is cancelled or the source fails for good
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), InfraError> {
        // One spare byte so oversized datagrams are detected instead of truncated
        let mut buf = vec![0u8; self.max_datagram_size.saturating_add(1)];

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Presence ingestor stopped");
                    return Ok(());
                }
                received = self.source.recv_datagram(&mut buf) => received,
            };

            match received {
                Ok((len, from)) => {
                    if let Err(e) = self.handle_datagram(&buf[..len], Instant::now()).await {
                        tracing::debug!("Dropped datagram from {}: {}", from, e);
                    }
                }
                Err(e) if is_transient(&e) => {
                    tracing::warn!("UDP receive error: {}", e);
                }
                Err(e) => {
                    tracing::error!("UDP socket failed: {}", e);
                    return Err(InfraError::socket_unusable("udp", e));
                }
            }
        }
    }
}

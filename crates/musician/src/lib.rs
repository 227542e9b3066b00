// Orchestra Musician
//
// A musician picks an instrument and multicasts the matching sound once per
// interval, identified by a uuid generated at startup.

use orchestra_core::config::{ConfigValidator, MusicianConfig};
use orchestra_core::error::{DomainError, InfraError, OrchestraError};
use orchestra_core::protocol::SoundDatagram;
use orchestra_core::vocabulary::{Instrument, Vocabulary};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Multicast sound emitter
#[derive(Debug, Clone)]
pub struct Musician {
    uuid: String,
    instrument: Instrument,
    payload: Vec<u8>,
    target: SocketAddr,
    interval: Duration,
    ttl: u32,
}

impl Musician {
    /// New musician with a random uuid
    pub fn new(instrument: Instrument, config: &MusicianConfig) -> Result<Self, OrchestraError> {
        Self::with_uuid(uuid::Uuid::new_v4().to_string(), instrument, config)
    }

    pub fn with_uuid(
        uuid: impl Into<String>,
        instrument: Instrument,
        config: &MusicianConfig,
    ) -> Result<Self, OrchestraError> {
        ConfigValidator::validate_musician(config)?;

        let uuid = uuid.into();
        let vocabulary = Vocabulary::default();
        let sound = vocabulary
            .sound_for(instrument)
            .ok_or_else(|| DomainError::UnknownInstrument {
                name: instrument.to_string(),
            })?;
        let payload = SoundDatagram::new(uuid.clone(), sound).to_bytes()?;

        Ok(Self {
            uuid,
            instrument,
            payload,
            target: SocketAddr::V4(SocketAddrV4::new(config.multicast_group, config.udp_port)),
            interval: config.interval(),
            ttl: config.ttl,
        })
    }

    /// Send to `target` instead of the configured multicast group
    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Encoded datagram sent on every tick
    pub fn datagram(&self) -> &[u8] {
        &self.payload
    }

    /// Play until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), InfraError> {
        let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| InfraError::bind(local.to_string(), e))?;
        socket.set_multicast_ttl_v4(self.ttl)?;

        tracing::info!(
            "Musician {} playing {} to {} every {:?}",
            self.uuid,
            self.instrument,
            self.target,
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Musician {} stopped", self.uuid);
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match socket.send_to(&self.payload, self.target).await {
                Ok(_) => tracing::debug!("Musician {} sent {} bytes", self.uuid, self.payload.len()),
                Err(e) => tracing::warn!("Musician {} failed to send: {}", self.uuid, e),
            }
        }
    }
}

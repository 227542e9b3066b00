// Orchestra Auditor
//
// Listens to musicians on a multicast group and tells any TCP client which of
// them are currently playing.

pub mod ingestor;
mod net;
pub mod registry;
pub mod server;

pub use ingestor::{DatagramSource, PresenceIngestor};
pub use registry::{MusicianEntry, PresenceRegistry, ACTIVITY_WINDOW};
pub use server::SnapshotServer;

use orchestra_core::config::{AuditorConfig, Config, ConfigValidator};
use orchestra_core::error::{InfraError, OrchestraError};
use orchestra_core::vocabulary::Vocabulary;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ingestor and snapshot server bound around one shared registry
pub struct Auditor {
    registry: Arc<PresenceRegistry>,
    ingestor: PresenceIngestor,
    server: SnapshotServer,
}

impl Auditor {
    /// Validate `config` and bind both sockets
    pub async fn bind(config: &AuditorConfig) -> Result<Self, OrchestraError> {
        ConfigValidator::validate(&Config {
            auditor: config.clone(),
            ..Config::default()
        })?;

        let registry = Arc::new(PresenceRegistry::new());
        let ingestor =
            PresenceIngestor::bind(config, registry.clone(), Vocabulary::default()).await?;
        let server = SnapshotServer::bind(config, registry.clone()).await?;

        Ok(Self::new(registry, ingestor, server))
    }

    /// Assemble an auditor from already bound parts sharing `registry`
    pub fn new(
        registry: Arc<PresenceRegistry>,
        ingestor: PresenceIngestor,
        server: SnapshotServer,
    ) -> Self {
        Self {
            registry,
            ingestor,
            server,
        }
    }

    pub fn registry(&self) -> Arc<PresenceRegistry> {
        self.registry.clone()
    }

    /// Address the snapshot server is listening on
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.server.local_addr()
    }

    /// Run both loops until `shutdown` is cancelled or one of them fails.
    ///
    /// `Ok(())` means a deliberate shutdown; a failing loop cancels the other
    /// one and its error is returned.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), OrchestraError> {
        let mut ingestor = tokio::spawn(self.ingestor.run(shutdown.clone()));
        let mut server = tokio::spawn(self.server.run(shutdown.clone()));

        let (first, other) = tokio::select! {
            result = &mut ingestor => (result, server),
            result = &mut server => (result, ingestor),
        };

        shutdown.cancel();
        let first = flatten(first);
        let other = flatten(other.await);
        first?;
        other?;
        Ok(())
    }
}

fn flatten(
    joined: Result<Result<(), InfraError>, tokio::task::JoinError>,
) -> Result<(), OrchestraError> {
    match joined {
        Ok(result) => result.map_err(OrchestraError::from),
        Err(e) => Err(OrchestraError::Other(format!("auditor task panicked: {}", e))),
    }
}

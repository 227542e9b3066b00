pub mod config;
pub mod error;
pub mod protocol;
pub mod vocabulary;

// Re-export commonly used types
pub use config::{AuditorConfig, Config, MusicianConfig};
pub use error::{DomainError, InfraError, OrchestraError};
pub use protocol::{DecodeError, MusicianStatus, SoundDatagram};
pub use vocabulary::{Instrument, Vocabulary};

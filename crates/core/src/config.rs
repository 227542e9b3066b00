//! Orchestra Configuration
//!
//! Configuration structures with serde defaults, so a partial YAML file (or
//! none at all) still yields a runnable auditor.

use crate::error::OrchestraError;
use crate::protocol::MAX_DATAGRAM_SIZE;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default multicast group musicians sing to
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 22, 5);
/// Default UDP port of the multicast group
pub const DEFAULT_UDP_PORT: u16 = 9904;
/// Default TCP host for the snapshot server
pub const DEFAULT_TCP_HOST: &str = "0.0.0.0";
/// Default TCP port for the snapshot server
pub const DEFAULT_TCP_PORT: u16 = 2205;
/// Default per-connection write timeout (milliseconds)
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2000;
/// Default delay between two sounds of a musician (milliseconds)
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
/// Default multicast TTL for musicians
pub const DEFAULT_MULTICAST_TTL: u32 = 1;
/// Largest payload an IPv4 UDP datagram can carry
pub const MAX_UDP_PAYLOAD: usize = 65_507;
/// IP TTL is a single byte
pub const MAX_MULTICAST_TTL: u32 = 255;

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Main Config
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Auditor configuration
    #[serde(default)]
    pub auditor: AuditorConfig,
    /// Musician configuration
    #[serde(default)]
    pub musician: MusicianConfig,
}

// ============================================================================
// Auditor Config
// ============================================================================

/// Auditor sockets and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditorConfig {
    /// Multicast group to join
    #[serde(default = "default_multicast_group")]
    pub multicast_group: Ipv4Addr,
    /// UDP port of the multicast group
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Local interface used to join the group (0.0.0.0 lets the OS choose)
    #[serde(default = "AuditorConfig::default_interface")]
    pub interface: Ipv4Addr,
    /// Snapshot server host
    #[serde(default = "AuditorConfig::default_tcp_host")]
    pub tcp_host: String,
    /// Snapshot server port
    #[serde(default = "AuditorConfig::default_tcp_port")]
    pub tcp_port: u16,
    /// Largest accepted datagram, in bytes
    #[serde(default = "AuditorConfig::default_max_datagram_size")]
    pub max_datagram_size: usize,
    /// Per-connection write timeout, in milliseconds
    #[serde(default = "AuditorConfig::default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_multicast_group() -> Ipv4Addr {
    DEFAULT_MULTICAST_GROUP
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

impl AuditorConfig {
    fn default_interface() -> Ipv4Addr {
        Ipv4Addr::UNSPECIFIED
    }
    fn default_tcp_host() -> String {
        DEFAULT_TCP_HOST.to_string()
    }
    fn default_tcp_port() -> u16 {
        DEFAULT_TCP_PORT
    }
    fn default_max_datagram_size() -> usize {
        MAX_DATAGRAM_SIZE
    }
    fn default_write_timeout_ms() -> u64 {
        DEFAULT_WRITE_TIMEOUT_MS
    }

    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            multicast_group: DEFAULT_MULTICAST_GROUP,
            udp_port: DEFAULT_UDP_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            tcp_host: DEFAULT_TCP_HOST.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// Musician Config
// ============================================================================

/// Musician emitter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicianConfig {
    /// Multicast group to sing to
    #[serde(default = "default_multicast_group")]
    pub multicast_group: Ipv4Addr,
    /// UDP port of the multicast group
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Delay between two sounds, in milliseconds
    #[serde(default = "MusicianConfig::default_interval_ms")]
    pub interval_ms: u64,
    /// Multicast TTL
    #[serde(default = "MusicianConfig::default_ttl")]
    pub ttl: u32,
}

impl MusicianConfig {
    fn default_interval_ms() -> u64 {
        DEFAULT_INTERVAL_MS
    }
    fn default_ttl() -> u32 {
        DEFAULT_MULTICAST_TTL
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MusicianConfig {
    fn default() -> Self {
        Self {
            multicast_group: DEFAULT_MULTICAST_GROUP,
            udp_port: DEFAULT_UDP_PORT,
            interval_ms: DEFAULT_INTERVAL_MS,
            ttl: DEFAULT_MULTICAST_TTL,
        }
    }
}

// ============================================================================
// Config Loading and Validation
// ============================================================================

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an explicit file, a default location, or defaults
    pub fn load(path: Option<&str>) -> Result<Config, OrchestraError> {
        let config_path = match path {
            Some(p) => {
                let p = PathBuf::from(p);
                if !p.exists() {
                    return Err(OrchestraError::config_not_found(p.display().to_string()));
                }
                p
            }
            None => match Self::find_default_path() {
                Some(p) => p,
                None => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Config::default());
                }
            },
        };

        let config = Self::load_from(&config_path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn load_from(path: &Path) -> Result<Config, OrchestraError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestraError::config_parse_error(format!("Failed to read: {}", e)))?;
        let config: Config = serde_yml::from_str(&content)
            .map_err(|e| OrchestraError::config_parse_error(format!("Failed to parse: {}", e)))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn find_default_path() -> Option<PathBuf> {
        let default_paths = [
            home_dir().join(".orchestra/config.yaml"),
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("orchestra.yaml"),
            PathBuf::from("./orchestra.yaml"),
        ];

        default_paths.into_iter().find(|p| p.exists())
    }
}

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration
    pub fn validate(config: &Config) -> Result<(), OrchestraError> {
        let auditor = &config.auditor;
        if !auditor.multicast_group.is_multicast() {
            return Err(OrchestraError::config_invalid(
                "auditor.multicast_group",
                format!("{} is not a multicast address", auditor.multicast_group),
            ));
        }
        if auditor.tcp_host.trim().is_empty() {
            return Err(OrchestraError::config_invalid(
                "auditor.tcp_host",
                "Host cannot be empty",
            ));
        }
        if auditor.max_datagram_size == 0 || auditor.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(OrchestraError::config_invalid(
                "auditor.max_datagram_size",
                format!("Must be between 1 and {}", MAX_UDP_PAYLOAD),
            ));
        }
        if auditor.write_timeout_ms == 0 {
            return Err(OrchestraError::config_invalid(
                "auditor.write_timeout_ms",
                "Must be greater than zero",
            ));
        }

        Self::validate_musician(&config.musician)
    }

    /// Checks a musician can actually play with these settings
    pub fn validate_musician(musician: &MusicianConfig) -> Result<(), OrchestraError> {
        if !musician.multicast_group.is_multicast() {
            return Err(OrchestraError::config_invalid(
                "musician.multicast_group",
                format!("{} is not a multicast address", musician.multicast_group),
            ));
        }
        if musician.interval_ms == 0 {
            return Err(OrchestraError::config_invalid(
                "musician.interval_ms",
                "Must be greater than zero",
            ));
        }
        if musician.ttl > MAX_MULTICAST_TTL {
            return Err(OrchestraError::config_invalid(
                "musician.ttl",
                format!("Must be at most {}", MAX_MULTICAST_TTL),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration (see [`ConfigLoader::load`])
    pub fn load(path: Option<&str>) -> Result<Self, OrchestraError> {
        ConfigLoader::load(path)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), OrchestraError> {
        let content = serde_yml::to_string(self).map_err(|e| {
            OrchestraError::config_parse_error(format!("Serialization failed: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        Config {
            auditor: AuditorConfig::default(),
            musician: MusicianConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auditor_defaults() {
        let config = AuditorConfig::default();
        assert_eq!(config.multicast_group, Ipv4Addr::new(239, 255, 22, 5));
        assert_eq!(config.udp_port, 9904);
        assert_eq!(config.tcp_port, 2205);
        assert_eq!(config.max_datagram_size, 1024);
        assert_eq!(config.tcp_addr(), "0.0.0.0:2205");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yml::from_str("auditor:\n  tcp_port: 3000\n").unwrap();
        assert_eq!(config.auditor.tcp_port, 3000);
        assert_eq!(config.auditor.udp_port, DEFAULT_UDP_PORT);
        assert_eq!(config.musician, MusicianConfig::default());
    }

    #[test]
    fn test_validator_rejects_unicast_group() {
        let mut config = Config::default();
        config.auditor.multicast_group = Ipv4Addr::new(10, 0, 0, 1);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("auditor.multicast_group"));
    }

    #[test]
    fn test_validator_rejects_zero_interval() {
        let mut config = Config::default();
        config.musician.interval_ms = 0;
        assert!(ConfigValidator::validate(&config).is_err());
        assert!(ConfigValidator::validate(&Config::sample()).is_ok());
    }

    #[test]
    fn test_validator_bounds_datagram_size() {
        let config: Config =
            serde_yml::from_str("auditor:\n  max_datagram_size: 18446744073709551615\n").unwrap();
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("auditor.max_datagram_size"));

        let mut config = Config::default();
        config.auditor.max_datagram_size = MAX_UDP_PAYLOAD + 1;
        assert!(ConfigValidator::validate(&config).is_err());
        config.auditor.max_datagram_size = MAX_UDP_PAYLOAD;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_validator_bounds_ttl() {
        let mut config = Config::default();
        config.musician.ttl = 256;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("musician.ttl"));
        config.musician.ttl = 255;
        assert!(ConfigValidator::validate(&config).is_ok());
    }
}

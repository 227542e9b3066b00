use clap::{Parser, Subcommand};
use orchestra_core::vocabulary::Instrument;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orchestra", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config_path: Option<String>,

    /// Development mode (verbose logging)
    #[arg(short, long, global = true)]
    pub dev: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track active musicians and serve them over TCP
    Auditor {
        /// Multicast group to join
        #[arg(long)]
        group: Option<Ipv4Addr>,

        /// UDP port of the multicast group
        #[arg(long)]
        udp_port: Option<u16>,

        /// Interface address used to join the group
        #[arg(long)]
        interface: Option<Ipv4Addr>,

        /// Snapshot server host
        #[arg(long)]
        host: Option<String>,

        /// Snapshot server port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Play an instrument on the multicast group
    Musician {
        /// piano, trumpet, flute, violin or drum
        instrument: Instrument,

        /// Delay between two sounds, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Generate sample configuration
    ConfigSample {
        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auditor_overrides() {
        let cli = Cli::parse_from([
            "orchestra",
            "auditor",
            "--group",
            "239.1.2.3",
            "-p",
            "3000",
        ]);
        match cli.command {
            Commands::Auditor { group, port, .. } => {
                assert_eq!(group, Some(Ipv4Addr::new(239, 1, 2, 3)));
                assert_eq!(port, Some(3000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_musician_instrument() {
        let cli = Cli::parse_from(["orchestra", "--dev", "musician", "trumpet"]);
        assert!(cli.dev);
        assert!(matches!(
            cli.command,
            Commands::Musician {
                instrument: Instrument::Trumpet,
                interval_ms: None
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_instrument() {
        assert!(Cli::try_parse_from(["orchestra", "musician", "kazoo"]).is_err());
    }
}

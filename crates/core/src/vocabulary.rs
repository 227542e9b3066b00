//! Sound/instrument vocabulary
//!
//! Musicians never send their instrument directly, only the sound it makes.
//! The auditor translates sounds back into instruments with the same table, so
//! both directions are part of the wire contract.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Instrument played by a musician
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Trumpet,
    Flute,
    Violin,
    Drum,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Piano,
        Instrument::Trumpet,
        Instrument::Flute,
        Instrument::Violin,
        Instrument::Drum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Trumpet => "trumpet",
            Instrument::Flute => "flute",
            Instrument::Violin => "violin",
            Instrument::Drum => "drum",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lowercase();
        Instrument::ALL
            .into_iter()
            .find(|instrument| instrument.as_str() == name)
            .ok_or_else(|| DomainError::UnknownInstrument {
                name: s.to_string(),
            })
    }
}

/// Default sound table
pub const DEFAULT_SOUNDS: [(&str, Instrument); 5] = [
    ("ti-ta-ti", Instrument::Piano),
    ("pouet", Instrument::Trumpet),
    ("trululu", Instrument::Flute),
    ("gzi-gzi", Instrument::Violin),
    ("boum-boum", Instrument::Drum),
];

/// Bidirectional sound <-> instrument lookup table
#[derive(Debug, Clone)]
pub struct Vocabulary {
    by_sound: HashMap<String, Instrument>,
    by_instrument: HashMap<Instrument, String>,
}

impl Vocabulary {
    /// Build a table from `(sound, instrument)` pairs.
    ///
    /// Later pairs override earlier ones in both directions.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Instrument)>,
        S: Into<String>,
    {
        let mut by_sound = HashMap::new();
        let mut by_instrument = HashMap::new();
        for (sound, instrument) in pairs {
            let sound = sound.into();
            by_instrument.insert(instrument, sound.clone());
            by_sound.insert(sound, instrument);
        }
        Self {
            by_sound,
            by_instrument,
        }
    }

    /// Translate a received sound into the instrument that makes it
    pub fn instrument_for(&self, sound: &str) -> Option<Instrument> {
        self.by_sound.get(sound).copied()
    }

    /// Sound emitted by an instrument
    pub fn sound_for(&self, instrument: Instrument) -> Option<&str> {
        self.by_instrument.get(&instrument).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_sound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sound.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_SOUNDS)
    }
}

// Orchestra Wire Protocol
//
// Two payloads cross the process boundary:
// 1. Musicians multicast a `SoundDatagram` (`{"uuid": ..., "sound": ...}`) over UDP
// 2. The auditor answers every TCP connection with a JSON array of `MusicianStatus`

use crate::vocabulary::{Instrument, Vocabulary};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Largest datagram payload the auditor accepts
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Datagram emitted by a musician
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundDatagram {
    /// Opaque sender identity
    pub uuid: String,

    /// Token from the closed sound vocabulary
    pub sound: String,
}

impl SoundDatagram {
    pub fn new(uuid: impl Into<String>, sound: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            sound: sound.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// One active musician as published by the auditor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicianStatus {
    pub uuid: String,
    pub instrument: Instrument,
}

/// Why a datagram was dropped
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("datagram too large: {len} bytes (max {max})")]
    Oversized { len: usize, max: usize },
    #[error("datagram is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("datagram is not a sound object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("datagram is not a JSON object")]
    NotAnObject,
    #[error("unknown sound '{sound}' from {uuid}")]
    UnknownSound { uuid: String, sound: String },
}

/// Decode one datagram and translate its sound into an instrument
pub fn decode_datagram(
    bytes: &[u8],
    max_size: usize,
    vocabulary: &Vocabulary,
) -> Result<MusicianStatus, DecodeError> {
    if bytes.len() > max_size {
        return Err(DecodeError::Oversized {
            len: bytes.len(),
            max: max_size,
        });
    }

    let text = std::str::from_utf8(bytes)?;
    let value: JsonValue = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let datagram: SoundDatagram = serde_json::from_value(value)?;

    match vocabulary.instrument_for(&datagram.sound) {
        Some(instrument) => Ok(MusicianStatus {
            uuid: datagram.uuid,
            instrument,
        }),
        None => Err(DecodeError::UnknownSound {
            uuid: datagram.uuid,
            sound: datagram.sound,
        }),
    }
}

/// Encode a snapshot for a TCP client
pub fn encode_snapshot(statuses: &[MusicianStatus]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(bytes: &[u8]) -> Result<MusicianStatus, DecodeError> {
        decode_datagram(bytes, MAX_DATAGRAM_SIZE, &Vocabulary::default())
    }

    #[test]
    fn test_decode_valid() {
        let status = decode(br#"{"uuid":"a1","sound":"pouet"}"#).unwrap();
        assert_eq!(status.uuid, "a1");
        assert_eq!(status.instrument, Instrument::Trumpet);
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let status = decode(br#"{"sound":"trululu","uuid":"f","volume":11}"#).unwrap();
        assert_eq!(status.instrument, Instrument::Flute);
    }

    #[test]
    fn test_decode_truncated_json() {
        assert!(matches!(
            decode(br#"{"uuid":"a1","sou"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_missing_or_mistyped_fields() {
        assert!(matches!(decode(br#"{"uuid":"a1"}"#), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode(br#"{"uuid":7,"sound":"pouet"}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            decode(br#"["a1","pouet"]"#),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert!(matches!(
            decode(&[0x7b, 0xff, 0xfe, 0x7d]),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn test_decode_oversized() {
        let padding = "x".repeat(MAX_DATAGRAM_SIZE);
        let payload = json!({"uuid": "a1", "sound": "pouet", "pad": padding}).to_string();
        assert!(matches!(
            decode(payload.as_bytes()),
            Err(DecodeError::Oversized { max: MAX_DATAGRAM_SIZE, .. })
        ));
    }

    #[test]
    fn test_decode_unknown_sound() {
        match decode(br#"{"uuid":"a1","sound":"meow"}"#) {
            Err(DecodeError::UnknownSound { uuid, sound }) => {
                assert_eq!(uuid, "a1");
                assert_eq!(sound, "meow");
            }
            other => panic!("expected unknown sound, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_snapshot() {
        assert_eq!(encode_snapshot(&[]).unwrap(), b"[]");

        let statuses = vec![MusicianStatus {
            uuid: "a1".to_string(),
            instrument: Instrument::Trumpet,
        }];
        let json = String::from_utf8(encode_snapshot(&statuses).unwrap()).unwrap();
        assert_eq!(json, r#"[{"uuid":"a1","instrument":"trumpet"}]"#);
    }

    #[test]
    fn test_datagram_serialization() {
        let bytes = SoundDatagram::new("a1", "boum-boum").to_bytes().unwrap();
        let json = String::from_utf8(bytes).unwrap();
        assert!(json.contains("\"uuid\":\"a1\""));
        assert!(json.contains("\"sound\":\"boum-boum\""));
    }
}

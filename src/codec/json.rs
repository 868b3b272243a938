//! JSON codec.

use crate::codec::Codec;
use crate::LicenseError;
use serde::{de::DeserializeOwned, Serialize};

/// Codec producing JSON license keys and repositories.
///
/// Declares `application/json` with an `8bit` transfer encoding, so the
/// derived content transfer charset is UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn content_transfer_encoding(&self) -> &str {
        "8bit"
    }

    fn encode<T: Serialize>(&self, artifact: &T) -> Result<Vec<u8>, LicenseError> {
        serde_json::to_vec(artifact).map_err(|e| LicenseError::Codec(format!("encode: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, LicenseError> {
        serde_json::from_slice(data).map_err(|e| LicenseError::Codec(format!("decode: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trip() {
        let codec = JsonCodec;
        let probe = Probe {
            name: "café".to_string(),
            count: 3,
        };
        let data = codec.encode(&probe).unwrap();
        let back: Probe = codec.decode(&data).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn decode_garbage_is_codec_error() {
        let codec = JsonCodec;
        let result: Result<Probe, _> = codec.decode(b"not json");
        assert!(matches!(result, Err(LicenseError::Codec(_))));
    }
}

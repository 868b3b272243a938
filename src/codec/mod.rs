//! Codec boundary: encodes/decodes artifacts to and from byte streams under a
//! declared content type and transfer encoding.

pub mod json;

use crate::LicenseError;
use serde::{de::DeserializeOwned, Serialize};

/// Encodes and decodes in-memory artifacts.
///
/// A codec declares a MIME-like content type and a MIME content transfer
/// encoding (`"7bit"`, `"8bit"`, `"quoted-printable"` or `"base64"`), from
/// which the content transfer charset is derived by [`charset`].
pub trait Codec: Clone + Send + Sync {
    /// MIME-like content type, e.g. `"application/json"`.
    fn content_type(&self) -> &str;

    /// MIME content transfer encoding, e.g. `"8bit"`.
    fn content_transfer_encoding(&self) -> &str;

    /// Encode an artifact into a byte buffer.
    fn encode<T: Serialize>(&self, artifact: &T) -> Result<Vec<u8>, LicenseError>;

    /// Decode an artifact from a byte buffer.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, LicenseError>;
}

/// The content transfer charset a text-producing codec uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferCharset {
    /// US-ASCII.
    Ascii,
    /// UTF-8.
    Utf8,
}

impl TransferCharset {
    /// Decode charset-encoded bytes into a body string.
    ///
    /// Returns `None` if the bytes are not valid in this charset; the caller
    /// falls back to base64 then.
    pub fn decode(&self, data: &[u8]) -> Option<String> {
        match self {
            TransferCharset::Ascii => {
                if data.is_ascii() {
                    // ASCII is a UTF-8 subset.
                    String::from_utf8(data.to_vec()).ok()
                } else {
                    None
                }
            }
            TransferCharset::Utf8 => String::from_utf8(data.to_vec()).ok(),
        }
    }

    /// Re-encode a body string into raw bytes.
    pub fn encode(&self, body: &str) -> Vec<u8> {
        body.as_bytes().to_vec()
    }
}

/// Figure the content transfer charset used by the given codec.
///
/// - `"7bit"`, `"quoted-printable"` and `"base64"` (ignoring case) always
///   produce US-ASCII.
/// - `"8bit"` produces the charset named by the content type's `charset=`
///   parameter if present, else UTF-8 (for JSON compatibility). Only
///   `utf-8` and `us-ascii` are loadable; anything else is a configuration
///   error.
/// - Any other transfer encoding means the codec doesn't produce text and
///   `Ok(None)` is returned.
pub fn charset<C: Codec>(codec: &C) -> Result<Option<TransferCharset>, LicenseError> {
    let encoding = codec.content_transfer_encoding();
    if encoding.eq_ignore_ascii_case("7bit")
        || encoding.eq_ignore_ascii_case("quoted-printable")
        || encoding.eq_ignore_ascii_case("base64")
    {
        return Ok(Some(TransferCharset::Ascii));
    }
    if encoding.eq_ignore_ascii_case("8bit") {
        return match charset_parameter(codec.content_type()) {
            Some(name) => {
                if name.eq_ignore_ascii_case("utf-8") {
                    Ok(Some(TransferCharset::Utf8))
                } else if name.eq_ignore_ascii_case("us-ascii") {
                    Ok(Some(TransferCharset::Ascii))
                } else {
                    Err(LicenseError::Config(format!(
                        "unsupported charset {:?} in content type",
                        name
                    )))
                }
            }
            None => Ok(Some(TransferCharset::Utf8)),
        };
    }
    Ok(None)
}

/// Extract the value of a `charset=` parameter from a content type, if any.
/// Accepts both quoted and unquoted parameter values.
fn charset_parameter(content_type: &str) -> Option<String> {
    for part in content_type.split(';').skip(1) {
        let part = part.trim();
        let Some(eq) = part.find('=') else { continue };
        let (key, value) = part.split_at(eq);
        if !key.trim().eq_ignore_ascii_case("charset") {
            continue;
        }
        let value = value[1..].trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        return Some(value.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::json::JsonCodec;
    use super::*;

    #[derive(Clone)]
    struct FakeCodec {
        content_type: &'static str,
        cte: &'static str,
    }

    impl Codec for FakeCodec {
        fn content_type(&self) -> &str {
            self.content_type
        }

        fn content_transfer_encoding(&self) -> &str {
            self.cte
        }

        fn encode<T: Serialize>(&self, _: &T) -> Result<Vec<u8>, LicenseError> {
            unimplemented!()
        }

        fn decode<T: DeserializeOwned>(&self, _: &[u8]) -> Result<T, LicenseError> {
            unimplemented!()
        }
    }

    #[test]
    fn seven_bit_is_ascii() {
        for cte in ["7bit", "quoted-printable", "base64", "BASE64"] {
            let codec = FakeCodec {
                content_type: "application/xml",
                cte,
            };
            assert_eq!(charset(&codec).unwrap(), Some(TransferCharset::Ascii));
        }
    }

    #[test]
    fn eight_bit_defaults_to_utf8() {
        let codec = FakeCodec {
            content_type: "application/json",
            cte: "8bit",
        };
        assert_eq!(charset(&codec).unwrap(), Some(TransferCharset::Utf8));
    }

    #[test]
    fn eight_bit_honors_charset_parameter() {
        let codec = FakeCodec {
            content_type: "text/plain; charset=\"us-ascii\"",
            cte: "8bit",
        };
        assert_eq!(charset(&codec).unwrap(), Some(TransferCharset::Ascii));

        let codec = FakeCodec {
            content_type: "text/plain; charset=UTF-8",
            cte: "8bit",
        };
        assert_eq!(charset(&codec).unwrap(), Some(TransferCharset::Utf8));
    }

    #[test]
    fn eight_bit_unknown_charset_is_config_error() {
        let codec = FakeCodec {
            content_type: "text/plain; charset=koi8-r",
            cte: "8bit",
        };
        assert!(matches!(charset(&codec), Err(LicenseError::Config(_))));
    }

    #[test]
    fn binary_encoding_produces_no_text() {
        let codec = FakeCodec {
            content_type: "application/octet-stream",
            cte: "binary",
        };
        assert_eq!(charset(&codec).unwrap(), None);
    }

    #[test]
    fn json_codec_is_utf8() {
        assert_eq!(charset(&JsonCodec).unwrap(), Some(TransferCharset::Utf8));
    }

    #[test]
    fn ascii_charset_rejects_non_ascii() {
        assert_eq!(TransferCharset::Ascii.decode("héllo".as_bytes()), None);
        assert_eq!(
            TransferCharset::Ascii.decode(b"hello"),
            Some("hello".to_string())
        );
    }

    #[test]
    fn utf8_charset_rejects_invalid_sequences() {
        assert_eq!(TransferCharset::Utf8.decode(&[0xff, 0xfe]), None);
        assert_eq!(
            TransferCharset::Utf8.decode("héllo".as_bytes()),
            Some("héllo".to_string())
        );
    }
}

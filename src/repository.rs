//! Authenticated repository: the persisted envelope holding a signed artifact
//! and the controller owning sign/verify over it.

use crate::codec::{charset, Codec};
use crate::crypto::engine::{SigningEngine, VerifyingEngine};
use crate::LicenseError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Persisted envelope with exactly three fields.
///
/// The triple is either all-absent (fresh model) or all-present (signed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "repository")]
pub struct RepositoryModel {
    /// Text-encoded signed payload bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,

    /// Text-encoded signature bytes (base64).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Signature algorithm name, compared case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

impl RepositoryModel {
    /// Create a fresh, unsigned model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all three fields are present.
    pub fn is_signed(&self) -> bool {
        self.artifact.is_some() && self.signature.is_some() && self.algorithm.is_some()
    }
}

/// Reproduces an artifact from the raw bytes of a verified or just-signed
/// repository body.
#[derive(Debug, Clone)]
pub struct Decoder<C: Codec> {
    codec: C,
    data: Vec<u8>,
}

impl<C: Codec> Decoder<C> {
    pub(crate) fn new(codec: C, data: Vec<u8>) -> Self {
        Self { codec, data }
    }

    /// Decode the artifact.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, LicenseError> {
        self.codec.decode(&self.data)
    }
}

/// Owns the sign and verify operations against one repository model.
///
/// Stateless scaffolding around a mutable model; not safe for concurrent
/// sign and verify on the same model without external synchronization.
pub struct RepositoryController<'a, C: Codec> {
    codec: &'a C,
    model: &'a mut RepositoryModel,
}

impl<'a, C: Codec> RepositoryController<'a, C> {
    /// Bind a codec to a model.
    pub fn new(codec: &'a C, model: &'a mut RepositoryModel) -> Self {
        Self { codec, model }
    }

    /// Encode and sign the artifact into the model.
    ///
    /// The returned decoder reproduces the artifact from the buffer that was
    /// just encoded, not from re-reading the model, so the signer immediately
    /// gets back exactly what it signed regardless of any lossiness in the
    /// text encoding of the body.
    pub fn sign<T: Serialize>(
        &mut self,
        engine: &dyn SigningEngine,
        artifact: &T,
    ) -> Result<Decoder<C>, LicenseError> {
        let data = self.codec.encode(artifact)?;
        let signature = engine.sign(&data)?;

        self.model.artifact = Some(encode_body(self.codec, &data)?);
        self.model.signature = Some(STANDARD.encode(&signature));
        self.model.algorithm = Some(engine.algorithm().to_string());

        Ok(Decoder::new(self.codec.clone(), data))
    }

    /// Verify the model's integrity and return a decoder over the raw
    /// artifact bytes.
    ///
    /// The engine's algorithm must match the stored algorithm before any
    /// cryptography is attempted.
    pub fn verify(&self, engine: &dyn VerifyingEngine) -> Result<Decoder<C>, LicenseError> {
        let (body, signature_text, stored_algorithm) = self.signed_fields()?;
        if !engine.algorithm().eq_ignore_ascii_case(stored_algorithm) {
            return Err(LicenseError::AlgorithmMismatch {
                stored: stored_algorithm.to_string(),
                engine: engine.algorithm().to_string(),
            });
        }

        let signature = STANDARD
            .decode(signature_text)
            .map_err(|e| LicenseError::Codec(format!("signature base64: {}", e)))?;

        let transfer_charset = charset(self.codec)?;
        let data = match transfer_charset {
            Some(cs) => cs.encode(body),
            None => STANDARD
                .decode(body)
                .map_err(|e| LicenseError::Codec(format!("artifact base64: {}", e)))?,
        };
        if engine.verify(&data, &signature)? {
            return Ok(Decoder::new(self.codec.clone(), data));
        }

        // The signing side stores the body base64-encoded when the raw bytes
        // are not representable in the codec's charset, so retry once with a
        // base64 interpretation before declaring the repository tampered.
        if transfer_charset.is_some() {
            if let Ok(fallback) = STANDARD.decode(body) {
                if engine.verify(&fallback, &signature)? {
                    return Ok(Decoder::new(self.codec.clone(), fallback));
                }
            }
        }

        Err(LicenseError::RepositoryIntegrity)
    }

    fn signed_fields(&self) -> Result<(&str, &str, &str), LicenseError> {
        match (
            self.model.artifact.as_deref(),
            self.model.signature.as_deref(),
            self.model.algorithm.as_deref(),
        ) {
            (Some(artifact), Some(signature), Some(algorithm)) => {
                Ok((artifact, signature, algorithm))
            }
            _ => Err(LicenseError::Config(
                "repository model is not signed".to_string(),
            )),
        }
    }
}

/// Encode raw artifact bytes as the repository body: a string in the codec's
/// content transfer charset when the codec produces text and the bytes are
/// valid in that charset, else base64.
fn encode_body<C: Codec>(codec: &C, data: &[u8]) -> Result<String, LicenseError> {
    Ok(match charset(codec)? {
        Some(cs) => cs.decode(data).unwrap_or_else(|| STANDARD.encode(data)),
        None => STANDARD.encode(data),
    })
}

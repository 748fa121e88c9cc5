//! JSON wire format of the service.
//!
//! An inbound message is an [`Envelope`] carrying the client's [`Request`]
//! together with the host and path the fronting proxy observed for the
//! connection:
//!
//! ```json
//! {"bl_sig_req": {"type": "Issue", "contents": ["<b64>", "..."]},
//!  "host": "example.com", "http": "/login"}
//! ```
//!
//! Byte strings are standard base64.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::errors::ProtocolDecodeError;

/// Payload written back for a successful redemption. Any other payload is a
/// verification failure.
pub const REDEEM_SUCCESS: &[u8] = b"success";

/// Bytes carried as a base64 string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Base64Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Base64Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Outer message: the request plus the server-observed binding fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The client request
    #[serde(rename = "bl_sig_req")]
    pub request: Request,
    /// Host the request was made against
    #[serde(default)]
    pub host: String,
    /// Path the request was made against
    #[serde(default, rename = "http", alias = "path")]
    pub path: String,
}

impl Envelope {
    /// Decodes an envelope from raw bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolDecodeError`] if the bytes are not a valid envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolDecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Client request, selected by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "contents")]
pub enum Request {
    /// A batch of blinded points
    Issue(Vec<Base64Bytes>),
    /// A token preimage and its request binding tag
    Redeem(Base64Bytes, Base64Bytes),
}

/// Successful issuance: the signed points and the batch proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueResponse {
    /// Signed points, in request order
    pub sigs: Vec<Base64Bytes>,
    /// Serialized batch proof
    pub proof: Base64Bytes,
}

/// Failed issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Failure description
    pub error: String,
}

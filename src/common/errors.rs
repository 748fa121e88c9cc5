//! Common error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the group arithmetic provider.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GroupError {
    #[error("Invalid group element")]
    /// The bytes do not encode a valid, non-identity group element.
    InvalidElement,
    #[error("Invalid scalar")]
    /// The bytes do not encode a canonical scalar.
    InvalidScalar,
    #[error("Hash to group failed")]
    /// Hashing to the curve or to a scalar failed.
    HashToGroup,
}

/// Errors that can occur when building the key material.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("Server config does not contain a key")]
    /// Error when no scalar key was supplied.
    NoSecretKey,
    #[error("Commitment does not match the primary key")]
    /// Error when `H != k0 * G`.
    CommitmentMismatch,
}

/// Errors that can occur when loading key and commitment files.
#[derive(Error, Debug)]
pub enum KeyLoadError {
    #[error("Failed to read {path}: {source}")]
    /// Error when a file cannot be read.
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    #[error("Key file does not contain a key")]
    /// Error when the key file holds no private key block.
    NoSecretKey,
    #[error("Malformed PEM block in key file")]
    /// Error when a PEM block is not terminated.
    MalformedPem,
    #[error("Invalid private key at position {index}")]
    /// Error when a private key block cannot be parsed for the curve.
    InvalidKey {
        /// Position of the key in the file
        index: usize,
    },
    #[error("Invalid commitment file: {0}")]
    /// Error when the commitment file is not valid JSON.
    CommitmentFile(#[from] serde_json::Error),
    #[error("Invalid commitment point {name}")]
    /// Error when a commitment point cannot be decoded.
    InvalidCommitmentPoint {
        /// Name of the point in the file
        name: &'static str,
    },
}

/// Errors that can occur when computing or checking a batch proof.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProofError {
    #[error("Batch is empty")]
    /// Error when the batch holds no pairs.
    EmptyBatch,
    #[error("Blinded and signed tokens differ in length")]
    /// Error when the two halves of the batch have different lengths.
    LengthMismatch,
    #[error("Invalid proof encoding")]
    /// Error when a serialized proof cannot be decoded.
    InvalidEncoding,
    #[error("Proof verification failed")]
    /// Error when the proof does not verify against the batch.
    ProofVerificationFailed,
    #[error(transparent)]
    /// Error from the group arithmetic.
    Group(#[from] GroupError),
}

/// Errors that can occur when issuing a batch of tokens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IssueError {
    #[error("Batch is empty")]
    /// Error when no blinded tokens were supplied.
    EmptyBatch,
    #[error("Batch of {size} tokens exceeds the maximum of {max}")]
    /// Error when the batch is larger than the configured maximum.
    BatchSizeExceeded {
        /// Requested batch size
        size: usize,
        /// Configured maximum
        max: usize,
    },
    #[error("Invalid blinded token at position {index}")]
    /// Error when a blinded token is not a valid group element.
    InvalidPoint {
        /// Position of the token in the batch
        index: usize,
    },
    #[error("Proof verification failed")]
    /// Error when the freshly computed proof does not verify.
    ProofVerificationFailed,
    #[error("Proof generation failed")]
    /// Error when the proof cannot be computed.
    ProofGeneration,
}

/// Errors that can occur when redeeming a token.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RedeemError {
    #[error("Token verification failed")]
    /// Error when no configured key reproduces the presented tag.
    VerifyFailed,
    #[error("The token has already been redeemed")]
    /// Error when the token has already been redeemed.
    DoubleSpending,
}

/// Errors that can occur when decoding a request.
#[derive(Error, Debug)]
pub enum ProtocolDecodeError {
    #[error("Malformed request: {0}")]
    /// Error when the envelope or payload is not valid JSON.
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading a request off a connection.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Timed out reading request")]
    /// Error when the read deadline passed before any data arrived.
    Timeout,
    #[error("Request exceeds {limit} bytes")]
    /// Error when the request is larger than the limit.
    RequestTooLarge {
        /// Size limit in bytes
        limit: usize,
    },
    #[error(transparent)]
    /// Error from the socket.
    Io(#[from] std::io::Error),
}

/// Errors that can occur when building an issuance request on the client.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IssueTokenRequestError {
    #[error("Token blinding error")]
    /// Error when blinding the token.
    BlindingError,
}

/// Errors that can occur when turning an issuance response into tokens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IssueTokenError {
    #[error("Invalid TokenResponse")]
    /// Error when the response does not decode or its proof does not verify.
    InvalidTokenResponse,
}

/// Errors that can occur when building the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    /// Error when the config file cannot be read.
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    /// Error when the config file is not valid JSON.
    Parse(#[from] serde_json::Error),
    #[error("No key file configured")]
    /// Error when the key file path is empty.
    MissingKeyPath,
    #[error("No commitment file configured")]
    /// Error when the commitment file path is empty.
    MissingCommitmentPath,
    #[error("Maximum number of tokens must be at least 1")]
    /// Error when the batch limit is zero.
    InvalidMaxTokens,
}

/// Fatal errors raised before the service starts accepting connections.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    /// Error in the configuration.
    Config(#[from] ConfigError),
    #[error(transparent)]
    /// Error loading the key or commitment file.
    KeyLoad(#[from] KeyLoadError),
    #[error(transparent)]
    /// Error when the keys do not match the commitment.
    Commitment(#[from] CommitmentError),
    #[error("Failed to bind {addr}: {source}")]
    /// Error when a listening socket cannot be bound.
    Bind {
        /// Address that could not be bound
        addr: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Errors that end the handling of a single connection.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    /// Error reading the request off the connection.
    Transport(#[from] TransportError),
    #[error(transparent)]
    /// Error decoding the request.
    Decode(#[from] ProtocolDecodeError),
    #[error(transparent)]
    /// Error issuing tokens.
    Issue(#[from] IssueError),
    #[error(transparent)]
    /// Error redeeming a token.
    Redeem(#[from] RedeemError),
    #[error("Failed to encode response: {0}")]
    /// Error encoding the response.
    Encode(serde_json::Error),
    #[error("Request handler failed")]
    /// Error when the blocking handler task panicked or was cancelled.
    Handler,
}

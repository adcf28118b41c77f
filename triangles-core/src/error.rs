//! Error types for triangles-core

use thiserror::Error;

/// Result type alias for triangles-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization error
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Record construction error
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    /// Proof-of-work search error
    #[error("Mining failed: {0}")]
    Mine(#[from] MineError),

    /// Signing error
    #[error("Signing failed: {0}")]
    Sign(#[from] SignError),

    /// Key material error
    #[error("Bad key: {0}")]
    Key(#[from] KeyError),

    /// Validation error
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Broadcast error
    #[error("Broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),

    /// Reference encoding error
    #[error("Reference failed: {0}")]
    Reference(#[from] ReferenceError),
}

/// Errors raised while assembling an unsigned record
#[derive(Error, Debug)]
pub enum BuildError {
    /// A tag entry had no elements
    #[error("Tag entry {index} is empty")]
    EmptyTag { index: usize },

    /// Canonical serialization failed
    #[error("Canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the proof-of-work search
#[derive(Error, Debug)]
pub enum MineError {
    /// The cancellation token fired before a satisfying nonce was found
    #[error("Mining aborted after {attempts} attempts")]
    Aborted { attempts: u64 },

    /// The record has no author, so the work would not survive signing
    #[error("Record has no author; set it before mining")]
    MissingAuthor,

    /// Canonical serialization failed
    #[error("Canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The blocking worker panicked or was cancelled by the runtime
    #[error("Mining worker failed: {0}")]
    Worker(String),
}

impl MineError {
    /// Whether running the same search again later can succeed
    ///
    /// Aborted searches are retryable; malformed input is a configuration bug.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MineError::Aborted { .. } | MineError::Worker(_))
    }
}

/// Errors raised while signing a record
#[derive(Error, Debug)]
pub enum SignError {
    /// Malformed or empty key material
    #[error("Bad key: {0}")]
    BadKey(#[from] KeyError),

    /// The record already names a different author
    #[error("Record author {actual} does not match signing key {expected}")]
    AuthorMismatch { expected: String, actual: String },

    /// The nonce entry claims more work than the final identifier carries
    #[error("Proof of work invalidated: target {target} bits, identifier has {achieved}")]
    WorkInvalidated { target: u32, achieved: u32 },

    /// Canonical serialization failed
    #[error("Canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while parsing key material
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// No key material supplied
    #[error("Secret key is empty")]
    Empty,

    /// Invalid hex encoding
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Invalid bech32 encoding or unexpected prefix
    #[error("Invalid bech32 encoding: {0}")]
    InvalidBech32(String),

    /// Bytes are not a valid secp256k1 key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Validation-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field required for a published record is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Record ID does not match the computed hash
    #[error("Record ID mismatch: expected {expected}, got {actual}")]
    RecordIdMismatch { expected: String, actual: String },

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    InvalidSignature(String),

    /// Canonical serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Nostr SDK error
    #[error("Nostr SDK error: {0}")]
    NostrSdk(String),
}

impl From<nostr_sdk::event::Error> for ValidationError {
    fn from(err: nostr_sdk::event::Error) -> Self {
        ValidationError::NostrSdk(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Serialization(err.to_string())
    }
}

/// Errors that prevent a broadcast from starting at all
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// The record is not fully signed or does not verify
    #[error("Record is not publishable: {0}")]
    Unpublishable(#[from] ValidationError),
}

/// Per-relay delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The relay address is not a websocket URL
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    /// The connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The relay answered OK with accepted=false
    #[error("Rejected by relay: {0}")]
    Rejected(String),

    /// The relay sent something that does not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The relay closed the connection before acknowledging
    #[error("Connection closed before acknowledgment")]
    Closed,

    /// The attempt exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The attempt's task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(String),
}

/// Reference encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The identifier is not 32 bytes of hex
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Bech32 encoding or decoding failed
    #[error("Bech32 error: {0}")]
    Bech32(String),

    /// The decoded string carried an unexpected prefix
    #[error("Expected prefix {expected}, got {actual}")]
    WrongPrefix { expected: String, actual: String },

    /// A TLV entry was truncated or had the wrong length
    #[error("Malformed TLV entry: {0}")]
    MalformedTlv(String),
}

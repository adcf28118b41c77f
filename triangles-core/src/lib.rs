//! Triangles Core Library
//!
//! This library implements the publication pipeline of the triangles bot:
//! building a Nostr record, mining proof of work for it, signing it,
//! broadcasting it to relays and encoding a shareable reference.
//!
//! # Features
//!
//! - Fluent builder for records of any kind
//! - NIP-13 proof-of-work search with cooperative cancellation
//! - Deterministic BIP-340 Schnorr signing and verification
//! - Concurrent relay fan-out with per-relay timeouts and outcomes
//! - NIP-19 `nevent` references with relay hints
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use triangles_core::{
//!     Broadcaster, Keys, RecordBuilder, WebSocketConnector, encode_reference, mine, sign,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let keys = Keys::generate();
//! let relays = vec!["wss://nos.lol".to_string()];
//!
//! let record = RecordBuilder::new()
//!     .author(keys.public_key())
//!     .kind(20)
//!     .content("hello")
//!     .add_tag(["t", "test"])
//!     .build()?;
//!
//! let mined = mine(record, 8, &CancellationToken::new())?;
//! let signed = Arc::new(sign(mined.record, &keys)?);
//!
//! let report = Broadcaster::new(Arc::new(WebSocketConnector::new()))
//!     .broadcast(Arc::clone(&signed), &relays)
//!     .await?;
//! println!("{} of {} relays accepted", report.success_count(), report.len());
//!
//! if let Some(id) = signed.id {
//!     println!("https://njump.me/{}", encode_reference(&id.to_hex(), &relays)?);
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod builder;
pub mod display;
pub mod error;
pub mod keys;
pub mod pow;
pub mod record;
pub mod reference;
pub mod relay;
pub mod serde_support;
pub mod signer;
pub mod validation;

// Re-export commonly used types and functions
pub use builder::RecordBuilder;
pub use error::{
    BroadcastError, BuildError, Error, KeyError, MineError, ReferenceError, RelayError, Result,
    SignError, ValidationError,
};
pub use keys::Keys;
pub use pow::{Mined, mine, mine_in_background, mine_with_progress};
pub use record::{KIND_PICTURE, KIND_UPLOAD_AUTH, Record, RecordId, Tag, unix_now};
pub use reference::{EventReference, decode_reference, encode_reference};
pub use relay::{
    BroadcastReport, Broadcaster, RelayConnector, RelayOutcome, WebSocketConnector,
};
pub use signer::{sign, verify};
pub use validation::validate_record;

// Re-exported so callers can name keys and signatures without a direct dependency
pub use secp256k1::XOnlyPublicKey;
pub use secp256k1::schnorr::Signature;
pub use tokio_util::sync::CancellationToken;

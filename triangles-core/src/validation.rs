//! Publishability checks run before a record leaves the process

use crate::error::ValidationError;
use crate::{Record, signer};

/// Validate a record for publication
///
/// Performs:
/// - presence checks for id, pubkey and sig
/// - identifier and Schnorr signature verification
/// - a cross-check through nostr-sdk's own parser and verifier, so a record
///   that passes here is also accepted by independent implementations
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    validate_basic_fields(record)?;

    signer::verify(record)?;

    let nostr_event = to_nostr_event(record)?;
    validate_with_nostr_sdk(&nostr_event)?;

    Ok(())
}

/// Presence checks without cryptographic verification
pub fn validate_basic_fields(record: &Record) -> Result<(), ValidationError> {
    if record.id.is_none() {
        return Err(ValidationError::MissingField("id"));
    }
    if record.author.is_none() {
        return Err(ValidationError::MissingField("pubkey"));
    }
    if record.sig.is_none() {
        return Err(ValidationError::MissingField("sig"));
    }
    Ok(())
}

fn to_nostr_event(record: &Record) -> Result<nostr_sdk::Event, ValidationError> {
    let json = serde_json::to_string(record)?;
    Ok(serde_json::from_str(&json)?)
}

fn validate_with_nostr_sdk(nostr_event: &nostr_sdk::Event) -> Result<(), ValidationError> {
    if nostr_event.verify().is_err() {
        return Err(ValidationError::InvalidSignature(
            "nostr-sdk rejected the event".to_string(),
        ));
    }
    Ok(())
}

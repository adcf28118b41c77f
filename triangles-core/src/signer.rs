//! Schnorr signing and verification (BIP-340)

use crate::error::{SignError, ValidationError};
use crate::pow::target_difficulty;
use crate::{Keys, Record};
use secp256k1::{Message, SECP256K1};

/// Sign a record, setting its author if unset
///
/// The identifier is recomputed from the final fields before signing. Signing is
/// deterministic: no auxiliary randomness is mixed in.
pub fn sign(mut record: Record, keys: &Keys) -> Result<Record, SignError> {
    let public_key = keys.public_key();
    match record.author {
        Some(author) if author != public_key => {
            return Err(SignError::AuthorMismatch {
                expected: public_key.to_string(),
                actual: author.to_string(),
            });
        }
        Some(_) => {}
        None => record.author = Some(public_key),
    }

    let id = record.refresh_id()?;

    if let Some(target) = target_difficulty(&record) {
        let achieved = id.leading_zero_bits();
        if achieved < target {
            return Err(SignError::WorkInvalidated { target, achieved });
        }
    }

    let message = Message::from_digest(*id.as_bytes());
    let sig = SECP256K1.sign_schnorr_no_aux_rand(&message, keys.keypair());
    record.sig = Some(sig);
    Ok(record)
}

/// Verify that the stored identifier matches the fields and the signature
/// matches the identifier and author
pub fn verify(record: &Record) -> Result<(), ValidationError> {
    let id = record.id.ok_or(ValidationError::MissingField("id"))?;
    let author = record.author.ok_or(ValidationError::MissingField("pubkey"))?;
    let sig = record.sig.ok_or(ValidationError::MissingField("sig"))?;

    let computed = record.compute_id()?;
    if computed != id {
        return Err(ValidationError::RecordIdMismatch {
            expected: id.to_hex(),
            actual: computed.to_hex(),
        });
    }

    let message = Message::from_digest(*id.as_bytes());
    SECP256K1
        .verify_schnorr(&sig, &message, &author)
        .map_err(|e| ValidationError::InvalidSignature(e.to_string()))
}

//! The record moved through the publication pipeline
//!
//! A [`Record`] is a Nostr event (NIP-01). Its identifier is the SHA-256 of the
//! canonical serialization `[0, pubkey, created_at, kind, tags, content]`, so any
//! change to those fields changes the identifier and voids a prior signature.

use crate::error::ReferenceError;
use secp256k1::XOnlyPublicKey;
use secp256k1::schnorr::Signature;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Picture-first post (NIP-68)
pub const KIND_PICTURE: u16 = 20;

/// Upload authorization presented to a media host
pub const KIND_UPLOAD_AUTH: u16 = 22242;

/// 32-byte content-derived record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId([u8; 32]);

impl RecordId {
    /// Wrap a raw digest
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 32-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ReferenceError> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            ReferenceError::InvalidIdentifier(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form used on the wire
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading zero bits of the raw digest
    pub fn leading_zero_bits(&self) -> u32 {
        leading_zero_bits(&self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for RecordId {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ReferenceError::InvalidIdentifier(format!(
                "identifier must be 64 hex characters, got {}",
                s.len()
            )));
        }
        let bytes =
            hex::decode(s).map_err(|e| ReferenceError::InvalidIdentifier(format!("{s}: {e}")))?;
        Self::from_slice(&bytes)
    }
}

/// Count leading zero bits over raw bytes, most significant bit first
pub fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut total = 0;
    for byte in bytes {
        if *byte == 0 {
            total += 8;
        } else {
            total += byte.leading_zeros();
            break;
        }
    }
    total
}

/// One tag entry: a key followed by positional values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub values: Vec<String>,
}

impl Tag {
    /// Build a tag from any sequence of string-like values
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The tag key (first element)
    pub fn key(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Positional value at `index` (the key is index 0)
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// A Nostr record, signed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier as last computed; `None` until the first computation
    pub id: Option<RecordId>,
    /// Author public key
    pub author: Option<XOnlyPublicKey>,
    /// Unix timestamp in seconds
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    /// Schnorr signature over `id`
    pub sig: Option<Signature>,
}

impl Record {
    /// Author as lowercase hex, or an empty string when unset
    pub fn author_hex(&self) -> String {
        self.author.map(|pk| pk.to_string()).unwrap_or_default()
    }

    /// Canonical serialization hashed into the identifier
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&(
            0,
            self.author_hex(),
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        ))
    }

    /// Hash the current fields without storing the result
    pub fn compute_id(&self) -> Result<RecordId, serde_json::Error> {
        let canonical = self.canonical_json()?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(RecordId(digest.into()))
    }

    /// Recompute and store the identifier
    pub fn refresh_id(&mut self) -> Result<RecordId, serde_json::Error> {
        let id = self.compute_id()?;
        self.id = Some(id);
        Ok(id)
    }

    pub fn is_signed(&self) -> bool {
        self.sig.is_some()
    }

    /// First tag with the given key
    pub fn find_tag(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.key() == Some(key))
    }

    /// Replace the first tag sharing `tag`'s key, or append it
    ///
    /// Later entries with the same key are removed. Returns the index the tag
    /// ended up at.
    pub fn upsert_tag(&mut self, tag: Tag) -> usize {
        let Some(key) = tag.key().map(str::to_owned) else {
            self.tags.push(tag);
            return self.tags.len() - 1;
        };

        match self.tags.iter().position(|t| t.key() == Some(key.as_str())) {
            Some(index) => {
                self.tags[index] = tag;
                let mut position = 0;
                self.tags.retain(|t| {
                    let keep = position <= index || t.key() != Some(key.as_str());
                    position += 1;
                    keep
                });
                index
            }
            None => {
                self.tags.push(tag);
                self.tags.len() - 1
            }
        }
    }
}

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

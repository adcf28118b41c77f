//! Shareable `nevent` references (NIP-19)
//!
//! The payload is a TLV stream: type 0 carries the 32-byte record id, type 1 a
//! relay URL, type 2 the author key and type 3 the kind as a big-endian u32.

use crate::RecordId;
use crate::error::ReferenceError;
use bech32::{Bech32, Hrp};
use secp256k1::XOnlyPublicKey;

pub const NEVENT_HRP: &str = "nevent";

const TLV_SPECIAL: u8 = 0;
const TLV_RELAY: u8 = 1;
const TLV_AUTHOR: u8 = 2;
const TLV_KIND: u8 = 3;

// bech32 caps a string at 1023 characters; 600 payload bytes leave room for
// the prefix and checksum
const MAX_PAYLOAD: usize = 600;

/// A record pointer with optional hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReference {
    pub id: RecordId,
    pub relays: Vec<String>,
    pub author: Option<XOnlyPublicKey>,
    pub kind: Option<u16>,
}

impl EventReference {
    pub fn new<I, S>(id: RecordId, relays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            relays: relays.into_iter().map(Into::into).collect(),
            author: None,
            kind: None,
        }
    }

    pub fn with_author(mut self, author: XOnlyPublicKey) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_kind(mut self, kind: u16) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Encode as `nevent1…`
    ///
    /// Relay hints that would push the string past the bech32 limit are dropped,
    /// last ones first. Hints longer than 255 bytes cannot be expressed in a TLV
    /// entry and are skipped.
    pub fn encode(&self) -> Result<String, ReferenceError> {
        let mut payload = Vec::with_capacity(64);
        push_tlv(&mut payload, TLV_SPECIAL, self.id.as_bytes());
        if let Some(author) = &self.author {
            push_tlv(&mut payload, TLV_AUTHOR, &author.serialize());
        }
        if let Some(kind) = self.kind {
            push_tlv(&mut payload, TLV_KIND, &u32::from(kind).to_be_bytes());
        }

        for relay in &self.relays {
            let bytes = relay.as_bytes();
            if bytes.len() > u8::MAX as usize {
                continue;
            }
            if payload.len() + 2 + bytes.len() > MAX_PAYLOAD {
                break;
            }
            push_tlv(&mut payload, TLV_RELAY, bytes);
        }

        let hrp = Hrp::parse(NEVENT_HRP).map_err(|e| ReferenceError::Bech32(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &payload).map_err(|e| ReferenceError::Bech32(e.to_string()))
    }

    /// Decode a `nevent1…` string; unknown TLV types are ignored
    pub fn decode(encoded: &str) -> Result<Self, ReferenceError> {
        let expected = Hrp::parse(NEVENT_HRP).map_err(|e| ReferenceError::Bech32(e.to_string()))?;
        let (hrp, payload) =
            bech32::decode(encoded).map_err(|e| ReferenceError::Bech32(e.to_string()))?;
        if hrp != expected {
            return Err(ReferenceError::WrongPrefix {
                expected: NEVENT_HRP.to_string(),
                actual: hrp.to_string(),
            });
        }

        let mut id = None;
        let mut relays = Vec::new();
        let mut author = None;
        let mut kind = None;

        let mut rest = payload.as_slice();
        while !rest.is_empty() {
            let [kind_byte, len, tail @ ..] = rest else {
                return Err(ReferenceError::MalformedTlv("truncated header".to_string()));
            };
            let len = *len as usize;
            if tail.len() < len {
                return Err(ReferenceError::MalformedTlv(format!(
                    "entry of type {} wants {} bytes, {} left",
                    kind_byte,
                    len,
                    tail.len()
                )));
            }
            let (value, remaining) = tail.split_at(len);
            rest = remaining;

            match *kind_byte {
                TLV_SPECIAL => id = Some(RecordId::from_slice(value)?),
                TLV_RELAY => relays.push(
                    String::from_utf8(value.to_vec())
                        .map_err(|e| ReferenceError::MalformedTlv(e.to_string()))?,
                ),
                TLV_AUTHOR => {
                    author = Some(
                        XOnlyPublicKey::from_slice(value)
                            .map_err(|e| ReferenceError::MalformedTlv(e.to_string()))?,
                    )
                }
                TLV_KIND => {
                    let bytes: [u8; 4] = value.try_into().map_err(|_| {
                        ReferenceError::MalformedTlv(format!("kind has {} bytes", value.len()))
                    })?;
                    kind = u16::try_from(u32::from_be_bytes(bytes)).ok();
                }
                _ => {}
            }
        }

        let id = id.ok_or_else(|| ReferenceError::MalformedTlv("missing record id".to_string()))?;
        Ok(Self {
            id,
            relays,
            author,
            kind,
        })
    }
}

fn push_tlv(payload: &mut Vec<u8>, kind: u8, value: &[u8]) {
    payload.push(kind);
    payload.push(value.len() as u8);
    payload.extend_from_slice(value);
}

/// Encode a hex identifier and relay hints as `nevent1…`
pub fn encode_reference<S: AsRef<str>>(id: &str, relays: &[S]) -> Result<String, ReferenceError> {
    let id: RecordId = id.parse()?;
    EventReference::new(id, relays.iter().map(|r| r.as_ref().to_string())).encode()
}

/// Decode a `nevent1…` string
pub fn decode_reference(encoded: &str) -> Result<EventReference, ReferenceError> {
    EventReference::decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "4376c65d2f232afbe9b882a35baa4f6fe8667c4e684749af565f981833ed6a65";

    #[test]
    fn test_encode_is_pure() {
        let relays = ["wss://relay.damus.io", "wss://nos.lol"];
        let a = encode_reference(ID, &relays).unwrap();
        let b = encode_reference(ID, &relays).unwrap();

        assert_eq!(a, b);
        assert!(a.starts_with("nevent1"));
    }

    #[test]
    fn test_decode_restores_id_and_relays() {
        let relays = ["wss://relay.damus.io", "wss://nos.lol", "wss://nos.lol"];
        let encoded = encode_reference(ID, &relays).unwrap();
        let decoded = decode_reference(&encoded).unwrap();

        assert_eq!(decoded.id.to_hex(), ID);
        assert_eq!(decoded.relays, relays);
        assert_eq!(decoded.author, None);
        assert_eq!(decoded.kind, None);
    }

    #[test]
    fn test_relay_order_changes_reference() {
        let a = encode_reference(ID, &["wss://a.example", "wss://b.example"]).unwrap();
        let b = encode_reference(ID, &["wss://b.example", "wss://a.example"]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_author_and_kind_hints() {
        let keys = crate::Keys::generate();
        let reference = EventReference::new(ID.parse().unwrap(), ["wss://nos.lol"])
            .with_author(keys.public_key())
            .with_kind(20);

        let decoded = EventReference::decode(&reference.encode().unwrap()).unwrap();
        assert_eq!(decoded, reference);
    }

    #[test]
    fn test_oversized_relay_list_is_truncated() {
        let relays: Vec<String> = (0..100)
            .map(|i| format!("wss://relay-number-{i}.example.com"))
            .collect();
        let encoded = encode_reference(ID, &relays).unwrap();
        let decoded = decode_reference(&encoded).unwrap();

        assert!(encoded.len() <= 1023);
        assert!(!decoded.relays.is_empty());
        assert!(decoded.relays.len() < relays.len());
        assert_eq!(decoded.relays[..], relays[..decoded.relays.len()]);
    }

    #[test]
    fn test_malformed_identifier() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            encode_reference("xyz", &empty),
            Err(ReferenceError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            encode_reference(&"a".repeat(62), &empty),
            Err(ReferenceError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_prefix() {
        let keys = crate::Keys::generate();
        let npub = keys.npub().unwrap();
        assert!(matches!(
            decode_reference(&npub),
            Err(ReferenceError::WrongPrefix { .. })
        ));
    }
}

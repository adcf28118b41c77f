//! Serde support for Record
//!
//! Records serialize to the Nostr wire object
//! `{"id","pubkey","created_at","kind","tags","content","sig"}`. Fields that are
//! not set yet render as empty strings and parse back to `None`.

use crate::{Record, RecordId, Tag};
use secp256k1::XOnlyPublicKey;
use secp256k1::schnorr::Signature;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let id = self.id.map(|id| id.to_hex()).unwrap_or_default();
        let sig = self.sig.map(|sig| sig.to_string()).unwrap_or_default();

        let mut state = serializer.serialize_struct("Record", 7)?;
        state.serialize_field("id", &id)?;
        state.serialize_field("pubkey", &self.author_hex())?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("tags", &self.tags)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("sig", &sig)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RecordHelper {
            #[serde(default)]
            id: String,
            #[serde(default)]
            pubkey: String,
            created_at: u64,
            kind: u16,
            tags: Vec<Tag>,
            content: String,
            #[serde(default)]
            sig: String,
        }

        let helper = RecordHelper::deserialize(deserializer)?;

        let id = non_empty(&helper.id)
            .map(str::parse::<RecordId>)
            .transpose()
            .map_err(D::Error::custom)?;
        let author = non_empty(&helper.pubkey)
            .map(str::parse::<XOnlyPublicKey>)
            .transpose()
            .map_err(|e| D::Error::custom(format!("invalid pubkey: {e}")))?;
        let sig = non_empty(&helper.sig)
            .map(str::parse::<Signature>)
            .transpose()
            .map_err(|e| D::Error::custom(format!("invalid sig: {e}")))?;

        Ok(Record {
            id,
            author,
            created_at: helper.created_at,
            kind: helper.kind,
            tags: helper.tags,
            content: helper.content,
            sig,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<String>::deserialize(deserializer)?;
        Ok(Tag { values })
    }
}

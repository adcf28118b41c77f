//! Builder pattern for Record construction

use crate::error::BuildError;
use crate::record::unix_now;
use crate::{Record, Tag};
use secp256k1::XOnlyPublicKey;

/// Fluent builder for unsigned records
///
/// The builder is kind-agnostic: the picture post and the upload authorization
/// are both assembled with it.
///
/// # Example
///
/// ```
/// use triangles_core::RecordBuilder;
///
/// let record = RecordBuilder::new()
///     .created_at(1234567890)
///     .kind(20)
///     .content("hello")
///     .add_tag(["t", "test"])
///     .build()?;
///
/// assert_eq!(record.tags.len(), 1);
/// assert!(record.id.is_some());
/// assert!(record.sig.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    author: Option<XOnlyPublicKey>,
    created_at: Option<u64>,
    kind: u16,
    tags: Vec<Tag>,
    content: String,
}

impl RecordBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the author up front so proof of work covers it
    pub fn author(mut self, author: XOnlyPublicKey) -> Self {
        self.author = Some(author);
        self
    }

    /// Set the creation timestamp; defaults to the time of `build`
    pub fn created_at(mut self, timestamp: u64) -> Self {
        self.created_at = Some(timestamp);
        self
    }

    /// Set the record kind
    pub fn kind(mut self, kind: u16) -> Self {
        self.kind = kind;
        self
    }

    /// Set the content
    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    /// Add a single tag
    ///
    /// Accepts any iterator of string-like values
    pub fn add_tag<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(Tag::new(values));
        self
    }

    /// Replace all tags at once
    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Add a tag from a Tag instance
    pub fn add_tag_instance(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Build the unsigned record and compute its identifier
    pub fn build(self) -> Result<Record, BuildError> {
        if let Some(index) = self.tags.iter().position(|tag| tag.values.is_empty()) {
            return Err(BuildError::EmptyTag { index });
        }

        let mut record = Record {
            id: None,
            author: self.author,
            created_at: self.created_at.unwrap_or_else(unix_now),
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: None,
        };
        record.refresh_id()?;
        Ok(record)
    }
}

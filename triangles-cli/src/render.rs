//! Image rendering seam
//!
//! The abstract approximation itself lives outside this crate. The pipeline
//! only hands source bytes to a [`Renderer`] and uploads whatever comes back.

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Produces the derived image uploaded with each post
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, source: Vec<u8>) -> Result<Vec<u8>>;
}

/// Uploads the source image unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

#[async_trait]
impl Renderer for PassthroughRenderer {
    async fn render(&self, source: Vec<u8>) -> Result<Vec<u8>> {
        if source.is_empty() {
            bail!("Nothing to render: source image is empty");
        }
        Ok(source)
    }
}

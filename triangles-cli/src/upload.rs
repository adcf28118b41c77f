//! Blob upload with a signed authorization record

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use triangles_core::{
    CancellationToken, KIND_UPLOAD_AUTH, Keys, Record, RecordBuilder, mine, sign,
};
use url::Url;

pub const AUTHORIZE_CONTENT: &str = "Authorize Upload";

/// Build the kind 22242 record authorizing an upload of `photo_id`
///
/// Runs through the same builder, miner (at difficulty 0) and signer as the
/// picture post.
pub fn authorization_record(
    photo_id: &str,
    keys: &Keys,
    created_at: u64,
) -> triangles_core::Result<Record> {
    let record = RecordBuilder::new()
        .author(keys.public_key())
        .created_at(created_at)
        .kind(KIND_UPLOAD_AUTH)
        .content(AUTHORIZE_CONTENT)
        .add_tag(["name".to_string(), format!("unsplash-{photo_id}")])
        .build()?;

    let mined = mine(record, 0, &CancellationToken::new())?;
    Ok(sign(mined.record, keys)?)
}

/// Hosts rendered images
#[async_trait]
pub trait BlobUploader: Send + Sync {
    /// Upload `bytes` and return the hosted URL
    async fn upload(&self, authorization: &Record, bytes: Vec<u8>) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Satellite media endpoint client
#[derive(Clone)]
pub struct SatelliteUploader {
    http: Client,
    endpoint: Url,
}

impl SatelliteUploader {
    pub fn new(http: Client, endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid upload URL: {endpoint}"))?;
        Ok(Self { http, endpoint })
    }

    /// Endpoint URL with the authorization record in the `auth` query parameter
    pub fn request_url(&self, authorization: &Record) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("auth", &authorization.to_string());
        url
    }
}

#[async_trait]
impl BlobUploader for SatelliteUploader {
    async fn upload(&self, authorization: &Record, bytes: Vec<u8>) -> Result<String> {
        let url = self.request_url(authorization);
        debug!("Uploading {} bytes to {}", bytes.len(), self.endpoint);

        let response = self
            .http
            .put(url)
            .body(bytes)
            .send()
            .await
            .context("Upload request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read upload response")?;
        if !status.is_success() {
            bail!("Upload rejected with {}: {}", status, body.trim());
        }

        let hosted: UploadResponse =
            serde_json::from_str(&body).context("Failed to decode upload response")?;
        Ok(hosted.url)
    }
}

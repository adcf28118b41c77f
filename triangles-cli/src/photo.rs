//! Photo provider client

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const UNSPLASH_RANDOM_URL: &str = "https://api.unsplash.com/photos/random";

/// Metadata of a provider photo
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Photo {
    pub id: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub description: String,
    pub blur_hash: String,
    pub location_name: String,
    pub tags: Vec<String>,
}

/// Source of photos to render
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Pick a random photo
    async fn random_photo(&self) -> Result<Photo>;

    /// Fetch the image bytes of a photo
    async fn download(&self, photo: &Photo) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    urls: UnsplashUrls,
    #[serde(default)]
    blur_hash: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    alt_description: Option<String>,
    #[serde(default)]
    location: Option<UnsplashLocation>,
    #[serde(default)]
    tags: Vec<UnsplashTag>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashTag {
    title: String,
}

impl From<UnsplashPhoto> for Photo {
    fn from(photo: UnsplashPhoto) -> Self {
        Self {
            id: photo.id,
            image_url: photo.urls.regular,
            width: photo.width,
            height: photo.height,
            description: photo.alt_description.unwrap_or_default(),
            blur_hash: photo.blur_hash.unwrap_or_default(),
            location_name: photo
                .location
                .and_then(|location| location.name)
                .unwrap_or_default(),
            tags: photo.tags.into_iter().map(|tag| tag.title).collect(),
        }
    }
}

/// Parse a `/photos/random` response body
pub fn parse_unsplash_photo(body: &str) -> Result<Photo> {
    let photo: UnsplashPhoto =
        serde_json::from_str(body).context("Failed to decode Unsplash response")?;
    Ok(photo.into())
}

/// Unsplash API client
#[derive(Clone)]
pub struct UnsplashClient {
    http: Client,
    client_id: String,
    topics: Vec<String>,
    endpoint: String,
}

impl UnsplashClient {
    pub fn new(http: Client, client_id: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            topics,
            endpoint: UNSPLASH_RANDOM_URL.to_string(),
        }
    }

    /// Point the client at another endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl PhotoSource for UnsplashClient {
    async fn random_photo(&self) -> Result<Photo> {
        let topics = self.topics.join(",");
        debug!("Requesting random photo (topics: {})", topics);

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("client_id", self.client_id.as_str()), ("topics", topics.as_str())])
            .send()
            .await
            .context("Unsplash request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Unsplash response")?;
        if !status.is_success() {
            bail!("Unsplash returned {}: {}", status, body.trim());
        }

        parse_unsplash_photo(&body)
    }

    async fn download(&self, photo: &Photo) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(&photo.image_url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", photo.image_url))?
            .error_for_status()
            .with_context(|| format!("Failed to download {}", photo.image_url))?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read photo body")?;
        debug!("Downloaded {} bytes for photo {}", bytes.len(), photo.id);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unsplash_photo() {
        let body = r#"{
            "id": "Dwu85P9SOIk",
            "width": 4000,
            "height": 3000,
            "blur_hash": "LFC$yHwc8^$yIAS$%M%00KxukYIp",
            "alt_description": "a cathedral at dusk",
            "urls": { "regular": "https://images.unsplash.com/photo-1?w=1080", "raw": "ignored" },
            "links": { "html": "https://unsplash.com/photos/Dwu85P9SOIk" },
            "location": { "name": "Cologne, Germany", "city": "Cologne" },
            "tags": [ { "title": "gothic architecture" }, { "title": "church" } ]
        }"#;

        let photo = parse_unsplash_photo(body).unwrap();
        assert_eq!(photo.id, "Dwu85P9SOIk");
        assert_eq!(photo.image_url, "https://images.unsplash.com/photo-1?w=1080");
        assert_eq!((photo.width, photo.height), (4000, 3000));
        assert_eq!(photo.description, "a cathedral at dusk");
        assert_eq!(photo.location_name, "Cologne, Germany");
        assert_eq!(photo.tags, vec!["gothic architecture", "church"]);
    }

    #[test]
    fn test_parse_sparse_photo() {
        let body = r#"{
            "id": "x",
            "urls": { "regular": "https://images.unsplash.com/x" },
            "alt_description": null,
            "location": { "name": null }
        }"#;

        let photo = parse_unsplash_photo(body).unwrap();
        assert_eq!(photo.description, "");
        assert_eq!(photo.location_name, "");
        assert_eq!(photo.blur_hash, "");
        assert!(photo.tags.is_empty());
    }

    #[test]
    fn test_parse_error_body() {
        assert!(parse_unsplash_photo(r#"{"errors":["OAuth error"]}"#).is_err());
    }
}

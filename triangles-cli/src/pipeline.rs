//! One publication run: fetch, render, upload, then build, mine, sign,
//! broadcast and encode a reference
//!
//! Every failure of a run is a [`RunError`]; [`RunError::severity`] is the only
//! place that decides how the caller should react.

use crate::config::Settings;
use crate::photo::{Photo, PhotoSource, UnsplashClient};
use crate::post::picture_post;
use crate::progress::MiningProgress;
use crate::render::{PassthroughRenderer, Renderer};
use crate::upload::{BlobUploader, SatelliteUploader, authorization_record};
use anyhow::Context;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use triangles_core::{
    BroadcastError, BroadcastReport, Broadcaster, CancellationToken, Keys, MineError, Record,
    RelayConnector, SignError, WebSocketConnector, encode_reference, mine_in_background, sign,
    unix_now,
};

pub const SHARE_URL_PREFIX: &str = "https://njump.me/";

/// Collaborator stage a transient failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchPhoto,
    Download,
    Render,
    Upload,
    Mine,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchPhoto => "Photo lookup",
            Stage::Download => "Photo download",
            Stage::Render => "Rendering",
            Stage::Upload => "Upload",
            Stage::Mine => "Mining worker",
        };
        f.write_str(name)
    }
}

/// How the scheduler should treat a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Try again on the next tick
    Transient,
    /// The same settings will keep failing
    Misconfiguration,
}

/// Why a run stopped before producing a reference
#[derive(Error, Debug)]
pub enum RunError {
    #[error("{stage} failed: {cause:#}")]
    Transient { stage: Stage, cause: anyhow::Error },

    #[error("Mining aborted after {attempts} attempts")]
    MiningAborted { attempts: u64 },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignError),

    #[error("Broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),
}

impl RunError {
    pub fn severity(&self) -> Severity {
        match self {
            RunError::Transient { .. } | RunError::MiningAborted { .. } => Severity::Transient,
            RunError::MalformedRecord(_) | RunError::Signing(_) | RunError::Broadcast(_) => {
                Severity::Misconfiguration
            }
        }
    }

    fn transient(stage: Stage, cause: anyhow::Error) -> Self {
        RunError::Transient { stage, cause }
    }
}

impl From<MineError> for RunError {
    fn from(err: MineError) -> Self {
        match err {
            MineError::Aborted { attempts } => RunError::MiningAborted { attempts },
            MineError::Worker(message) => {
                RunError::transient(Stage::Mine, anyhow::anyhow!(message))
            }
            other => RunError::MalformedRecord(other.to_string()),
        }
    }
}

impl From<triangles_core::Error> for RunError {
    fn from(err: triangles_core::Error) -> Self {
        match err {
            triangles_core::Error::Sign(e) => RunError::Signing(e),
            triangles_core::Error::Mine(e) => e.into(),
            triangles_core::Error::Broadcast(e) => RunError::Broadcast(e),
            other => RunError::MalformedRecord(other.to_string()),
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub photo: Photo,
    pub hosted_url: String,
    pub record: Arc<Record>,
    pub attempts: u64,
    pub broadcast: BroadcastReport,
    pub reference: String,
}

impl RunReport {
    pub fn share_url(&self) -> String {
        format!("{}{}", SHARE_URL_PREFIX, self.reference)
    }
}

/// External services a run talks to
#[derive(Clone)]
pub struct Collaborators {
    pub photos: Arc<dyn PhotoSource>,
    pub renderer: Arc<dyn Renderer>,
    pub uploader: Arc<dyn BlobUploader>,
    pub connector: Arc<dyn RelayConnector>,
}

impl Collaborators {
    /// Unsplash, passthrough rendering, satellite uploads and websocket relays
    pub fn production(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("triangles/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            photos: Arc::new(UnsplashClient::new(
                http.clone(),
                settings.unsplash_client_id.clone(),
                settings.unsplash_topics.clone(),
            )),
            renderer: Arc::new(PassthroughRenderer),
            uploader: Arc::new(SatelliteUploader::new(http, &settings.upload_url)?),
            connector: Arc::new(WebSocketConnector::new()),
        })
    }
}

pub struct Pipeline {
    settings: Settings,
    keys: Keys,
    collaborators: Collaborators,
    broadcaster: Broadcaster,
    progress: MiningProgress,
}

impl Pipeline {
    pub fn new(settings: Settings, collaborators: Collaborators) -> anyhow::Result<Self> {
        let keys = settings.keys()?;
        let broadcaster = Broadcaster::new(Arc::clone(&collaborators.connector))
            .with_timeout(settings.relay_timeout);

        Ok(Self {
            settings,
            keys,
            collaborators,
            broadcaster,
            progress: MiningProgress::disabled(),
        })
    }

    pub fn with_progress(mut self, progress: MiningProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    /// Perform one publication
    ///
    /// `cancel` interrupts mining; the configured mining timeout fires it too.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunReport, RunError> {
        let collaborators = &self.collaborators;

        info!("Getting image from photo provider...");
        let photo = collaborators
            .photos
            .random_photo()
            .await
            .map_err(|e| RunError::transient(Stage::FetchPhoto, e))?;
        debug!("Picked photo {} ({})", photo.id, photo.image_url);

        let source = collaborators
            .photos
            .download(&photo)
            .await
            .map_err(|e| RunError::transient(Stage::Download, e))?;

        info!("Rendering image...");
        let rendered = collaborators
            .renderer
            .render(source)
            .await
            .map_err(|e| RunError::transient(Stage::Render, e))?;

        info!("Authorizing and uploading rendered image...");
        let authorization = authorization_record(&photo.id, &self.keys, unix_now())?;
        let hosted_url = collaborators
            .uploader
            .upload(&authorization, rendered)
            .await
            .map_err(|e| RunError::transient(Stage::Upload, e))?;
        debug!("Rendering hosted at {}", hosted_url);

        info!("Creating kind 20 post...");
        let record = picture_post(
            &photo,
            &hosted_url,
            &self.settings.additional_tags,
            self.keys.public_key(),
            unix_now(),
        )
        .map_err(|e| RunError::MalformedRecord(e.to_string()))?;

        let difficulty = self.settings.pow;
        info!("Doing {} bits of proof of work...", difficulty);
        let started = Instant::now();
        self.progress.start(difficulty);
        let mined = match mine_in_background(
            record,
            difficulty,
            cancel.child_token(),
            self.settings.mining_timeout,
            self.progress.callback(),
        )
        .await
        {
            Ok(mined) => {
                self.progress.finish(format!(
                    "Mined {} bits in {} attempts",
                    mined.difficulty, mined.attempts
                ));
                mined
            }
            Err(e) => {
                self.progress.abandon();
                return Err(e.into());
            }
        };
        debug!(
            "Mined {} bits in {} attempts ({:?})",
            mined.difficulty,
            mined.attempts,
            started.elapsed()
        );

        let signed = Arc::new(sign(mined.record, &self.keys)?);
        info!("Signed record: {}", signed);

        let relays = &self.settings.relay_urls;
        let broadcast = self.broadcaster.broadcast(Arc::clone(&signed), relays).await?;
        if broadcast.success_count() == 0 {
            warn!("No relay accepted the record ({} tried)", broadcast.len());
        } else {
            info!(
                "Published to {} of {} relays",
                broadcast.success_count(),
                broadcast.len()
            );
        }

        let id = signed
            .id
            .ok_or_else(|| RunError::MalformedRecord("signed record has no identifier".into()))?;
        let reference = encode_reference(&id.to_hex(), relays.as_slice())
            .map_err(|e| RunError::MalformedRecord(e.to_string()))?;

        Ok(RunReport {
            photo,
            hosted_url,
            record: signed,
            attempts: mined.attempts,
            broadcast,
            reference,
        })
    }
}

//! Proof-of-work mining (NIP-13)
//!
//! The work lives in a single `["nonce", <counter>, <target>]` tag. Each attempt
//! rewrites the counter, rehashes the record and counts leading zero bits of the
//! raw digest. The search has no iteration bound; callers stop it through a
//! [`CancellationToken`], either directly or with [`mine_in_background`]'s
//! deadline.

use crate::error::MineError;
use crate::{Record, Tag};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tag key carrying the nonce and its target difficulty
pub const NONCE_TAG: &str = "nonce";

/// How many attempts pass between progress callbacks
pub const PROGRESS_INTERVAL: u64 = 1 << 14;

/// Outcome of a successful search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mined {
    /// The record with its nonce tag set and identifier refreshed
    pub record: Record,
    /// Winning nonce, `None` when no search was needed
    pub nonce: Option<u64>,
    /// Number of hashes computed
    pub attempts: u64,
    /// Leading zero bits of the final identifier
    pub difficulty: u32,
}

/// Target difficulty claimed by a record's nonce tag, if any
pub fn target_difficulty(record: &Record) -> Option<u32> {
    record
        .find_tag(NONCE_TAG)
        .and_then(|tag| tag.get(2))
        .and_then(|target| target.parse().ok())
}

/// Search for a nonce giving at least `difficulty` leading zero bits
pub fn mine(record: Record, difficulty: u8, cancel: &CancellationToken) -> Result<Mined, MineError> {
    mine_with_progress(record, difficulty, cancel, |_| {})
}

/// Like [`mine`], calling `progress` with the attempt count every
/// [`PROGRESS_INTERVAL`] attempts
pub fn mine_with_progress<F>(
    mut record: Record,
    difficulty: u8,
    cancel: &CancellationToken,
    mut progress: F,
) -> Result<Mined, MineError>
where
    F: FnMut(u64),
{
    if difficulty == 0 {
        // A stale target would fail the signer's work check
        if record.find_tag(NONCE_TAG).is_some() {
            record.sig = None;
            record.upsert_tag(Tag::new([NONCE_TAG, "0", "0"]));
        }
        let id = record.refresh_id()?;
        return Ok(Mined {
            difficulty: id.leading_zero_bits(),
            nonce: None,
            attempts: 0,
            record,
        });
    }

    if record.author.is_none() {
        return Err(MineError::MissingAuthor);
    }

    // Any earlier signature is void once the tags change
    record.sig = None;

    let target = u32::from(difficulty);
    let slot = record.upsert_tag(Tag::new([NONCE_TAG, "0", &difficulty.to_string()]));

    let mut nonce: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            debug!("Mining cancelled after {} attempts", nonce);
            return Err(MineError::Aborted { attempts: nonce });
        }

        record.tags[slot].values[1] = nonce.to_string();
        let id = record.compute_id()?;
        let achieved = id.leading_zero_bits();

        if achieved >= target {
            record.id = Some(id);
            return Ok(Mined {
                record,
                nonce: Some(nonce),
                attempts: nonce + 1,
                difficulty: achieved,
            });
        }

        nonce += 1;
        if nonce % PROGRESS_INTERVAL == 0 {
            progress(nonce);
        }
    }
}

/// Run the search on a blocking worker so the async runtime stays responsive
///
/// When `deadline` elapses the token is cancelled and the search reports
/// [`MineError::Aborted`].
pub async fn mine_in_background<F>(
    record: Record,
    difficulty: u8,
    cancel: CancellationToken,
    deadline: Option<Duration>,
    progress: F,
) -> Result<Mined, MineError>
where
    F: FnMut(u64) + Send + 'static,
{
    let worker_token = cancel.clone();
    let worker = tokio::task::spawn_blocking(move || {
        mine_with_progress(record, difficulty, &worker_token, progress)
    });

    let timer = deadline.map(|deadline| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            debug!("Mining deadline of {:?} reached", deadline);
            token.cancel();
        })
    });

    let result = worker
        .await
        .map_err(|e| MineError::Worker(e.to_string()));

    if let Some(timer) = timer {
        timer.abort();
    }

    result?
}

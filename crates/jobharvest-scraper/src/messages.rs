//! Messages exchanged with the controlling surface.
//!
//! Serialized as JSON objects tagged by `type`, e.g.
//! `{"type":"SCRAPING_PROGRESS","platform":"SEEK","current":3,"total":30,"jobsFound":3}`.

use crate::pagination::Cursor;
use jobharvest_core::{Job, Platform, RunId};
use serde::{Deserialize, Serialize};

/// Why a run returned before visiting every card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// The receiving side of the progress channel went away
    ControllerClosed,
    /// The run's cancellation token fired
    Cancelled,
    /// A verification challenge was not cleared in time
    ChallengeUnresolved,
}

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    /// Start a run on the current page
    StartScraping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_cards: Option<usize>,
    },
    /// One card processed
    ScrapingProgress {
        platform: Platform,
        current: usize,
        total: usize,
        jobs_found: usize,
    },
    /// A run finished
    ScrapingResult {
        run_id: RunId,
        platform: Platform,
        jobs: Vec<Job>,
        #[serde(default)]
        next_cursor: Option<Cursor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stop_reason: Option<StopReason>,
    },
    /// Progress overlay may be shown again
    ShowOverlay,
    /// Progress overlay must get out of the user's way
    HideOverlay,
    /// A human has to clear a verification challenge
    VerificationRequired { platform: Platform, message: String },
    /// The challenge is gone and automation resumed
    VerificationCleared { platform: Platform },
}

impl Message {
    /// Failed run: no jobs and an error description.
    pub fn failed(run_id: RunId, platform: Platform, error: impl Into<String>) -> Self {
        Message::ScrapingResult {
            run_id,
            platform,
            jobs: Vec::new(),
            next_cursor: None,
            error: Some(error.into()),
            stop_reason: None,
        }
    }
}

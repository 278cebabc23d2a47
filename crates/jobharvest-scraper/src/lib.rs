//! jobharvest Scraper - click-and-reveal orchestration for job boards.
//!
//! Job boards render listings as cards and only show a posting's details
//! after the card is activated. This crate drives that interaction through
//! the [`jobharvest_browser::BrowserActions`] trait and turns what it reveals
//! into [`jobharvest_core::Job`] records.
//!
//! # Features
//!
//! - Per-platform adapters (LinkedIn, SEEK, Indeed) resolved from the page URL
//! - Panel synchronization with capped exponential backoff and stale-panel detection
//! - Verification challenge detection with a bounded wait for the user
//! - Next-page resolution from controls or "page X of Y" indicators
//! - Description normalization preserving bold, lists and paragraphs
//!
//! # Example
//!
//! ```rust,ignore
//! use jobharvest_scraper::{classify, ControllerConfig, RunContext};
//!
//! let adapter = classify(&page.current_url().await?).expect("supported board");
//! let ctx = RunContext::new(progress_tx);
//! let outcome = adapter.scrape_list(&page, &ctx, &ControllerConfig::default()).await;
//! println!("{} jobs", outcome.jobs.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod adapters;
pub mod context;
#[allow(missing_docs)]
pub mod controller;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod guard;
#[allow(missing_docs)]
pub mod messages;
pub mod normalize;
#[allow(missing_docs)]
pub mod pacing;
#[allow(missing_docs)]
pub mod pagination;
#[allow(missing_docs)]
pub mod sync;

pub use adapters::{classify, BoardAdapter, DiscoveredCard, PlatformAdapter};
pub use context::{Delivery, RunContext};
pub use controller::{handle_start, run, run_pages, scrape_detail, ControllerConfig, RunOutcome};
pub use error::{Result, ScrapeError};
pub use guard::{BotGuard, ChallengePolicy, GuardConfig};
pub use messages::{Message, StopReason};
pub use normalize::normalize;
pub use pagination::Cursor;
pub use sync::{wait_for_reveal, Readiness, RevealOutcome, SyncConfig};

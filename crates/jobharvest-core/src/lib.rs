//! jobharvest Core - Foundation crate for the jobharvest scraper.
//!
//! This crate provides the job-record model, error handling and configuration
//! management that all other jobharvest crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `Job`, `JobDraft`, `CardSnapshot`, `Platform`, `RunId`
//!
//! # Example
//!
//! ```rust
//! use jobharvest_core::{Job, JobDraft, Platform};
//!
//! let draft = JobDraft {
//!     title: " Rust Engineer ".to_string(),
//!     company: "Acme".to_string(),
//!     job_url: "https://www.seek.com.au/job/1".to_string(),
//!     ..JobDraft::default()
//! };
//! let job = Job::seek(draft).expect("title, company and URL present");
//! assert_eq!(job.title(), "Rust Engineer");
//! assert_eq!(job.platform(), Platform::Seek);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
#[allow(missing_docs)]
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, BufferConfig, ScrapingConfig};
pub use error::{ConfigError, ConfigResult, HarvestError, Result};
pub use types::{
    single_line, CardSnapshot, Job, JobDraft, Platform, RunId, Timestamp, WorkplaceType,
};

//! Browser automation for client-rendered job boards.
//!
//! Provides headful/headless browser control with fingerprint randomization
//! and per-host navigation spacing, behind the [`BrowserActions`] trait that
//! the scraping layer drives.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod scripted;

pub use actions::{BrowserActions, ElementTarget};
pub use engine::{BrowserEngine, EngineOptions};
pub use error::{BrowserError, Result};
pub use scripted::{Frame, ScriptedPage};

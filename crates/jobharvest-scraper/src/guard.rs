//! Bot/verification guard.
//!
//! Detects challenge interstitials, steps out of the user's way while a
//! human clears them and resumes once the board's own content is back.

use crate::context::RunContext;
use crate::error::Result;
use crate::messages::Message;
use jobharvest_browser::BrowserActions;
use jobharvest_core::Platform;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::Instant;

/// When an adapter consults the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePolicy {
    /// Check once, on the first page of a paginated run
    FirstPageOnly,
    /// Check on every page and before every detail reveal
    EveryReveal,
}

impl ChallengePolicy {
    /// Whether page `page_number` (1-based) is checked on arrival.
    #[must_use]
    pub fn checks_page(self, page_number: u32) -> bool {
        match self {
            ChallengePolicy::FirstPageOnly => page_number <= 1,
            ChallengePolicy::EveryReveal => true,
        }
    }

    /// Whether each detail reveal is preceded by a check.
    #[must_use]
    pub fn checks_reveals(self) -> bool {
        self == ChallengePolicy::EveryReveal
    }
}

/// How a platform's challenge pages give themselves away, and what its
/// real content looks like.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeSignals {
    /// Challenge containers or frames
    pub selectors: &'static [&'static str],
    /// Lowercase phrases in visible text
    pub phrases: &'static [&'static str],
    /// Substrings of the location path
    pub path_fragments: &'static [&'static str],
    /// Selectors present once the board's content is back
    pub content_markers: &'static [&'static str],
}

impl ChallengeSignals {
    /// True if any challenge signal is present.
    #[must_use]
    pub fn is_challenged(&self, html: &str, url: &str) -> bool {
        if self.path_matches(url) {
            return true;
        }
        let document = Html::parse_document(html);
        any_selector(&document, self.selectors) || self.phrase_matches(&document)
    }

    /// True when no challenge signal is present and the board's content is.
    #[must_use]
    pub fn is_cleared(&self, html: &str, url: &str) -> bool {
        if self.path_matches(url) {
            return false;
        }
        let document = Html::parse_document(html);
        !any_selector(&document, self.selectors)
            && !self.phrase_matches(&document)
            && any_selector(&document, self.content_markers)
    }

    fn path_matches(&self, url: &str) -> bool {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| url.to_lowercase());
        self.path_fragments.iter().any(|f| path.contains(f))
    }

    fn phrase_matches(&self, document: &Html) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let text = visible_text(document).to_lowercase();
        self.phrases.iter().any(|p| text.contains(p))
    }
}

fn any_selector(document: &Html, selectors: &[&str]) -> bool {
    selectors
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .any(|selector| document.select(&selector).next().is_some())
}

fn visible_text(document: &Html) -> String {
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&body)
        .next()
        .map(|b| b.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Guard timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Challenge detector and resolution waiter bound to one page.
pub struct BotGuard<'a> {
    page: &'a dyn BrowserActions,
    signals: &'a ChallengeSignals,
    platform: Platform,
    config: GuardConfig,
}

impl<'a> BotGuard<'a> {
    pub fn new(
        page: &'a dyn BrowserActions,
        signals: &'a ChallengeSignals,
        platform: Platform,
        config: GuardConfig,
    ) -> Self {
        Self {
            page,
            signals,
            platform,
            config,
        }
    }

    /// Whether the page currently shows a challenge.
    pub async fn is_challenged(&self) -> Result<bool> {
        let url = self.page.current_url().await?;
        let html = self.page.content().await?;
        Ok(self.signals.is_challenged(&html, &url))
    }

    /// Suspend automation until a human clears the challenge.
    ///
    /// Returns `false` when the challenge outlives the timeout or the run is
    /// cancelled; the caller then ends the run with what it has.
    pub async fn await_resolution(&self, ctx: &RunContext) -> bool {
        tracing::warn!(
            platform = %self.platform,
            timeout = ?self.config.timeout,
            "Verification challenge detected, waiting for the user"
        );
        ctx.notify(Message::HideOverlay);
        ctx.notify(Message::VerificationRequired {
            platform: self.platform,
            message: format!(
                "{} is asking for verification. Complete it in the browser window; scraping resumes automatically.",
                self.platform
            ),
        });

        let cleared = self.poll_until_cleared(ctx).await;
        if cleared {
            ctx.notify(Message::VerificationCleared {
                platform: self.platform,
            });
        }
        // The overlay comes back whether or not the wait succeeded
        ctx.notify(Message::ShowOverlay);
        cleared
    }

    async fn poll_until_cleared(&self, ctx: &RunContext) -> bool {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            tokio::select! {
                () = ctx.cancellation().cancelled() => {
                    tracing::info!("Run cancelled while waiting for verification");
                    return false;
                }
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }

            match self.cleared().await {
                Ok(true) => {
                    tracing::info!(platform = %self.platform, "Verification cleared, resuming");
                    return true;
                }
                Ok(false) => {}
                // The user may be mid-navigation; keep polling
                Err(e) => tracing::debug!("Challenge poll failed: {}", e),
            }

            if Instant::now() >= deadline {
                tracing::warn!(platform = %self.platform, "Verification not cleared in time");
                return false;
            }
        }
    }

    async fn cleared(&self) -> Result<bool> {
        let url = self.page.current_url().await?;
        let html = self.page.content().await?;
        Ok(self.signals.is_cleared(&html, &url))
    }
}

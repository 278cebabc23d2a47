//! Panel synchronization.
//!
//! After a card is activated the detail panel renders asynchronously. The
//! synchronizer polls a probe with capped exponential backoff until the
//! panel is ready, the board signals rate limiting, or the attempt budget
//! runs out.

use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::time::Duration;

/// Content shorter than this is treated as a skeleton.
const MIN_CONTENT_CHARS: usize = 10;

/// State of the document as seen by one probe evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// Still loading, stale, or absent
    NotReady,
    /// Finished rendering
    Ready(T),
    /// The board is throttling requests
    RateLimited,
}

/// Result of [`wait_for_reveal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome<T> {
    /// The probe reported a ready container
    Revealed(T),
    /// The probe reported rate limiting
    RateLimited,
    /// The attempt budget ran out
    TimedOut,
}

/// Polling parameters, tuned per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub max_wait: Duration,
    pub settle: Duration,
    pub rate_limit_pause: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::with_attempts(20)
    }
}

impl SyncConfig {
    /// Default timings with a platform-specific attempt budget.
    #[must_use]
    pub const fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_wait: Duration::from_millis(200),
            max_wait: Duration::from_millis(3000),
            settle: Duration::from_millis(400),
            rate_limit_pause: Duration::from_millis(5000),
        }
    }

    /// Wait following `wait`.
    #[must_use]
    pub fn next_wait(&self, wait: Duration) -> Duration {
        (wait.saturating_mul(3) / 2).min(self.max_wait)
    }

    /// The waits slept between probe evaluations when the probe never
    /// becomes ready.
    #[must_use]
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let steps = self.max_attempts.saturating_sub(1) as usize;
        let mut waits = Vec::with_capacity(steps);
        let mut wait = self.initial_wait.min(self.max_wait);
        for _ in 0..steps {
            waits.push(wait);
            wait = self.next_wait(wait);
        }
        waits
    }
}

/// Poll `probe` until it reports a ready container or rate limiting, or
/// `max_attempts` evaluations have come back not ready.
///
/// `Revealed` is returned only after the settle delay, and `RateLimited`
/// only after the rate-limit pause. Probe errors propagate unchanged.
pub async fn wait_for_reveal<T, E, F, Fut>(
    config: &SyncConfig,
    mut probe: F,
) -> Result<RevealOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Readiness<T>, E>>,
{
    let mut wait = config.initial_wait.min(config.max_wait);
    let mut attempts = 0;

    loop {
        match probe().await? {
            Readiness::Ready(container) => {
                tokio::time::sleep(config.settle).await;
                return Ok(RevealOutcome::Revealed(container));
            }
            Readiness::RateLimited => {
                tracing::warn!(
                    "Rate limited while waiting for panel, pausing {:?}",
                    config.rate_limit_pause
                );
                tokio::time::sleep(config.rate_limit_pause).await;
                return Ok(RevealOutcome::RateLimited);
            }
            Readiness::NotReady => {}
        }

        attempts += 1;
        if attempts >= config.max_attempts {
            tracing::debug!(attempts, "Panel did not become ready");
            return Ok(RevealOutcome::TimedOut);
        }

        tokio::time::sleep(wait).await;
        wait = config.next_wait(wait);
    }
}

/// A rendered detail container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    /// Outer HTML of the container
    pub html: String,
    /// Whitespace-normalized text, used to tell a fresh panel from the
    /// previous job's
    pub fingerprint: String,
}

/// Where a platform renders its detail panel and how it signals loading
/// and throttling.
#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    /// Preferred container
    pub primary: &'static str,
    /// Containers tried only when the primary is absent
    pub alternates: &'static [&'static str],
    /// Any match inside the container means still loading
    pub loading: &'static [&'static str],
    /// Page text fragments (lowercase) meaning the board is throttling
    pub rate_limit_phrases: &'static [&'static str],
}

impl PanelSpec {
    /// Evaluate the panel against the current document.
    ///
    /// `previous` is the fingerprint of the last revealed panel; an
    /// identical panel has not been replaced yet and is not ready.
    #[must_use]
    pub fn probe(&self, html: &str, previous: Option<&str>) -> Readiness<Panel> {
        let document = Html::parse_document(html);

        let container = self.container(&document);
        if self.is_rate_limited(&document, container) {
            return Readiness::RateLimited;
        }

        let Some(container) = container else {
            return Readiness::NotReady;
        };

        if self.loading.iter().any(|css| has_match(container, css)) {
            return Readiness::NotReady;
        }

        let fingerprint = fingerprint(container);
        if fingerprint.chars().count() <= MIN_CONTENT_CHARS {
            return Readiness::NotReady;
        }
        if previous == Some(fingerprint.as_str()) {
            return Readiness::NotReady;
        }

        Readiness::Ready(Panel {
            html: container.html(),
            fingerprint,
        })
    }

    fn container<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        std::iter::once(self.primary)
            .chain(self.alternates.iter().copied())
            .filter_map(|css| Selector::parse(css).ok())
            .find_map(|selector| document.select(&selector).next())
    }

    /// Throttling notices live outside the panel; a posting that merely
    /// mentions a phrase does not count.
    fn is_rate_limited(&self, document: &Html, container: Option<ElementRef<'_>>) -> bool {
        if self.rate_limit_phrases.is_empty() {
            return false;
        }
        let text = document
            .root_element()
            .descendants()
            .filter(|node| {
                container.map_or(true, |c| !node.ancestors().any(|a| a.id() == c.id()))
            })
            .filter_map(|node| node.value().as_text().map(|t| &**t))
            .collect::<String>()
            .to_lowercase();
        self.rate_limit_phrases.iter().any(|p| text.contains(p))
    }
}

fn has_match(element: ElementRef<'_>, css: &str) -> bool {
    Selector::parse(css)
        .map(|selector| element.select(&selector).next().is_some())
        .unwrap_or(false)
}

fn fingerprint(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

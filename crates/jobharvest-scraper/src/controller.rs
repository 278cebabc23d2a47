//! Click-and-scrape iteration.
//!
//! A run visits the cards of the current listing page in discovery order:
//! activate the card, wait for its detail panel, extract it with the card
//! as per-field fallback, report progress and pace itself. Nothing in here
//! aborts a run on a per-card failure; the worst case for a titled card is
//! a record built from the card alone.

use crate::adapters::{classify, BoardAdapter, DiscoveredCard};
use crate::context::{Delivery, RunContext};
use crate::error::{Result, ScrapeError};
use crate::guard::{BotGuard, GuardConfig};
use crate::messages::{Message, StopReason};
use crate::pagination::Cursor;
use crate::sync::{wait_for_reveal, Panel, Readiness, RevealOutcome};
use jobharvest_browser::BrowserActions;
use jobharvest_core::{Job, Platform, RunId, ScrapingConfig};
use std::time::Duration;
use tracing::Instrument;
use url::Url;

/// Run-level settings, independent of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Lowers the platform card cap when set
    pub max_cards: Option<usize>,
    /// Pause after a card fails unexpectedly
    pub error_recovery_delay: Duration,
    pub guard: GuardConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_cards: None,
            error_recovery_delay: Duration::from_millis(1500),
            guard: GuardConfig::default(),
        }
    }
}

impl From<&ScrapingConfig> for ControllerConfig {
    fn from(config: &ScrapingConfig) -> Self {
        Self {
            max_cards: config.max_cards,
            error_recovery_delay: Duration::from_millis(config.error_recovery_delay_ms),
            guard: GuardConfig {
                poll_interval: Duration::from_secs(config.challenge_poll_interval_secs),
                timeout: Duration::from_secs(config.challenge_timeout_secs),
            },
        }
    }
}

impl ControllerConfig {
    /// Same settings with a per-request card limit; `None` keeps the
    /// configured one.
    #[must_use]
    pub fn with_max_cards(mut self, max_cards: Option<usize>) -> Self {
        if max_cards.is_some() {
            self.max_cards = max_cards;
        }
        self
    }

    /// Cards visited on a page, never more than the platform allows.
    #[must_use]
    pub fn card_limit(&self, platform_cap: usize) -> usize {
        self.max_cards.map_or(platform_cap, |n| n.min(platform_cap))
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    /// Records in discovery order; a pre-opened detail comes first
    pub jobs: Vec<Job>,
    pub next_cursor: Option<Cursor>,
    /// Set when the run ended before visiting every card
    pub stop_reason: Option<StopReason>,
    /// Cards present on the page(s), including ones beyond the cap
    pub cards_found: usize,
}

impl RunOutcome {
    /// The `SCRAPING_RESULT` message for this outcome.
    #[must_use]
    pub fn into_message(self, run_id: RunId, platform: Platform) -> Message {
        Message::ScrapingResult {
            run_id,
            platform,
            jobs: self.jobs,
            next_cursor: self.next_cursor,
            error: None,
            stop_reason: self.stop_reason,
        }
    }
}

/// Serve a `START_SCRAPING` request against whatever the page shows.
pub async fn handle_start(
    page: &dyn BrowserActions,
    ctx: &RunContext,
    config: &ControllerConfig,
    max_cards: Option<usize>,
) -> Result<Message> {
    let url = page.current_url().await?;
    let adapter = classify(&url).ok_or(ScrapeError::UnsupportedPage { url })?;
    let config = config.with_max_cards(max_cards);
    let outcome = adapter.scrape_list(page, ctx, &config).await;
    Ok(outcome.into_message(ctx.run_id().clone(), adapter.platform()))
}

/// Scrape the cards of the current listing page.
///
/// Never fails: early exits are reported through
/// [`RunOutcome::stop_reason`] together with the records gathered so far.
pub async fn run(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    ctx: &RunContext,
    config: &ControllerConfig,
) -> RunOutcome {
    let span = tracing::info_span!(
        "scrape_run",
        run_id = %ctx.run_id(),
        platform = %adapter.platform(),
        page = ctx.page_number()
    );
    scrape_page(adapter, page, ctx, config).instrument(span).await
}

/// Scrape up to `max_pages` pages, following next-page cursors.
pub async fn run_pages(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    ctx: &mut RunContext,
    config: &ControllerConfig,
    max_pages: u32,
) -> RunOutcome {
    let mut total = RunOutcome::default();

    loop {
        let outcome = run(adapter, page, ctx, config).await;
        total.jobs.extend(outcome.jobs);
        total.cards_found += outcome.cards_found;
        total.next_cursor = outcome.next_cursor;
        total.stop_reason = outcome.stop_reason;

        if total.stop_reason.is_some() || ctx.page_number() >= max_pages.max(1) {
            break;
        }
        let Some(cursor) = total.next_cursor.clone() else {
            tracing::info!(pages = ctx.page_number(), "No further pages");
            break;
        };

        tracing::info!(page = ctx.page_number() + 1, "Following next page");
        if let Err(e) = follow(page, &cursor).await {
            tracing::warn!("Could not follow next page: {}", e);
            break;
        }
        ctx.advance_page();

        if let Err(e) = wait_for_cards(adapter, page).await {
            tracing::warn!("Next page did not settle: {}", e);
        }
    }

    total
}

/// Scrape a standalone posting page.
pub async fn scrape_detail(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    ctx: &RunContext,
    config: &ControllerConfig,
) -> Result<Job> {
    let platform = adapter.platform();
    let guard = BotGuard::new(page, &adapter.profile().challenge, platform, config.guard);
    if guard.is_challenged().await? && !guard.await_resolution(ctx).await {
        return Err(ScrapeError::NothingExtracted {
            platform,
            reason: "verification challenge was not cleared".to_string(),
        });
    }

    if let RevealOutcome::TimedOut = reveal(adapter, page, None).await? {
        tracing::debug!("No detail container found, reading the whole document");
    }

    let page_url = current_url(page).await?;
    let html = page.content().await?;
    let draft = adapter.detail_page(&html, &page_url);
    adapter.build(draft).ok_or(ScrapeError::NothingExtracted {
        platform,
        reason: "posting lacks title, company or URL".to_string(),
    })
}

/// Result of one card.
enum Step {
    /// The card's record, if one could be built
    Record(Option<Job>),
    /// End the run
    Stop(StopReason),
}

async fn scrape_page(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    ctx: &RunContext,
    config: &ControllerConfig,
) -> RunOutcome {
    let profile = adapter.profile();
    let platform = adapter.platform();
    let guard = BotGuard::new(page, &profile.challenge, platform, config.guard);
    let mut outcome = RunOutcome::default();

    if profile.challenge_policy.checks_page(ctx.page_number()) {
        let challenged = guard.is_challenged().await.unwrap_or_else(|e| {
            tracing::warn!("Challenge check failed: {}", e);
            false
        });
        if challenged && !guard.await_resolution(ctx).await {
            outcome.stop_reason = Some(unresolved(ctx));
            return outcome;
        }
    }

    let (html, page_url) = match read_document(page).await {
        Ok(document) => document,
        Err(e) => {
            tracing::error!("Could not read the listing page: {}", e);
            return outcome;
        }
    };

    let cards = adapter.extract_cards(&html, &page_url);
    outcome.cards_found = cards.len();
    let total = cards.len().min(config.card_limit(profile.card_cap));
    tracing::info!(found = cards.len(), total, "Cards discovered");

    let mut previous: Option<String> = None;
    let mut opened_key: Option<String> = None;
    if let Some(open) = adapter.open_detail(&html, &page_url) {
        tracing::debug!(key = %open.key, "Scraping the already open detail view first");
        let mut draft = open.draft;
        if let Some(card) = cards.iter().find(|c| c.key.as_deref() == Some(open.key.as_str())) {
            draft.fill_from(&card.snapshot);
        }
        outcome.jobs.extend(adapter.build(draft));
        previous = Some(open.fingerprint);
        opened_key = Some(open.key);
    }

    for (index, card) in cards.iter().take(total).enumerate() {
        if ctx.is_cancelled() {
            tracing::info!("Run cancelled");
            outcome.stop_reason = Some(StopReason::Cancelled);
            break;
        }
        let live = if card.snapshot.has_title() {
            None
        } else {
            refresh_card(adapter, page, card, index).await
        };
        let card = live.as_ref().unwrap_or(card);
        if !card.snapshot.has_title() {
            tracing::debug!(index, "Skipping card without title");
            continue;
        }
        if opened_key.is_some() && card.key == opened_key {
            tracing::debug!(index, "Card already scraped from the open detail view");
            continue;
        }

        let delay = match scrape_card(adapter, page, ctx, &guard, card, &mut previous).await {
            Ok(Step::Record(job)) => {
                outcome.jobs.extend(job);
                profile.pacing.delay(index)
            }
            Ok(Step::Stop(reason)) => {
                outcome.stop_reason = Some(reason);
                break;
            }
            Err(e) => {
                tracing::error!(index, card = %card.target, "Card failed: {}", e);
                outcome.jobs.extend(adapter.build(card.snapshot.to_draft()));
                config.error_recovery_delay
            }
        };

        let progress = Message::ScrapingProgress {
            platform,
            current: index + 1,
            total,
            jobs_found: outcome.jobs.len(),
        };
        if ctx.notify(progress) == Delivery::Closed {
            tracing::warn!("Controller went away, returning partial results");
            outcome.stop_reason = Some(StopReason::ControllerClosed);
            break;
        }

        tokio::select! {
            () = ctx.cancellation().cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }

    if outcome.stop_reason.is_none() {
        outcome.next_cursor = match read_document(page).await {
            Ok((html, url)) => adapter.next_cursor(&html, &url, outcome.cards_found),
            Err(e) => {
                tracing::warn!("Could not resolve the next page: {}", e);
                None
            }
        };
    }

    tracing::info!(
        jobs = outcome.jobs.len(),
        stop_reason = ?outcome.stop_reason,
        "Run finished"
    );
    outcome
}

async fn scrape_card(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    ctx: &RunContext,
    guard: &BotGuard<'_>,
    card: &DiscoveredCard,
    previous: &mut Option<String>,
) -> Result<Step> {
    if adapter.profile().challenge_policy.checks_reveals()
        && guard.is_challenged().await?
        && !guard.await_resolution(ctx).await
    {
        return Ok(Step::Stop(unresolved(ctx)));
    }

    tracing::debug!(card = %card.target, title = %card.snapshot.title, "Revealing card");
    page.scroll_into_view(&card.target).await?;
    page.click(&card.target).await?;
    let mut revealed = reveal(adapter, page, previous.as_deref()).await?;

    if matches!(revealed, RevealOutcome::RateLimited) && guard.is_challenged().await? {
        if !guard.await_resolution(ctx).await {
            return Ok(Step::Stop(unresolved(ctx)));
        }
        tracing::debug!(card = %card.target, "Retrying reveal after verification");
        page.click(&card.target).await?;
        revealed = reveal(adapter, page, previous.as_deref()).await?;
    }

    let draft = match revealed {
        RevealOutcome::Revealed(panel) => {
            let page_url = current_url(page).await?;
            let mut draft = adapter.extract_detail(&panel.html, &page_url);
            *previous = Some(panel.fingerprint);
            draft.fill_from(&card.snapshot);
            if draft.is_viable() {
                draft
            } else {
                tracing::warn!(card = %card.target, "Detail view incomplete, using card");
                card.snapshot.to_draft()
            }
        }
        RevealOutcome::RateLimited => {
            tracing::warn!(card = %card.target, "Rate limited, using card");
            card.snapshot.to_draft()
        }
        RevealOutcome::TimedOut => {
            tracing::warn!(card = %card.target, "Detail view never loaded, using card");
            card.snapshot.to_draft()
        }
    };

    Ok(Step::Record(adapter.build(draft)))
}

/// Scroll a placeholder card into view and scan it again once rendered.
async fn refresh_card(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    card: &DiscoveredCard,
    index: usize,
) -> Option<DiscoveredCard> {
    let scanned = async {
        page.scroll_into_view(&card.target).await?;
        let (html, url) = read_document(page).await?;
        Ok::<_, ScrapeError>(adapter.extract_cards(&html, &url).into_iter().nth(index))
    };
    match scanned.await {
        Ok(live) => live,
        Err(e) => {
            tracing::warn!(index, card = %card.target, "Could not rescan card: {}", e);
            None
        }
    }
}

/// Wait for the detail container to differ from `previous`.
async fn reveal(
    adapter: &dyn BoardAdapter,
    page: &dyn BrowserActions,
    previous: Option<&str>,
) -> Result<RevealOutcome<Panel>> {
    let sync = adapter.profile().sync;
    wait_for_reveal(&sync, move || async move {
        let html = page.content().await?;
        Ok::<_, ScrapeError>(adapter.probe_detail(&html, previous))
    })
    .await
}

/// Wait until a freshly loaded page lists cards.
async fn wait_for_cards(adapter: &dyn BoardAdapter, page: &dyn BrowserActions) -> Result<()> {
    let sync = adapter.profile().sync;
    let outcome = wait_for_reveal(&sync, move || async move {
        let (html, url) = read_document(page).await?;
        Ok::<_, ScrapeError>(if adapter.extract_cards(&html, &url).is_empty() {
            Readiness::NotReady
        } else {
            Readiness::Ready(())
        })
    })
    .await?;
    if let RevealOutcome::TimedOut = outcome {
        tracing::debug!("No cards appeared on the next page");
    }
    Ok(())
}

async fn follow(page: &dyn BrowserActions, cursor: &Cursor) -> Result<()> {
    match cursor {
        Cursor::Navigate(url) => page.navigate(url).await?,
        Cursor::Activate(target) => {
            page.scroll_into_view(target).await?;
            page.click(target).await?;
        }
    }
    Ok(())
}

async fn read_document(page: &dyn BrowserActions) -> Result<(String, Url)> {
    let url = current_url(page).await?;
    let html = page.content().await?;
    Ok((html, url))
}

async fn current_url(page: &dyn BrowserActions) -> Result<Url> {
    let url = page.current_url().await?;
    Url::parse(&url).map_err(|e| ScrapeError::InvalidUrl {
        reason: e.to_string(),
        url,
    })
}

fn unresolved(ctx: &RunContext) -> StopReason {
    if ctx.is_cancelled() {
        StopReason::Cancelled
    } else {
        StopReason::ChallengeUnresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_scraping_section() {
        let scraping = ScrapingConfig {
            max_cards: Some(10),
            error_recovery_delay_ms: 2000,
            challenge_poll_interval_secs: 5,
            challenge_timeout_secs: 120,
            ..ScrapingConfig::default()
        };
        let config = ControllerConfig::from(&scraping);
        assert_eq!(config.max_cards, Some(10));
        assert_eq!(config.error_recovery_delay, Duration::from_millis(2000));
        assert_eq!(config.guard.poll_interval, Duration::from_secs(5));
        assert_eq!(config.guard.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_card_limit_never_exceeds_platform_cap() {
        let config = ControllerConfig::default();
        assert_eq!(config.card_limit(25), 25);
        assert_eq!(config.with_max_cards(Some(5)).card_limit(25), 5);
        assert_eq!(config.with_max_cards(Some(100)).card_limit(30), 30);
        assert_eq!(
            config.with_max_cards(Some(5)).with_max_cards(None).card_limit(30),
            5
        );
    }
}

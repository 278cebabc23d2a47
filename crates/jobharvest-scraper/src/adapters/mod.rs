//! Platform adapters.
//!
//! Every board is described by a [`BoardAdapter`]: its locators, timings and
//! challenge policy, plus the platform-specific clean-up of what the
//! locators find. Adapters only ever see HTML strings; the controller owns
//! the live page.
//!
//! [`PlatformAdapter`] is the closed set of supported boards, resolved once
//! per run by [`classify`].

pub mod common;
pub mod indeed;
pub mod linkedin;
pub mod seek;

pub use common::{resolve_url, DiscoveredCard};
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;
pub use seek::SeekAdapter;

use crate::context::RunContext;
use crate::controller::{self, ControllerConfig, RunOutcome};
use crate::error::Result;
use crate::guard::{ChallengePolicy, ChallengeSignals};
use crate::pacing::Pacing;
use crate::pagination::{Cursor, PaginationSpec};
use crate::sync::{Panel, PanelSpec, Readiness, SyncConfig};
use jobharvest_browser::BrowserActions;
use jobharvest_core::{Job, JobDraft, Platform};
use url::Url;

/// Static tuning of one platform.
#[derive(Debug, Clone, Copy)]
pub struct AdapterProfile {
    /// Most cards visited on one page
    pub card_cap: usize,
    pub sync: SyncConfig,
    pub pacing: Pacing,
    pub challenge_policy: ChallengePolicy,
    pub challenge: ChallengeSignals,
    pub panel: PanelSpec,
    pub pagination: PaginationSpec,
}

/// A detail view that was already open when the run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDetail {
    pub draft: JobDraft,
    /// Job ID of the open posting
    pub key: String,
    /// Panel fingerprint, so the first reveal is not mistaken for it
    pub fingerprint: String,
}

/// Capability set of one job board.
pub trait BoardAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether this adapter handles pages at `url`.
    fn matches(&self, url: &Url) -> bool;

    fn profile(&self) -> &'static AdapterProfile;

    /// Every list card on the page, in document order. Cards without a
    /// title are included; the controller skips them.
    fn extract_cards(&self, html: &str, page_url: &Url) -> Vec<DiscoveredCard>;

    /// Fields of a rendered detail view (panel or full page).
    fn extract_detail(&self, html: &str, page_url: &Url) -> JobDraft;

    /// Job ID carried by a posting URL.
    fn job_key(&self, job_url: &str) -> Option<String>;

    /// Job ID of the posting selected in a split list/detail view.
    fn selected_key(&self, page_url: &Url) -> Option<String>;

    /// Canonical posting URL for a job ID.
    fn canonical_job_url(&self, key: &str, page_url: &Url) -> String;

    fn probe_detail(&self, html: &str, previous: Option<&str>) -> Readiness<Panel> {
        self.profile().panel.probe(html, previous)
    }

    fn next_cursor(&self, html: &str, page_url: &Url, cards_found: usize) -> Option<Cursor> {
        self.profile()
            .pagination
            .next_cursor(html, page_url, cards_found)
    }

    /// The detail view open at run start, if the page shows one.
    fn open_detail(&self, html: &str, page_url: &Url) -> Option<OpenDetail> {
        let key = self.selected_key(page_url)?;
        let Readiness::Ready(panel) = self.probe_detail(html, None) else {
            return None;
        };
        let mut draft = self.extract_detail(&panel.html, page_url);
        if draft.job_url.is_empty() {
            draft.job_url = self.canonical_job_url(&key, page_url);
        }
        Some(OpenDetail {
            draft,
            key,
            fingerprint: panel.fingerprint,
        })
    }

    /// Fields of a standalone posting page.
    fn detail_page(&self, html: &str, page_url: &Url) -> JobDraft {
        let mut draft = self.extract_detail(html, page_url);
        if draft.job_url.is_empty() {
            draft.job_url = self
                .job_key(page_url.as_str())
                .or_else(|| self.selected_key(page_url))
                .map(|key| self.canonical_job_url(&key, page_url))
                .or_else(|| resolve_url(page_url, page_url.as_str()))
                .unwrap_or_default();
        }
        draft
    }

    /// Build a record through this platform's factory.
    fn build(&self, draft: JobDraft) -> Option<Job> {
        Job::for_platform(self.platform(), draft)
    }
}

/// The supported boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformAdapter {
    LinkedIn(LinkedInAdapter),
    Seek(SeekAdapter),
    Indeed(IndeedAdapter),
}

/// Resolve the adapter for the page at `url`.
#[must_use]
pub fn classify(url: &str) -> Option<PlatformAdapter> {
    let parsed = Url::parse(url).ok()?;
    Platform::ALL
        .into_iter()
        .map(PlatformAdapter::for_platform)
        .find(|adapter| adapter.board().matches(&parsed))
}

impl PlatformAdapter {
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::LinkedIn => PlatformAdapter::LinkedIn(LinkedInAdapter),
            Platform::Seek => PlatformAdapter::Seek(SeekAdapter),
            Platform::Indeed => PlatformAdapter::Indeed(IndeedAdapter),
        }
    }

    #[must_use]
    pub fn board(&self) -> &dyn BoardAdapter {
        match self {
            PlatformAdapter::LinkedIn(a) => a,
            PlatformAdapter::Seek(a) => a,
            PlatformAdapter::Indeed(a) => a,
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.board().platform()
    }

    /// Whether this adapter handles pages at `url`.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|u| self.board().matches(&u))
    }

    /// Scrape the cards of the current listing page.
    pub async fn scrape_list(
        &self,
        page: &dyn BrowserActions,
        ctx: &RunContext,
        config: &ControllerConfig,
    ) -> RunOutcome {
        controller::run(self.board(), page, ctx, config).await
    }

    /// Scrape the posting the page currently shows on its own.
    pub async fn scrape_detail(
        &self,
        page: &dyn BrowserActions,
        ctx: &RunContext,
        config: &ControllerConfig,
    ) -> Result<Job> {
        controller::scrape_detail(self.board(), page, ctx, config).await
    }
}

/// `host` is `domain` or one of its subdomains.
pub(crate) fn host_is(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|host| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let cases = [
            ("https://www.linkedin.com/jobs/search/?keywords=rust", Some(Platform::LinkedIn)),
            ("https://www.linkedin.com/jobs/view/3912345678/", Some(Platform::LinkedIn)),
            ("https://www.seek.com.au/rust-jobs/in-All-Sydney-NSW", Some(Platform::Seek)),
            ("https://www.seek.co.nz/job/81234567", Some(Platform::Seek)),
            ("https://au.indeed.com/jobs?q=rust&l=Sydney", Some(Platform::Indeed)),
            ("https://www.indeed.com/viewjob?jk=abc123", Some(Platform::Indeed)),
            ("https://www.linkedin.com/feed/", None),
            ("https://notindeed.com/jobs", None),
            ("not a url", None),
        ];
        for (url, expected) in cases {
            assert_eq!(classify(url).map(|a| a.platform()), expected, "{url}");
        }
    }

    #[test]
    fn test_matches() {
        let adapter = PlatformAdapter::for_platform(Platform::Seek);
        assert!(adapter.matches("https://www.seek.com.au/jobs"));
        assert!(!adapter.matches("https://au.indeed.com/jobs"));
    }

    #[test]
    fn test_profiles_respect_policy() {
        let linkedin = PlatformAdapter::for_platform(Platform::LinkedIn);
        let seek = PlatformAdapter::for_platform(Platform::Seek);
        let indeed = PlatformAdapter::for_platform(Platform::Indeed);

        assert_eq!(linkedin.board().profile().card_cap, 25);
        assert_eq!(seek.board().profile().card_cap, 30);
        assert_eq!(indeed.board().profile().card_cap, 30);

        assert_eq!(
            linkedin.board().profile().challenge_policy,
            ChallengePolicy::FirstPageOnly
        );
        assert_eq!(seek.board().profile().challenge_policy, ChallengePolicy::FirstPageOnly);
        assert_eq!(indeed.board().profile().challenge_policy, ChallengePolicy::EveryReveal);

        for adapter in [linkedin, seek, indeed] {
            let profile = adapter.board().profile();
            assert!((15..=30).contains(&profile.sync.max_attempts));
            let (lo, hi) = profile.pacing.bounds();
            assert!(lo >= std::time::Duration::from_millis(300));
            assert!(hi <= std::time::Duration::from_millis(2500));
        }
    }
}

//! SEEK (Australia and New Zealand).
//!
//! SEEK marks almost everything with `data-automation` attributes, which
//! are far more stable than its generated class names.

use super::common::{first_attr, query_param, with_root, CardSpec, DetailSpec, DiscoveredCard};
use super::{host_is, AdapterProfile, BoardAdapter};
use crate::guard::{ChallengePolicy, ChallengeSignals};
use crate::pacing::Pacing;
use crate::pagination::{OffsetStep, PaginationSpec};
use crate::sync::{PanelSpec, SyncConfig};
use jobharvest_core::{JobDraft, Platform};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

static PROFILE: AdapterProfile = AdapterProfile {
    card_cap: 30,
    sync: SyncConfig::with_attempts(20),
    pacing: Pacing::Jittered {
        base: Duration::from_millis(800),
        jitter: Duration::from_millis(700),
    },
    challenge_policy: ChallengePolicy::FirstPageOnly,
    challenge: ChallengeSignals {
        selectors: &[
            "#challenge-form",
            "#cf-challenge-running",
            "iframe[src*='challenges.cloudflare.com']",
            "#px-captcha",
        ],
        phrases: &["verify you are human", "checking your browser", "press & hold"],
        path_fragments: &["/cdn-cgi/challenge-platform"],
        content_markers: &[
            "[data-automation='searchResults']",
            "article[data-card-type='JobCard']",
            "[data-automation='jobDetailsPage']",
        ],
    },
    panel: PanelSpec {
        primary: "[data-automation='jobDetailsPage']",
        alternates: &[
            "[data-automation='splitViewJobDetailsWrapper']",
            "[data-automation='jobDetailsPanel']",
        ],
        loading: &[
            "[data-automation='loading-spinner']",
            "[data-automation='jobDetailsLoading']",
            "[aria-busy='true']",
        ],
        rate_limit_phrases: &["too many requests"],
    },
    pagination: PaginationSpec {
        next_controls: &["a[data-automation='page-next']", "a[aria-label='Next']"],
        page_state: &["[data-automation='pagination-summary']"],
        offset_param: "page",
        step: OffsetStep::PageNumber,
    },
};

const CARDS: CardSpec = CardSpec {
    containers: &[
        "article[data-card-type='JobCard']",
        "article[data-testid='job-card']",
        "[data-automation='normalJob']",
    ],
    title_link: &["a[data-automation='jobTitle']"],
    title: &[],
    id_link: "a[href*='/job/']",
    company: &[
        "a[data-automation='jobCompany']",
        "span[data-automation='jobCompany']",
    ],
    location: &[
        "a[data-automation='jobLocation']",
        "span[data-automation='jobLocation']",
        "[data-automation='jobCardLocation']",
    ],
    salary: &["span[data-automation='jobSalary']"],
    posted: &["span[data-automation='jobListingDate']"],
    logo: &[
        "[data-automation='company-logo'] img",
        "img[data-automation='company-logo']",
    ],
    workplace: &[
        "[data-testid='work-arrangement']",
        "[data-automation='jobCardWorkArrangement']",
    ],
};

const DETAIL: DetailSpec = DetailSpec {
    title: &["[data-automation='job-detail-title']", "h1"],
    title_link: &["a[data-automation='job-detail-title']"],
    company: &["[data-automation='advertiser-name']"],
    location: &["[data-automation='job-detail-location']"],
    description: &["[data-automation='jobAdDetails']"],
    salary: &["[data-automation='job-detail-salary']"],
    posted: &["[data-automation='job-detail-date']"],
    job_type: &["[data-automation='job-detail-work-type']"],
    applicants: &[],
    workplace: &[
        "[data-automation='job-detail-workplace']",
        "[data-automation='job-detail-work-arrangements']",
    ],
    logo: &[
        "[data-testid='bx-logo-image'] img",
        "[data-automation='advertiser-logo'] img",
    ],
};

fn job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/job/(\d+)").expect("valid regex"))
}

/// SEEK adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekAdapter;

impl BoardAdapter for SeekAdapter {
    fn platform(&self) -> Platform {
        Platform::Seek
    }

    fn matches(&self, url: &Url) -> bool {
        host_is(url, "seek.com.au") || host_is(url, "seek.co.nz")
    }

    fn profile(&self) -> &'static AdapterProfile {
        &PROFILE
    }

    fn extract_cards(&self, html: &str, page_url: &Url) -> Vec<DiscoveredCard> {
        CARDS.scan(html, page_url, |raw| {
            let key = raw
                .element
                .value()
                .attr("data-job-id")
                .map(str::to_string)
                .or_else(|| raw.href.as_deref().and_then(|h| self.job_key(h)));

            let mut snapshot = raw.snapshot;
            if let Some(key) = &key {
                snapshot.job_url = self.canonical_job_url(key, page_url);
            }
            DiscoveredCard {
                snapshot,
                target: raw.target,
                key,
            }
        })
    }

    fn extract_detail(&self, html: &str, page_url: &Url) -> JobDraft {
        with_root(html, |root| {
            let mut draft = DETAIL.extract(root, page_url);
            // The split view links the posting from its title or a share link
            let key = self.job_key(&draft.job_url).or_else(|| {
                first_attr(root, &["a[href*='/job/']"], "href").and_then(|h| self.job_key(&h))
            });
            if let Some(key) = key {
                draft.job_url = self.canonical_job_url(&key, page_url);
            }
            draft
        })
    }

    fn job_key(&self, job_url: &str) -> Option<String> {
        job_id_pattern()
            .captures(job_url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| query_param(job_url, "jobId"))
    }

    fn selected_key(&self, page_url: &Url) -> Option<String> {
        query_param(page_url.as_str(), "jobId")
    }

    fn canonical_job_url(&self, key: &str, page_url: &Url) -> String {
        let host = page_url.host_str().unwrap_or("www.seek.com.au");
        format!("https://{host}/job/{key}")
    }
}

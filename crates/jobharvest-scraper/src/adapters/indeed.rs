//! Indeed (all regional hosts).
//!
//! Indeed challenges aggressively and at any point in a run, so the guard
//! runs before every reveal. Cards link through tracking redirects; the job
//! key (`jk`) is the only stable identifier.

use super::common::{
    all_texts, first_attr, is_job_type, is_salary, query_param, with_root, CardSpec,
    DetailSpec, DiscoveredCard,
};
use super::{host_is, AdapterProfile, BoardAdapter};
use crate::guard::{ChallengePolicy, ChallengeSignals};
use crate::pacing::Pacing;
use crate::pagination::{OffsetStep, PaginationSpec};
use crate::sync::{PanelSpec, SyncConfig};
use jobharvest_core::{JobDraft, Platform, WorkplaceType};
use std::time::Duration;
use url::Url;

static PROFILE: AdapterProfile = AdapterProfile {
    card_cap: 30,
    sync: SyncConfig::with_attempts(15),
    pacing: Pacing::Jittered {
        base: Duration::from_millis(1000),
        jitter: Duration::from_millis(1500),
    },
    challenge_policy: ChallengePolicy::EveryReveal,
    challenge: ChallengeSignals {
        selectors: &[
            "#challenge-form",
            "#cf-challenge-running",
            "iframe[src*='challenges.cloudflare.com']",
            "iframe[src*='hcaptcha.com']",
            "#px-captcha",
            "form[action*='captcha']",
        ],
        phrases: &[
            "verify you are human",
            "additional verification required",
            "checking if the site connection is secure",
        ],
        path_fragments: &["/cdn-cgi/", "/captcha", "/blocked"],
        content_markers: &[
            "#mosaic-jobResults",
            "div.job_seen_beacon",
            "#jobsearch-ViewjobPaneWrapper",
            "#jobDescriptionText",
        ],
    },
    panel: PanelSpec {
        primary: "#jobsearch-ViewjobPaneWrapper",
        alternates: &[
            ".jobsearch-RightPane",
            "#vjs-container",
            ".jobsearch-ViewJobLayout-jobDisplay",
        ],
        loading: &[
            ".jobsearch-ViewJobSkeleton",
            ".jobsearch-JobComponent-skeleton",
            "#vjs-loading",
            "[aria-busy='true']",
        ],
        rate_limit_phrases: &["too many requests", "unusual traffic"],
    },
    pagination: PaginationSpec {
        next_controls: &[
            "a[data-testid='pagination-page-next']",
            "a[aria-label='Next Page']",
            "a[aria-label='Next']",
        ],
        page_state: &["[data-testid='pagination-page-state']", "#searchCountPages"],
        offset_param: "start",
        step: OffsetStep::RecordsFromCards,
    },
};

const CARDS: CardSpec = CardSpec {
    containers: &["div.job_seen_beacon", "div.cardOutline", "div.result"],
    title_link: &["h2.jobTitle a", "a.jcs-JobTitle"],
    title: &["h2.jobTitle span[title]", "h2.jobTitle span"],
    id_link: "a[data-jk]",
    company: &["[data-testid='company-name']", "span.companyName"],
    location: &["[data-testid='text-location']", "div.companyLocation"],
    salary: &[
        ".salary-snippet-container",
        "[data-testid='attribute_snippet_testid'].salary-snippet-container",
        ".estimated-salary",
    ],
    posted: &["span.date", "[data-testid='myJobsStateDate']"],
    logo: &["img.companyAvatar", "[data-testid='companyAvatar'] img"],
    workplace: &["[data-testid='attribute_snippet_testid']", ".remote-badge"],
};

const DETAIL: DetailSpec = DetailSpec {
    title: &[
        "[data-testid='jobsearch-JobInfoHeader-title']",
        "h2.jobsearch-JobInfoHeader-title",
        "h1.jobsearch-JobInfoHeader-title",
    ],
    title_link: &[],
    company: &[
        "[data-testid='inlineHeader-companyName']",
        "[data-company-name='true']",
        "div.jobsearch-CompanyInfoContainer a",
    ],
    location: &[
        "[data-testid='inlineHeader-companyLocation']",
        "[data-testid='job-location']",
        "[data-testid='jobsearch-JobInfoHeader-companyLocation']",
    ],
    description: &["#jobDescriptionText"],
    salary: &[],
    posted: &[],
    job_type: &[],
    applicants: &[],
    workplace: &[],
    logo: &[".jobsearch-JobInfoHeader-logo img", "img.jobsearch-CompanyAvatar-image"],
};

/// Pay and employment-type lines under the detail header
const ATTRIBUTES: &[&str] = &[
    "#salaryInfoAndJobType span",
    "[data-testid='jobsearch-OtherJobDetailsContainer'] span",
];

/// Indeed adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndeedAdapter;

impl BoardAdapter for IndeedAdapter {
    fn platform(&self) -> Platform {
        Platform::Indeed
    }

    fn matches(&self, url: &Url) -> bool {
        host_is(url, "indeed.com")
    }

    fn profile(&self) -> &'static AdapterProfile {
        &PROFILE
    }

    fn extract_cards(&self, html: &str, page_url: &Url) -> Vec<DiscoveredCard> {
        CARDS.scan(html, page_url, |raw| {
            let key = first_attr(raw.element, &["a[data-jk]", "[data-jk]"], "data-jk")
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
            for attribute in all_texts(root, ATTRIBUTES) {
                let attribute = attribute.trim_start_matches('-').trim().to_string();
                if draft.salary.is_empty() && is_salary(&attribute) {
                    draft.salary = attribute;
                } else if draft.job_type.is_empty() && is_job_type(&attribute) {
                    draft.job_type = attribute;
                }
            }
            if !draft.workplace_type.is_specified() {
                draft.workplace_type = WorkplaceType::infer(&draft.location);
            }
            draft
        })
    }

    fn job_key(&self, job_url: &str) -> Option<String> {
        let absolute = Url::parse("https://www.indeed.com/")
            .ok()?
            .join(job_url)
            .ok()?;
        query_param(absolute.as_str(), "jk").or_else(|| query_param(absolute.as_str(), "vjk"))
    }

    fn selected_key(&self, page_url: &Url) -> Option<String> {
        query_param(page_url.as_str(), "vjk")
    }

    fn canonical_job_url(&self, key: &str, page_url: &Url) -> String {
        let host = page_url.host_str().unwrap_or("www.indeed.com");
        format!("https://{host}/viewjob?jk={key}")
    }
}

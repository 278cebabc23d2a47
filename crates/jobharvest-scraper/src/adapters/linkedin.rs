//! LinkedIn job search.
//!
//! The list is a lazily rendered `<ul>`; cards outside the viewport are empty
//! placeholders until scrolled to. The detail pane is replaced in place, so
//! stale-panel detection matters more here than anywhere else.

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
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

static PROFILE: AdapterProfile = AdapterProfile {
    card_cap: 25,
    sync: SyncConfig::with_attempts(30),
    pacing: Pacing::Increasing {
        base: Duration::from_millis(600),
        increment: Duration::from_millis(60),
        max: Duration::from_millis(2500),
    },
    challenge_policy: ChallengePolicy::FirstPageOnly,
    challenge: ChallengeSignals {
        selectors: &[
            "#captcha-internal",
            "form#challengeForm",
            "iframe[src*='captcha']",
            ".challenge-dialog",
        ],
        phrases: &[
            "let's do a quick security check",
            "let\u{2019}s do a quick security check",
            "verify you're a human",
            "security verification",
        ],
        path_fragments: &["/checkpoint/", "/authwall", "/uas/login"],
        content_markers: &[
            "li[data-occludable-job-id]",
            ".jobs-search-results-list",
            ".scaffold-layout__list",
            ".jobs-search__job-details--container",
            ".job-view-layout",
        ],
    },
    panel: PanelSpec {
        primary: ".jobs-search__job-details--container",
        alternates: &[".jobs-search__job-details", ".jobs-details", ".job-view-layout"],
        loading: &[
            ".jobs-search__job-details--loading",
            ".jobs-ghost-fadein-placeholder",
            ".artdeco-loader",
            "[aria-busy='true']",
        ],
        rate_limit_phrases: &["too many requests", "you've reached the limit"],
    },
    pagination: PaginationSpec {
        next_controls: &[
            "button.jobs-search-pagination__button--next",
            "button[aria-label='View next page']",
        ],
        page_state: &[
            ".jobs-search-pagination__page-state",
            ".artdeco-pagination__page-state",
        ],
        offset_param: "start",
        step: OffsetStep::Records(25),
    },
};

const CARDS: CardSpec = CardSpec {
    containers: &[
        "li[data-occludable-job-id]",
        "li.jobs-search-results__list-item",
        "div.job-card-container",
    ],
    title_link: &["a.job-card-list__title--link", "a.job-card-container__link"],
    title: &[
        "a.job-card-list__title--link strong",
        ".artdeco-entity-lockup__title strong",
        ".job-card-list__title",
    ],
    id_link: "a[href*='/jobs/view/']",
    company: &[
        ".artdeco-entity-lockup__subtitle",
        ".job-card-container__primary-description",
        ".job-card-container__company-name",
    ],
    location: &[
        ".job-card-container__metadata-wrapper li",
        ".artdeco-entity-lockup__caption li",
        ".job-card-container__metadata-item",
    ],
    salary: &[".job-card-container__salary-info"],
    posted: &[".job-card-container__listed-time", "time"],
    logo: &[".job-card-list__logo img", ".ivm-view-attr__img-wrapper img"],
    workplace: &[],
};

const DETAIL: DetailSpec = DetailSpec {
    title: &[
        ".job-details-jobs-unified-top-card__job-title h1",
        ".job-details-jobs-unified-top-card__job-title",
        ".jobs-unified-top-card__job-title",
        "h1",
    ],
    title_link: &[
        ".job-details-jobs-unified-top-card__job-title a",
        ".jobs-unified-top-card__content--two-pane a[href*='/jobs/view/']",
    ],
    company: &[
        ".job-details-jobs-unified-top-card__company-name a",
        ".job-details-jobs-unified-top-card__company-name",
        ".jobs-unified-top-card__company-name",
    ],
    location: &[".jobs-unified-top-card__bullet"],
    description: &[
        "#job-details",
        ".jobs-description__content .jobs-box__html-content",
        ".jobs-description-content__text",
        ".jobs-description__content",
    ],
    salary: &[".jobs-unified-top-card__salary-info"],
    posted: &[".jobs-unified-top-card__posted-date"],
    job_type: &[],
    applicants: &[".jobs-unified-top-card__applicant-count"],
    workplace: &[".jobs-unified-top-card__workplace-type"],
    logo: &[
        ".job-details-jobs-unified-top-card__container--two-pane img",
        ".jobs-company__box img",
    ],
};

/// "Sydney, NSW · 2 weeks ago · Over 100 applicants"
const TOP_CARD_FACTS: &[&str] = &[
    ".job-details-jobs-unified-top-card__tertiary-description-container .tvm__text",
    ".job-details-jobs-unified-top-card__primary-description-container .tvm__text",
];

/// Salary, workplace and employment-type chips
const PREFERENCE_CHIPS: &[&str] = &[
    ".job-details-fit-level-preferences button",
    ".job-details-preferences-and-skills__pill",
];

fn job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/jobs/view/(?:[^/?#]*-)?(\d+)").expect("valid regex"))
}

/// LinkedIn adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkedInAdapter;

impl BoardAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn matches(&self, url: &Url) -> bool {
        host_is(url, "linkedin.com") && url.path().starts_with("/jobs")
    }

    fn profile(&self) -> &'static AdapterProfile {
        &PROFILE
    }

    fn extract_cards(&self, html: &str, page_url: &Url) -> Vec<DiscoveredCard> {
        CARDS.scan(html, page_url, |raw| {
            let el = raw.element.value();
            let key = el
                .attr("data-occludable-job-id")
                .or_else(|| el.attr("data-job-id"))
                .map(str::to_string)
                .or_else(|| first_attr(raw.element, &["[data-job-id]"], "data-job-id"))
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

            for fact in all_texts(root, TOP_CARD_FACTS) {
                let lower = fact.to_lowercase();
                if fact == "\u{b7}" {
                    continue;
                }
                if lower.contains("applicant") || lower.contains("clicked apply") {
                    fill(&mut draft.applicant_count, fact);
                } else if lower.contains(" ago") || lower.starts_with("reposted") {
                    fill(&mut draft.posted_date, fact);
                } else {
                    fill(&mut draft.location, fact);
                }
            }

            for chip in all_texts(root, PREFERENCE_CHIPS) {
                if is_salary(&chip) {
                    fill(&mut draft.salary, chip);
                } else if is_job_type(&chip) {
                    fill(&mut draft.job_type, chip);
                } else if !draft.workplace_type.is_specified() {
                    draft.workplace_type = WorkplaceType::infer(&chip);
                }
            }
            if !draft.workplace_type.is_specified() {
                draft.workplace_type = WorkplaceType::infer(&draft.location);
            }

            if let Some(key) = self.job_key(&draft.job_url) {
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
            .or_else(|| query_param(job_url, "currentJobId"))
    }

    fn selected_key(&self, page_url: &Url) -> Option<String> {
        query_param(page_url.as_str(), "currentJobId")
    }

    fn canonical_job_url(&self, key: &str, _page_url: &Url) -> String {
        format!("https://www.linkedin.com/jobs/view/{key}/")
    }
}

fn fill(target: &mut String, value: String) {
    if target.is_empty() {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobharvest_browser::ElementTarget;

    const SEARCH: &str = r#"
        <html><body>
        <ul class="scaffold-layout__list-container">
          <li data-occludable-job-id="3912345678" class="jobs-search-results__list-item">
            <div class="job-card-container">
              <div class="job-card-list__logo"><img src="https://media.licdn.com/acme.png"></div>
              <a class="job-card-list__title--link" href="/jobs/view/3912345678/?eBP=abc&trk=flagship3">
                <span aria-hidden="true"><strong>Senior Rust Engineer</strong></span>
                <span class="visually-hidden">Senior Rust Engineer with verification</span>
              </a>
              <div class="artdeco-entity-lockup__subtitle"><span>Acme Robotics</span></div>
              <ul class="job-card-container__metadata-wrapper"><li>Sydney, NSW (Hybrid)</li></ul>
              <time datetime="2026-10-10">1 week ago</time>
            </div>
          </li>
          <li data-occludable-job-id="3912345999" class="jobs-search-results__list-item"></li>
        </ul>
        <div class="jobs-search-pagination__page-state">Page 1 of 3</div>
        </body></html>
    "#;

    const PANEL: &str = r#"
        <html><body>
        <div class="jobs-search__job-details--container">
          <div class="job-details-jobs-unified-top-card__container--two-pane">
            <img src="https://media.licdn.com/acme-large.png">
            <div class="job-details-jobs-unified-top-card__company-name"><a href="/company/acme">Acme Robotics</a></div>
            <div class="job-details-jobs-unified-top-card__job-title">
              <h1><a href="/jobs/view/3912345678/?trk=public">Senior Rust Engineer</a></h1>
            </div>
            <div class="job-details-jobs-unified-top-card__tertiary-description-container">
              <span class="tvm__text">Sydney, NSW</span>
              <span class="tvm__text"> · </span>
              <span class="tvm__text"><strong>1 week ago</strong></span>
              <span class="tvm__text"> · </span>
              <span class="tvm__text">Over 100 applicants</span>
            </div>
            <div class="job-details-fit-level-preferences">
              <button>$150K/yr - $180K/yr</button>
              <button>Hybrid</button>
              <button>Full-time</button>
            </div>
          </div>
          <div id="job-details">
            <p>We build robots.</p>
            <ul><li>Rust</li><li>Tokio</li></ul>
          </div>
        </div>
        </body></html>
    "#;

    fn search_url() -> Url {
        Url::parse("https://www.linkedin.com/jobs/search/?keywords=rust&currentJobId=3912345678")
            .unwrap()
    }

    #[test]
    fn test_extract_cards() {
        let cards = LinkedInAdapter.extract_cards(SEARCH, &search_url());
        assert_eq!(cards.len(), 2);

        let first = &cards[0];
        assert_eq!(first.key.as_deref(), Some("3912345678"));
        assert_eq!(first.snapshot.title, "Senior Rust Engineer");
        assert_eq!(first.snapshot.company, "Acme Robotics");
        assert_eq!(first.snapshot.location, "Sydney, NSW (Hybrid)");
        assert_eq!(first.snapshot.workplace_type, WorkplaceType::Hybrid);
        assert_eq!(first.snapshot.posted_date, "1 week ago");
        assert_eq!(
            first.snapshot.job_url,
            "https://www.linkedin.com/jobs/view/3912345678/"
        );
        assert_eq!(
            first.target,
            ElementTarget::nth("li[data-occludable-job-id]", 0)
                .within("a.job-card-list__title--link")
        );

        // Placeholder not yet rendered
        assert!(!cards[1].snapshot.has_title());
        assert_eq!(cards[1].key.as_deref(), Some("3912345999"));
    }

    #[test]
    fn test_extract_detail() {
        let draft = LinkedInAdapter.extract_detail(PANEL, &search_url());
        assert_eq!(draft.title, "Senior Rust Engineer");
        assert_eq!(draft.company, "Acme Robotics");
        assert_eq!(draft.location, "Sydney, NSW");
        assert_eq!(draft.posted_date, "1 week ago");
        assert_eq!(draft.applicant_count, "Over 100 applicants");
        assert_eq!(draft.salary, "$150K/yr - $180K/yr");
        assert_eq!(draft.job_type, "Full-time");
        assert_eq!(draft.workplace_type, WorkplaceType::Hybrid);
        assert_eq!(draft.job_url, "https://www.linkedin.com/jobs/view/3912345678/");
        assert_eq!(
            draft.company_logo_url.as_deref(),
            Some("https://media.licdn.com/acme-large.png")
        );
        assert!(draft.description.starts_with("We build robots."));
        assert!(draft.description.contains("• Rust"));
    }

    #[test]
    fn test_open_detail_uses_selected_job() {
        let open = LinkedInAdapter.open_detail(PANEL, &search_url()).unwrap();
        assert_eq!(open.key, "3912345678");
        assert_eq!(open.draft.title, "Senior Rust Engineer");
        assert!(!open.fingerprint.is_empty());

        let without_selection = Url::parse("https://www.linkedin.com/jobs/search/?keywords=rust").unwrap();
        assert!(LinkedInAdapter.open_detail(PANEL, &without_selection).is_none());
    }

    #[test]
    fn test_job_key() {
        let adapter = LinkedInAdapter;
        assert_eq!(adapter.job_key("/jobs/view/3912345678/").as_deref(), Some("3912345678"));
        assert_eq!(
            adapter
                .job_key("https://www.linkedin.com/jobs/view/senior-rust-engineer-at-acme-3912345678/")
                .as_deref(),
            Some("3912345678")
        );
        assert_eq!(
            adapter
                .job_key("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=42")
                .as_deref(),
            Some("42")
        );
        assert_eq!(adapter.job_key("https://www.linkedin.com/feed/"), None);
    }

    #[test]
    fn test_pagination() {
        let cursor = LinkedInAdapter.next_cursor(SEARCH, &search_url(), 2);
        assert_eq!(
            cursor,
            Some(crate::pagination::Cursor::Navigate(
                "https://www.linkedin.com/jobs/search/?keywords=rust&currentJobId=3912345678&start=25"
                    .to_string()
            ))
        );
    }
}

//! Extraction helpers shared by the platform adapters.

use crate::normalize::normalize_element;
use jobharvest_browser::ElementTarget;
use jobharvest_core::{single_line, CardSnapshot, JobDraft, WorkplaceType};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Query parameters that only track the click, never identify the job.
const TRACKING_PARAMS: &[&str] = &[
    "trk", "trackingId", "refId", "eBP", "lipi", "position", "pageNum", "from", "tk", "advn",
    "adid", "sjdu", "acatk", "camk", "xkcb", "xpse", "xfps", "vjs", "ref", "origin", "type",
    "searchId", "sol",
];

/// Parse a static selector, skipping (and logging) ones the parser rejects.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector {:?}: {}", css, e);
            None
        }
    }
}

/// All text under `element`, whitespace-collapsed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    single_line(&element.text().collect::<Vec<_>>().join(" "))
}

/// First element matching any of `selectors`, tried in order.
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| scope.select(&sel).next())
}

/// Text of the first match with non-empty text.
pub(crate) fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> String {
    for css in selectors {
        let Some(sel) = selector(css) else { continue };
        if let Some(text) = scope.select(&sel).map(text_of).find(|t| !t.is_empty()) {
            return text;
        }
    }
    String::new()
}

/// Texts of every match of every selector, in selector order.
pub(crate) fn all_texts(scope: ElementRef<'_>, selectors: &[&str]) -> Vec<String> {
    selectors
        .iter()
        .filter_map(|css| selector(css))
        .flat_map(|sel| scope.select(&sel).map(text_of).collect::<Vec<_>>())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Attribute of the first match that carries it.
pub(crate) fn first_attr(scope: ElementRef<'_>, selectors: &[&str], attr: &str) -> Option<String> {
    for css in selectors {
        let Some(sel) = selector(css) else { continue };
        let found = scope
            .select(&sel)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty());
        if let Some(value) = found {
            return Some(value.to_string());
        }
    }
    None
}

/// Whether anything under `scope` matches `css`.
pub(crate) fn contains(scope: ElementRef<'_>, css: &str) -> bool {
    selector(css).is_some_and(|sel| scope.select(&sel).next().is_some())
}

/// Resolve `href` against `base`, dropping the fragment and tracking
/// parameters.
#[must_use]
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    strip_tracking(&mut url);
    Some(url.to_string())
}

fn strip_tracking(url: &mut Url) {
    if url.query().is_none() {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Value of query parameter `name` in `url`.
#[must_use]
pub fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Card locators of one platform.
#[derive(Debug, Clone, Copy)]
pub struct CardSpec {
    /// Card containers; the first selector with any match is used
    pub containers: &'static [&'static str],
    /// Title link, the preferred activation target
    pub title_link: &'static [&'static str],
    /// Title text, when it is not inside the link
    pub title: &'static [&'static str],
    /// Link whose href carries the job ID, second choice for activation
    pub id_link: &'static str,
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub posted: &'static [&'static str],
    pub logo: &'static [&'static str],
    /// Badges naming the workplace arrangement
    pub workplace: &'static [&'static str],
}

/// A list card found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCard {
    pub snapshot: CardSnapshot,
    /// What to activate to reveal the card's detail view
    pub target: ElementTarget,
    /// Platform job ID, when the card exposes one
    pub key: Option<String>,
}

/// Raw card element plus everything located generically.
pub(crate) struct RawCard<'a> {
    pub element: ElementRef<'a>,
    pub snapshot: CardSnapshot,
    pub href: Option<String>,
    pub target: ElementTarget,
}

impl CardSpec {
    /// Scan every card in document order. `finish` turns each raw card into
    /// a [`DiscoveredCard`], applying the platform's URL and key rules.
    pub(crate) fn scan<F>(&self, html: &str, page_url: &Url, mut finish: F) -> Vec<DiscoveredCard>
    where
        F: FnMut(RawCard<'_>) -> DiscoveredCard,
    {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let Some((container_css, container)) = self
            .containers
            .iter()
            .filter_map(|css| selector(css).map(|sel| (*css, sel)))
            .find(|(_, sel)| root.select(sel).next().is_some())
        else {
            return Vec::new();
        };

        root.select(&container)
            .enumerate()
            .map(|(index, element)| {
                let raw = self.raw_card(element, page_url, container_css, index);
                finish(raw)
            })
            .collect()
    }

    fn raw_card<'a>(
        &self,
        element: ElementRef<'a>,
        page_url: &Url,
        container_css: &str,
        index: usize,
    ) -> RawCard<'a> {
        let title_link = self
            .title_link
            .iter()
            .find(|css| contains(element, css))
            .copied();
        let id_link = contains(element, self.id_link).then_some(self.id_link);

        let mut title = first_text(element, self.title);
        if title.is_empty() {
            title = first_text(element, self.title_link);
        }

        let href = first_attr(element, self.title_link, "href")
            .or_else(|| first_attr(element, &[self.id_link], "href"));

        let location = first_text(element, self.location);
        let badges = all_texts(element, self.workplace).join(" ");
        let workplace_type = match WorkplaceType::infer(&badges) {
            WorkplaceType::Unspecified => WorkplaceType::infer(&location),
            found => found,
        };

        let target = ElementTarget::nth(container_css, index);
        let target = match title_link.or(id_link) {
            Some(inner) => target.within(inner),
            None => target,
        };

        RawCard {
            element,
            snapshot: CardSnapshot {
                title,
                company: first_text(element, self.company),
                location,
                job_url: href
                    .as_deref()
                    .and_then(|h| resolve_url(page_url, h))
                    .unwrap_or_default(),
                workplace_type,
                salary: first_text(element, self.salary),
                posted_date: first_text(element, self.posted),
                company_logo_url: first_attr(element, self.logo, "src")
                    .and_then(|src| resolve_url(page_url, &src)),
            },
            href,
            target,
        }
    }
}

/// Detail view locators of one platform.
#[derive(Debug, Clone, Copy)]
pub struct DetailSpec {
    pub title: &'static [&'static str],
    /// Link to the canonical posting inside the view
    pub title_link: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub description: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub posted: &'static [&'static str],
    pub job_type: &'static [&'static str],
    pub applicants: &'static [&'static str],
    /// Badges naming the workplace arrangement
    pub workplace: &'static [&'static str],
    pub logo: &'static [&'static str],
}

impl DetailSpec {
    /// Extract the generic fields of a detail view rooted at `scope`.
    pub(crate) fn extract(&self, scope: ElementRef<'_>, page_url: &Url) -> JobDraft {
        let location = first_text(scope, self.location);
        let badges = all_texts(scope, self.workplace).join(" ");
        let workplace_type = match WorkplaceType::infer(&badges) {
            WorkplaceType::Unspecified => WorkplaceType::infer(&location),
            found => found,
        };

        JobDraft {
            title: first_text(scope, self.title),
            company: first_text(scope, self.company),
            location,
            job_url: first_attr(scope, self.title_link, "href")
                .and_then(|h| resolve_url(page_url, &h))
                .unwrap_or_default(),
            description: first_match(scope, self.description)
                .map(normalize_element)
                .unwrap_or_default(),
            salary: first_text(scope, self.salary),
            posted_date: first_text(scope, self.posted),
            company_logo_url: first_attr(scope, self.logo, "src")
                .and_then(|src| resolve_url(page_url, &src)),
            job_type: first_text(scope, self.job_type),
            workplace_type,
            applicant_count: first_text(scope, self.applicants),
        }
    }
}

/// Employment types boards print as chips or attribute lines.
const JOB_TYPES: &[&str] = &[
    "full-time",
    "full time",
    "part-time",
    "part time",
    "contract",
    "temporary",
    "internship",
    "casual",
    "permanent",
    "volunteer",
];

/// Whether `text` reads like an employment type.
pub(crate) fn is_job_type(text: &str) -> bool {
    let lower = text.to_lowercase();
    JOB_TYPES.iter().any(|t| lower.contains(t))
}

/// Whether `text` reads like a pay line.
pub(crate) fn is_salary(text: &str) -> bool {
    let lower = text.to_lowercase();
    ['$', '€', '£', '₹'].iter().any(|c| lower.contains(*c))
        || lower.contains("per hour")
        || lower.contains("per annum")
        || lower.contains("a year")
        || lower.contains("an hour")
}

/// Parse `html` and run `f` on its root element.
pub(crate) fn with_root<T>(html: &str, f: impl FnOnce(ElementRef<'_>) -> T) -> T {
    let document = Html::parse_document(html);
    f(document.root_element())
}

//! Next-page resolution.
//!
//! A cursor is either a URL to navigate to or a control to activate. The
//! explicit next control wins; failing that, a "page X of Y" indicator lets
//! the next URL be synthesized from the platform's offset parameter.

use jobharvest_browser::ElementTarget;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// Where the next page of results is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum Cursor {
    /// Navigate to this URL
    Navigate(String),
    /// Activate this control
    Activate(ElementTarget),
}

/// How the offset query parameter advances between pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetStep {
    /// Parameter is a 1-based page number
    PageNumber,
    /// Parameter is a record offset advanced by a fixed page size
    Records(usize),
    /// Record offset; page size taken from the cards found,
    /// `max(10, min(25, cards))`
    RecordsFromCards,
}

/// Platform pagination locators.
#[derive(Debug, Clone, Copy)]
pub struct PaginationSpec {
    /// Next-page controls, most specific first
    pub next_controls: &'static [&'static str],
    /// Elements whose text reads "page X of Y"
    pub page_state: &'static [&'static str],
    /// Query parameter carrying the offset
    pub offset_param: &'static str,
    pub step: OffsetStep,
}

fn page_state_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)page\s+([\d,]+)\s+of\s+([\d,]+)").expect("valid regex"))
}

/// Parse "Page X of Y" out of free text.
#[must_use]
pub fn parse_page_state(text: &str) -> Option<(u32, u32)> {
    let caps = page_state_pattern().captures(text)?;
    let number = |i: usize| caps.get(i)?.as_str().replace(',', "").parse::<u32>().ok();
    Some((number(1)?, number(2)?))
}

impl PaginationSpec {
    /// Resolve the next page of `html`, loaded from `current_url`.
    ///
    /// A page-state indicator saying this is the last page is final, even
    /// if a next control is still rendered.
    #[must_use]
    pub fn next_cursor(&self, html: &str, current_url: &Url, cards_found: usize) -> Option<Cursor> {
        let document = Html::parse_document(html);
        let page_state = self.page_state(&document);

        if let Some((current, total)) = page_state {
            if current >= total {
                tracing::debug!(current, total, "Last page reached");
                return None;
            }
        }

        if let Some(cursor) = self.next_control(&document, current_url) {
            return Some(cursor);
        }

        if page_state.is_some() {
            let url = self.offset_url(current_url, cards_found);
            return Some(Cursor::Navigate(url.to_string()));
        }

        None
    }

    fn page_state(&self, document: &Html) -> Option<(u32, u32)> {
        self.page_state
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .flat_map(|selector| {
                document
                    .select(&selector)
                    .map(|el| el.text().collect::<String>())
                    .collect::<Vec<_>>()
            })
            .find_map(|text| parse_page_state(&text))
    }

    fn next_control(&self, document: &Html, current_url: &Url) -> Option<Cursor> {
        for css in self.next_controls {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for (index, control) in document.select(&selector).enumerate() {
                if !is_enabled(control) {
                    continue;
                }
                let href = control
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"));
                return Some(match href.and_then(|h| current_url.join(h).ok()) {
                    Some(url) => Cursor::Navigate(url.to_string()),
                    None => Cursor::Activate(ElementTarget::nth(*css, index)),
                });
            }
        }
        None
    }

    /// `current_url` with the offset parameter advanced by one page.
    #[must_use]
    pub fn offset_url(&self, current_url: &Url, cards_found: usize) -> Url {
        let current: Option<usize> = current_url
            .query_pairs()
            .find(|(k, _)| k == self.offset_param)
            .and_then(|(_, v)| v.parse().ok());

        let next = match self.step {
            OffsetStep::PageNumber => current.unwrap_or(1) + 1,
            OffsetStep::Records(size) => current.unwrap_or(0) + size,
            OffsetStep::RecordsFromCards => current.unwrap_or(0) + cards_found.clamp(10, 25),
        };

        let pairs: Vec<(String, String)> = current_url
            .query_pairs()
            .filter(|(k, _)| k != self.offset_param)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = current_url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair(self.offset_param, &next.to_string());
        url
    }
}

fn is_enabled(control: ElementRef<'_>) -> bool {
    let el = control.value();
    if el.attr("disabled").is_some() || el.attr("aria-disabled") == Some("true") {
        return false;
    }
    if matches!(el.attr("aria-current"), Some("page" | "true")) {
        return false;
    }
    !el.classes()
        .any(|c| c.contains("disabled") || c.ends_with("--current") || c.ends_with("--last"))
}

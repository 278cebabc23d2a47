use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Locates one element in the live document: the `index`-th match of
/// `selector`, optionally narrowed to the first match of `within` inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementTarget {
    pub selector: String,
    pub index: usize,
    pub within: Option<String>,
}

impl ElementTarget {
    /// First match of `selector`.
    pub fn first(selector: impl Into<String>) -> Self {
        Self::nth(selector, 0)
    }

    /// `index`-th match of `selector`.
    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            within: None,
        }
    }

    /// Narrow to a descendant of the located element.
    #[must_use]
    pub fn within(mut self, selector: impl Into<String>) -> Self {
        self.within = Some(selector.into());
        self
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)?;
        if let Some(within) = &self.within {
            write!(f, " {within}")?;
        }
        Ok(())
    }
}

/// Browser actions for automation.
///
/// This is the only surface through which scraping code touches the live
/// document, so a run can be replayed against [`crate::ScriptedPage`].
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current location of the document
    async fn current_url(&self) -> Result<String>;

    /// Serialized HTML of the rendered document
    async fn content(&self) -> Result<String>;

    /// Dispatch an activation (click) on an element
    async fn click(&self, target: &ElementTarget) -> Result<()>;

    /// Scroll an element into the viewport
    async fn scroll_into_view(&self, target: &ElementTarget) -> Result<()>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}

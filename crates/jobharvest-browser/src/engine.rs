use crate::actions::{extract_domain, BrowserActions, ElementTarget};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out navigations to the same host.
#[derive(Debug)]
struct RateLimiter {
    next_allowed: HashMap<String, Instant>,
    min_delay: Duration,
}

impl RateLimiter {
    fn new(min_delay: Duration) -> Self {
        Self {
            next_allowed: HashMap::new(),
            min_delay,
        }
    }

    /// Reserve the next slot for `domain` and return how long the caller
    /// must wait before using it.
    fn reserve(&mut self, domain: &str) -> Duration {
        let now = Instant::now();
        let slot = match self.next_allowed.get(domain) {
            Some(next) if *next > now => *next,
            _ => now,
        };
        self.next_allowed
            .insert(domain.to_string(), slot + self.min_delay);
        slot - now
    }
}

/// Launch settings for [`BrowserEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_executable: Option<String>,
    pub navigation_timeout: Duration,
    pub min_navigation_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1440,
            window_height: 900,
            chrome_executable: None,
            navigation_timeout: Duration::from_secs(30),
            min_navigation_interval: Duration::from_secs(3),
        }
    }
}

/// Browser automation engine driving a single page.
///
/// The page is the one document shared with the user; every scraping step
/// goes through it in sequence.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    rate_limiter: Mutex<RateLimiter>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser with default options
    pub async fn new() -> Result<Self> {
        Self::launch(EngineOptions::default()).await
    }

    /// Launch a browser with a randomized fingerprint and the given options
    pub async fn launch(options: EngineOptions) -> Result<Self> {
        let fingerprint = FingerprintConfig::randomized()
            .with_viewport(options.window_width, options.window_height);
        Self::with_fingerprint(options, fingerprint).await
    }

    /// Launch a browser with a specific fingerprint
    pub async fn with_fingerprint(
        options: EngineOptions,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .viewport(Option::<Viewport>::None)
            .arg(format!("--user-agent={}", fingerprint.user_agent))
            .arg("--disable-blink-features=AutomationControlled");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Spawn browser handler
        // Handler errors are per-message; the loop ends when the browser does
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser.new_page("about:blank").await?;

        tracing::info!(
            headless = options.headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Browser launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            rate_limiter: Mutex::new(RateLimiter::new(options.min_navigation_interval)),
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Close the browser process.
    pub async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        tracing::info!("Browser closed");
        Ok(())
    }

    async fn locate(&self, target: &ElementTarget) -> Result<Element> {
        let mut matches = self
            .page
            .find_elements(target.selector.as_str())
            .await
            .map_err(|_| BrowserError::SelectorNotFound(target.to_string()))?;

        if target.index >= matches.len() {
            return Err(BrowserError::SelectorNotFound(target.to_string()));
        }
        let element = matches.swap_remove(target.index);

        match &target.within {
            Some(inner) => element
                .find_element(inner.as_str())
                .await
                .map_err(|_| BrowserError::SelectorNotFound(target.to_string())),
            None => Ok(element),
        }
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        let wait = self.rate_limiter.lock().await.reserve(&domain);
        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before navigating to {}", wait, domain);
            tokio::time::sleep(wait).await;
        }

        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {url}")))?
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;

        tracing::debug!("Navigated to {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn click(&self, target: &ElementTarget) -> Result<()> {
        let element = self.locate(target).await?;
        // DOM-level activation; works for elements partially covered by overlays
        element
            .call_js_fn("function() { this.click(); }", false)
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, target: &ElementTarget) -> Result<()> {
        let element = self.locate(target).await?;
        element.scroll_into_view().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100));

        // First access goes straight through
        assert_eq!(limiter.reserve("www.seek.com.au"), Duration::ZERO);

        // Immediate second access must wait the full interval
        assert_eq!(limiter.reserve("www.seek.com.au"), Duration::from_millis(100));

        // A third queues behind the second
        assert_eq!(limiter.reserve("www.seek.com.au"), Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.reserve("www.seek.com.au"), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_different_domains() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100));

        // Different domains should not interfere
        assert_eq!(limiter.reserve("www.linkedin.com"), Duration::ZERO);
        assert_eq!(limiter.reserve("au.indeed.com"), Duration::ZERO);
    }

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert!(!options.headless);
        assert_eq!(options.navigation_timeout, Duration::from_secs(30));
    }
}

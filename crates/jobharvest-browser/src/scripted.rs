//! Replayable in-memory document.
//!
//! `ScriptedPage` implements [`BrowserActions`] over a queue of HTML frames.
//! Clicks and navigations can enqueue frames, and each `content()` read
//! advances to the next queued frame, which is enough to reproduce skeleton
//! loaders, late-arriving panels, rate-limit banners and verification
//! interstitials without a browser. It also backs offline replays of saved
//! listing pages.

use crate::actions::{BrowserActions, ElementTarget};
use crate::error::{BrowserError, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// One rendered state of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub html: String,
    pub url: Option<String>,
}

impl Frame {
    /// Frame that keeps the current location.
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: None,
        }
    }

    /// Frame that also changes the location.
    #[must_use]
    pub fn at(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Debug)]
struct ClickReaction {
    selector: String,
    index: usize,
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct NavigationReaction {
    url: String,
    frames: Vec<Frame>,
}

#[derive(Debug, Default)]
struct State {
    url: String,
    html: String,
    pending: VecDeque<Frame>,
    click_reactions: Vec<ClickReaction>,
    navigation_reactions: Vec<NavigationReaction>,
    failing_clicks: Vec<(String, usize)>,
    clicks: Vec<ElementTarget>,
    navigations: Vec<String>,
    content_reads: usize,
    closed: bool,
}

/// In-memory [`BrowserActions`] implementation driven by scripted frames.
#[derive(Debug, Default)]
pub struct ScriptedPage {
    state: Mutex<State>,
}

impl ScriptedPage {
    /// Document showing `html` at `url`.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.into(),
                html: html.into(),
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test assertion panicked mid-call
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Frames served by the next `content()` reads, one per read.
    pub fn queue(&self, frames: impl IntoIterator<Item = Frame>) {
        self.lock().pending.extend(frames);
    }

    /// When the `index`-th match of `selector` is clicked (with or without a
    /// narrowing sub-selector), queue `frames`.
    pub fn on_click(&self, selector: &str, index: usize, frames: Vec<Frame>) {
        self.lock().click_reactions.push(ClickReaction {
            selector: selector.to_string(),
            index,
            frames,
        });
    }

    /// Clicking the `index`-th match of `selector` fails as if the element
    /// had been detached.
    pub fn fail_click(&self, selector: &str, index: usize) {
        self.lock()
            .failing_clicks
            .push((selector.to_string(), index));
    }

    /// When `url` is navigated to, queue `frames`.
    pub fn on_navigate(&self, url: &str, frames: Vec<Frame>) {
        self.lock().navigation_reactions.push(NavigationReaction {
            url: url.to_string(),
            frames,
        });
    }

    /// Every read of the document fails from now on.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Targets clicked so far, in order.
    pub fn clicks(&self) -> Vec<ElementTarget> {
        self.lock().clicks.clone()
    }

    /// URLs navigated to so far, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Number of `content()` calls served.
    pub fn content_reads(&self) -> usize {
        self.lock().content_reads
    }
}

#[async_trait::async_trait]
impl BrowserActions for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(BrowserError::PageClosed);
        }
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        state.pending.clear();
        let frames: Vec<Frame> = state
            .navigation_reactions
            .iter()
            .filter(|r| r.url == url)
            .flat_map(|r| r.frames.iter().cloned())
            .collect();
        state.pending.extend(frames);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.lock();
        if state.closed {
            return Err(BrowserError::PageClosed);
        }
        Ok(state.url.clone())
    }

    async fn content(&self) -> Result<String> {
        let mut state = self.lock();
        if state.closed {
            return Err(BrowserError::PageClosed);
        }
        state.content_reads += 1;
        if let Some(frame) = state.pending.pop_front() {
            state.html = frame.html;
            if let Some(url) = frame.url {
                state.url = url;
            }
        }
        Ok(state.html.clone())
    }

    async fn click(&self, target: &ElementTarget) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(BrowserError::PageClosed);
        }
        if state
            .failing_clicks
            .iter()
            .any(|(sel, idx)| *sel == target.selector && *idx == target.index)
        {
            return Err(BrowserError::SelectorNotFound(target.to_string()));
        }
        state.clicks.push(target.clone());
        let frames: Vec<Frame> = state
            .click_reactions
            .iter()
            .filter(|r| r.selector == target.selector && r.index == target.index)
            .flat_map(|r| r.frames.iter().cloned())
            .collect();
        if !frames.is_empty() {
            state.pending.clear();
            state.pending.extend(frames);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, _target: &ElementTarget) -> Result<()> {
        if self.lock().closed {
            return Err(BrowserError::PageClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_advance_per_read() {
        let page = ScriptedPage::new("https://example.com/jobs", "<p>list</p>");
        page.queue([Frame::html("<p>one</p>"), Frame::html("<p>two</p>")]);

        assert_eq!(page.content().await.unwrap(), "<p>one</p>");
        assert_eq!(page.content().await.unwrap(), "<p>two</p>");
        // Last frame sticks
        assert_eq!(page.content().await.unwrap(), "<p>two</p>");
        assert_eq!(page.content_reads(), 3);
    }

    #[tokio::test]
    async fn test_click_reaction_ignores_sub_selector() {
        let page = ScriptedPage::new("https://example.com/jobs", "<p>list</p>");
        page.on_click(
            "li.card",
            1,
            vec![Frame::html("<p>detail</p>").at("https://example.com/jobs?id=2")],
        );

        page.click(&ElementTarget::nth("li.card", 0)).await.unwrap();
        assert_eq!(page.content().await.unwrap(), "<p>list</p>");

        page.click(&ElementTarget::nth("li.card", 1).within("a"))
            .await
            .unwrap();
        assert_eq!(page.content().await.unwrap(), "<p>detail</p>");
        assert_eq!(
            page.current_url().await.unwrap(),
            "https://example.com/jobs?id=2"
        );
        assert_eq!(page.clicks().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_click_and_closed_page() {
        let page = ScriptedPage::new("https://example.com", "<p>x</p>");
        page.fail_click("li.card", 0);
        assert!(page.click(&ElementTarget::nth("li.card", 0)).await.is_err());

        page.close();
        assert!(matches!(
            page.content().await,
            Err(BrowserError::PageClosed)
        ));
    }

    #[tokio::test]
    async fn test_scroll_through_trait_object() {
        let scripted = ScriptedPage::new("https://example.com", "<p>x</p>");
        let page: &dyn BrowserActions = &scripted;
        let target = ElementTarget::nth("li.card", 0);

        page.scroll_into_view(&target).await.unwrap();
        // Scrolling alone never activates anything
        assert!(scripted.clicks().is_empty());

        scripted.close();
        assert!(matches!(
            page.scroll_into_view(&target).await,
            Err(BrowserError::PageClosed)
        ));
    }

    #[tokio::test]
    async fn test_navigation_reaction() {
        let page = ScriptedPage::new("https://example.com/?page=1", "<p>1</p>");
        page.on_navigate("https://example.com/?page=2", vec![Frame::html("<p>2</p>")]);

        page.navigate("https://example.com/?page=2").await.unwrap();
        assert_eq!(page.content().await.unwrap(), "<p>2</p>");
        assert_eq!(page.navigations(), vec!["https://example.com/?page=2"]);
    }
}

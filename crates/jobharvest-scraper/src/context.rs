//! Per-run state shared by every scraping component.

use crate::messages::Message;
use jobharvest_core::RunId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the controller
    Sent,
    /// Dropped because the channel was full or the run has no controller
    Dropped,
    /// The controller is gone; the run should stop
    Closed,
}

/// Identity, position and control channels of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: RunId,
    page_number: u32,
    sender: Option<mpsc::Sender<Message>>,
    cancel: CancellationToken,
}

impl RunContext {
    /// Run reporting to `sender`, starting on page 1.
    pub fn new(sender: mpsc::Sender<Message>) -> Self {
        Self {
            run_id: RunId::generate(),
            page_number: 1,
            sender: Some(sender),
            cancel: CancellationToken::new(),
        }
    }

    /// Run without a controller; notifications are dropped.
    pub fn detached() -> Self {
        Self {
            run_id: RunId::generate(),
            page_number: 1,
            sender: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Same run, explicit page number.
    #[must_use]
    pub fn on_page(mut self, page_number: u32) -> Self {
        self.page_number = page_number.max(1);
        self
    }

    /// Use `token` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// 1-based page of a paginated run.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub(crate) fn advance_page(&mut self) {
        self.page_number += 1;
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fire-and-forget notification. Never waits for channel capacity.
    pub fn notify(&self, message: Message) -> Delivery {
        let Some(sender) = &self.sender else {
            return Delivery::Dropped;
        };
        match sender.try_send(message) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(run_id = %self.run_id, "Controller channel full, dropping message");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

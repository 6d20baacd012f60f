//! Fixed-interval polling of a document's status until it turns terminal or
//! the attempt budget runs out.

use crate::domain::DocumentStatus;
use crate::ports::PortResult;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    /// Every 2 seconds for at most 3 minutes.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { attempts: u32 },
    Failed { attempts: u32 },
    /// The budget ran out while the document was still processing.
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            PollOutcome::Completed { attempts }
            | PollOutcome::Failed { attempts }
            | PollOutcome::TimedOut { attempts } => attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Calls `read` until it reports a terminal status. A failed read counts
    /// as still processing but uses up an attempt. No sleep follows the last attempt.
    pub async fn wait_for_terminal<F, Fut>(&self, mut read: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PortResult<DocumentStatus>>,
    {
        for attempt in 1..=self.config.max_attempts {
            match read().await {
                Ok(DocumentStatus::Completed) => return PollOutcome::Completed { attempts: attempt },
                Ok(DocumentStatus::Failed) => return PollOutcome::Failed { attempts: attempt },
                Ok(DocumentStatus::Processing) => debug!(attempt, "document still processing"),
                Err(e) => warn!(attempt, error = %e, "status read failed, will retry"),
            }
            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }
        PollOutcome::TimedOut {
            attempts: self.config.max_attempts,
        }
    }
}

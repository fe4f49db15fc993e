use std::time::Duration;

/// Timing policy for one streaming run.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Longest wait for the agent's next step before the run fails.
    /// `None` waits indefinitely.
    pub step_timeout: Option<Duration>,
    /// Longest wait for the worker thread to finish once the run closes.
    /// A worker still busy after this is detached and exits at its next send.
    pub close_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            step_timeout: Some(Duration::from_secs(300)),
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn without_step_timeout(mut self) -> Self {
        self.step_timeout = None;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

//! Render deadline.

use std::time::{Duration, Instant};

use chart_common::{ChartError, ChartResult};

/// Wall-clock budget for one render, checked between units of work.
#[derive(Debug, Clone, Copy)]
pub struct RenderBudget {
    started: Instant,
    deadline: Option<Instant>,
}

impl RenderBudget {
    pub fn new(limit: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started.checked_add(limit),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            deadline: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `Err(Timeout)` once the deadline has passed.
    pub fn check(&self) -> ChartResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ChartError::Timeout {
                elapsed_ms: self.elapsed().as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for RenderBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

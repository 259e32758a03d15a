//! Bridge configuration
//!
//! Timing is carried per instance rather than in process-wide statics so tests
//! can shrink the windows without cross-test interference.

use std::time::Duration;

/// Default quiet period applied once the top-level reply has resolved.
pub const DEFAULT_UPDATE_QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Default absolute cap on post-reply draining.
pub const DEFAULT_UPDATE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default quiet period while the top-level reply is still outstanding.
pub const DEFAULT_PRE_PROMPT_QUIET_PERIOD: Duration = Duration::from_millis(50);

/// Default bound on pre-reply bookkeeping (slow-reply warning threshold).
pub const DEFAULT_PRE_PROMPT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Quiet-period and drain-timeout settings for both turn phases.
///
/// The post-reply pair (`update_*`) decides when a turn's trailing activity is
/// considered finished. The pre-reply pair (`pre_prompt_*`) bounds defensive
/// bookkeeping while the top-level reply is outstanding and governs the
/// best-effort drain when the top-level request fails before any reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainTiming {
    /// Silence required after the top-level reply before flushing the turn
    pub update_quiet_period: Duration,
    /// Absolute deadline on post-reply draining, set once and never extended
    pub update_drain_timeout: Duration,
    /// Quiet period used while the top-level reply is still outstanding
    pub pre_prompt_quiet_period: Duration,
    /// Bound on pre-reply draining (failure path) and slow-reply warnings
    pub pre_prompt_drain_timeout: Duration,
}

impl Default for DrainTiming {
    fn default() -> Self {
        Self {
            update_quiet_period: DEFAULT_UPDATE_QUIET_PERIOD,
            update_drain_timeout: DEFAULT_UPDATE_DRAIN_TIMEOUT,
            pre_prompt_quiet_period: DEFAULT_PRE_PROMPT_QUIET_PERIOD,
            pre_prompt_drain_timeout: DEFAULT_PRE_PROMPT_DRAIN_TIMEOUT,
        }
    }
}

/// Options for constructing an [`AcpBackend`](crate::backend::AcpBackend)
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Timing configuration for turn consolidation
    pub timing: DrainTiming,
}

impl BackendOptions {
    /// Create a new builder for `BackendOptions`
    #[must_use]
    pub fn builder() -> BackendOptionsBuilder {
        BackendOptionsBuilder::default()
    }
}

/// Builder for `BackendOptions`
#[derive(Debug, Default)]
pub struct BackendOptionsBuilder {
    options: BackendOptions,
}

impl BackendOptionsBuilder {
    /// Set the full timing configuration
    #[must_use]
    pub const fn timing(mut self, timing: DrainTiming) -> Self {
        self.options.timing = timing;
        self
    }

    /// Set the post-reply quiet period
    #[must_use]
    pub const fn update_quiet_period(mut self, period: Duration) -> Self {
        self.options.timing.update_quiet_period = period;
        self
    }

    /// Set the post-reply drain timeout
    #[must_use]
    pub const fn update_drain_timeout(mut self, timeout: Duration) -> Self {
        self.options.timing.update_drain_timeout = timeout;
        self
    }

    /// Set the pre-reply quiet period
    #[must_use]
    pub const fn pre_prompt_quiet_period(mut self, period: Duration) -> Self {
        self.options.timing.pre_prompt_quiet_period = period;
        self
    }

    /// Set the pre-reply drain timeout
    #[must_use]
    pub const fn pre_prompt_drain_timeout(mut self, timeout: Duration) -> Self {
        self.options.timing.pre_prompt_drain_timeout = timeout;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> BackendOptions {
        self.options
    }
}

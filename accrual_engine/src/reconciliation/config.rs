use std::time::Duration;

pub const DEFAULT_POOL_SIZE: usize = 5;
pub const DEFAULT_SUBMISSION_QUEUE_SIZE: usize = 100;
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);
pub const DEFAULT_PACE: Duration = Duration::from_secs(1);
pub const DEFAULT_NO_CONTENT_DELAY: Duration = Duration::from_secs(5);

/// Timing of a single poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// How long to wait after every query, whatever its outcome.
    pub pace: Duration,
    /// Extra wait after the accrual service replies that it has no record of the order yet.
    pub no_content_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { pace: DEFAULT_PACE, no_content_delay: DEFAULT_NO_CONTENT_DELAY }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// The number of concurrent pollers.
    pub pool_size: usize,
    /// Capacity of the submission queue. Submitters wait when it is full.
    pub submission_queue_size: usize,
    /// How long [`super::AccrualPool::shutdown`] waits for tasks to exit before aborting them.
    pub shutdown_grace_period: Duration,
    pub poller: PollerConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            submission_queue_size: DEFAULT_SUBMISSION_QUEUE_SIZE,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            poller: PollerConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_submission_queue_size(mut self, size: usize) -> Self {
        self.submission_queue_size = size.max(1);
        self
    }

    pub fn with_shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.shutdown_grace_period = grace;
        self
    }

    pub fn with_poller_config(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }
}

use std::{env, time::Duration};

use log::*;
use lpg_common::helpers::parse_seconds;

use crate::helpers::normalize_base_url;

const DEFAULT_ACCRUAL_ADDRESS: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Delays before each retry of a request that failed at the transport level.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(5)];
/// Used when a 429 reply carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Scheme, host and port of the accrual service, without a trailing slash.
    pub base_url: String,
    pub retry_delays: Vec<Duration>,
    pub request_timeout: Option<Duration>,
    pub default_retry_after: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

impl AccrualConfig {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: normalize_base_url(base_url), ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("LPG_ACCRUAL_SYSTEM_ADDRESS").map(|s| normalize_base_url(&s)).unwrap_or_else(|_| {
            warn!("🧮️ LPG_ACCRUAL_SYSTEM_ADDRESS not set, using {DEFAULT_ACCRUAL_ADDRESS} as default");
            DEFAULT_ACCRUAL_ADDRESS.to_string()
        });
        let request_timeout = match env::var("LPG_ACCRUAL_REQUEST_TIMEOUT").ok() {
            None => Some(DEFAULT_REQUEST_TIMEOUT),
            Some(s) => match parse_seconds(Some(&s)) {
                Some(Duration::ZERO) => {
                    info!("🧮️ Accrual request timeout disabled");
                    None
                },
                Some(t) => Some(t),
                None => {
                    error!(
                        "🧮️ {s} is not a valid LPG_ACCRUAL_REQUEST_TIMEOUT. Using the default of {}s",
                        DEFAULT_REQUEST_TIMEOUT.as_secs()
                    );
                    Some(DEFAULT_REQUEST_TIMEOUT)
                },
            },
        };
        Self { base_url, request_timeout, ..Default::default() }
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_default_retry_after(mut self, retry_after: Duration) -> Self {
        self.default_retry_after = retry_after;
        self
    }
}

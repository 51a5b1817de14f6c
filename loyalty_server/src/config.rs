use std::{env, time::Duration};

use accrual_client::AccrualConfig;
use accrual_engine::{
    reconciliation::{DEFAULT_POOL_SIZE, DEFAULT_SHUTDOWN_GRACE_PERIOD, DEFAULT_SUBMISSION_QUEUE_SIZE},
    PoolConfig,
};
use log::*;
use lpg_common::helpers::{parse_boolean_flag, parse_positive, parse_seconds};

const DEFAULT_LPG_DATABASE_URL: &str = "sqlite://data/loyalty_store.db";
/// Setting `LPG_DATABASE_URL` to this value selects the in-memory backend. Nothing survives a restart.
pub const MEMORY_DATABASE_URL: &str = "memory";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    /// Where and how to reach the external accrual service.
    pub accrual: AccrualConfig,
    /// Sizing and timing of the accrual pool.
    pub pool: PoolConfig,
    /// If true, every order that has not reached a terminal status is queued for reconciliation at startup.
    pub resubmit_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_LPG_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            accrual: AccrualConfig::default(),
            pool: PoolConfig::default(),
            resubmit_on_start: true,
        }
    }
}

impl ServerConfig {
    pub fn new(database_url: &str, accrual: AccrualConfig) -> Self {
        Self { database_url: database_url.to_string(), accrual, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let config = Self::from_vars(|name| env::var(name).ok());
        Self { accrual: AccrualConfig::new_from_env_or_default(), ..config }
    }

    /// Builds everything except the accrual client configuration from `lookup`, which maps a variable name to its
    /// value. Bad values are logged and replaced by their defaults.
    fn from_vars<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("LPG_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ LPG_DATABASE_URL is not set. Using {DEFAULT_LPG_DATABASE_URL} as the default.");
            DEFAULT_LPG_DATABASE_URL.to_string()
        });
        let pool_size = positive_or_default(&lookup, "LPG_WORKER_POOL_SIZE", DEFAULT_POOL_SIZE);
        let submission_queue_size =
            positive_or_default(&lookup, "LPG_SUBMISSION_QUEUE_SIZE", DEFAULT_SUBMISSION_QUEUE_SIZE);
        let shutdown_grace_period = configure_grace_period(lookup("LPG_SHUTDOWN_GRACE_PERIOD"));
        let resubmit_on_start = parse_boolean_flag(lookup("LPG_RESUBMIT_ON_START"), true);
        let pool = PoolConfig::default()
            .with_pool_size(pool_size)
            .with_submission_queue_size(submission_queue_size)
            .with_shutdown_grace_period(shutdown_grace_period);
        Self { database_url, pool, resubmit_on_start, ..Default::default() }
    }

    pub fn uses_memory_backend(&self) -> bool {
        self.database_url.trim().eq_ignore_ascii_case(MEMORY_DATABASE_URL)
    }

    pub fn with_pool_config(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_resubmit_on_start(mut self, resubmit: bool) -> Self {
        self.resubmit_on_start = resubmit;
        self
    }
}

fn positive_or_default<F>(lookup: &F, name: &str, default: usize) -> usize
where F: Fn(&str) -> Option<String> {
    match lookup(name) {
        None => default,
        Some(s) => parse_positive::<usize>(Some(&s)).unwrap_or_else(|| {
            error!("🪛️ {s} is not a valid value for {name}. It must be a positive integer. Using {default} instead.");
            default
        }),
    }
}

fn configure_grace_period(value: Option<String>) -> Duration {
    match value {
        None => DEFAULT_SHUTDOWN_GRACE_PERIOD,
        Some(s) => parse_seconds(Some(&s)).unwrap_or_else(|| {
            error!(
                "🪛️ {s} is not a valid LPG_SHUTDOWN_GRACE_PERIOD. Using the default of {}s instead.",
                DEFAULT_SHUTDOWN_GRACE_PERIOD.as_secs()
            );
            DEFAULT_SHUTDOWN_GRACE_PERIOD
        }),
    }
}

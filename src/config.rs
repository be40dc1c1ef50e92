/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{KvLockError, KvLockResult};
use crate::util::jitter_delay;

/// Delay growth across retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Every retry waits the base interval.
    Constant,
    /// Retry `n` waits `interval * n`.
    Linear,
    /// Retry `n` waits `interval * 2^(n-1)`.
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Constant
    }
}

/// Retry behavior consumed by lock acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay between attempts
    pub interval: Duration,
    /// Maximum number of acquisition attempts (at least 1)
    pub max_attempts: u32,
    /// Backoff shape
    pub strategy: BackoffStrategy,
    /// Upper bound on a single computed delay
    pub max_delay: Option<Duration>,
    /// Random jitter applied on top of each computed delay
    pub jitter: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Retry every 100ms, for up-to 100x (10 seconds total)
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 100,
            strategy: BackoffStrategy::Constant,
            max_delay: None,
            jitter: None,
        }
    }
}

impl RetryPolicy {
    pub fn constant(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            strategy: BackoffStrategy::Constant,
            ..Default::default()
        }
    }

    pub fn linear(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            strategy: BackoffStrategy::Linear,
            ..Default::default()
        }
    }

    pub fn exponential(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            strategy: BackoffStrategy::Exponential,
            ..Default::default()
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::constant(Duration::ZERO, 1)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn validate(&self) -> KvLockResult<()> {
        if self.max_attempts == 0 {
            return Err(KvLockError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before the next attempt. `retry` counts failed attempts so far,
    /// starting at 1, so the first linear retry waits `interval` rather than
    /// zero. Saturates instead of overflowing, then applies `max_delay` and
    /// `jitter`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let base = match self.strategy {
            BackoffStrategy::Constant => self.interval,
            BackoffStrategy::Linear => self.interval.saturating_mul(retry),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                self.interval.saturating_mul(factor)
            }
        };

        let capped = match self.max_delay {
            Some(cap) => base.min(cap),
            None => base,
        };

        match self.jitter {
            Some(jitter) => jitter_delay(capped, jitter.as_millis() as u64),
            None => capped,
        }
    }
}

/// Connection settings for the Redis-backed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    /// User name
    pub username: Option<String>,
    /// PASSWORD
    pub password: Option<String>,
    /// Database number
    pub database: i64,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_database(mut self, db: i64) -> Self {
        self.database = db;
        self
    }
}

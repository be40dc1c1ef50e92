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

use redis::RedisError;
use thiserror::Error;

pub type KvLockResult<T> = std::result::Result<T, KvLockError>;

#[derive(Error, Debug)]
pub enum KvLockError {
    /// Backend or network failure reported by the key/value store.
    #[error("Store error: {0}")]
    StoreError(String),

    /// The lock was held by another owner for every configured attempt.
    /// Expected under contention; callers decide whether to retry or abort.
    #[error("Lock on '{key}' unavailable after {attempts} attempts")]
    LockUnavailable { key: String, attempts: u32 },

    /// The stored token no longer matches: the lock expired, was stolen
    /// after expiry, or was already released.
    #[error("Lock on '{0}' not held")]
    LockNotHeld(String),

    /// The caller aborted waiting before the retries were exhausted.
    #[error("Lock acquisition cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<RedisError> for KvLockError {
    fn from(err: RedisError) -> Self {
        KvLockError::StoreError(err.to_string())
    }
}

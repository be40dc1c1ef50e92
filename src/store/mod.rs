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
mod blocking;
mod non_blocking;

pub use blocking::*;
pub use non_blocking::*;

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::errors::KvLockResult;

/// Remote key/value store contract - asynchronous version.
///
/// `set_if_absent` and `delete_if_equals` must be atomic on the backend;
/// mutual exclusion of the locks built on top rests entirely on them.
#[async_trait]
pub trait AsyncKeyValueStore: Send + Sync {
    /// Returns the value at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> KvLockResult<Option<Vec<u8>>>;

    /// Saves a new value for `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvLockResult<()>;

    /// Removes `key`, returning whether it existed.
    async fn delete(&self, key: &str) -> KvLockResult<bool>;

    /// Atomic conditional-set: stores `key -> value` with `ttl` only when
    /// the key is absent. Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> KvLockResult<bool>;

    /// Atomic compare-and-delete guarded by value equality. Returns whether
    /// the key was removed.
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> KvLockResult<bool>;
}

/// Remote key/value store contract - blocking version.
pub trait SyncKeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> KvLockResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvLockResult<()>;
    fn delete(&self, key: &str) -> KvLockResult<bool>;
    fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> KvLockResult<bool>;
    fn delete_if_equals(&self, key: &str, expected: &[u8]) -> KvLockResult<bool>;
}

/// Entry shared by the blocking and non-blocking in-memory stores.
#[derive(Clone, Debug)]
pub(crate) struct MemoryEntry {
    pub value: Vec<u8>,
    pub expires_at: Option<Instant>,
}

impl MemoryEntry {
    pub fn new(value: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

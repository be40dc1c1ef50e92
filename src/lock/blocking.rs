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
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::errors::{KvLockError, KvLockResult};
use crate::lock::{validate_ttl, Lock};
use crate::store::SyncKeyValueStore;
use crate::util::get_lock_token;

/// === SyncLockManager (blocking distributed lock manager) ===
///
/// Same semantics as the asynchronous manager with `thread::sleep` between
/// attempts. Blocking callers bound their waiting through `max_attempts`;
/// there is no cancellation token on this side.
pub struct SyncLockManager<S> {
    store: Arc<S>,
    default_policy: RetryPolicy,
}

impl<S: SyncKeyValueStore> SyncLockManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn acquire(&self, key: &str, ttl: Duration) -> KvLockResult<Lock> {
        self.acquire_with_policy(key, ttl, &self.default_policy)
    }

    pub fn acquire_with_policy(
        &self,
        key: &str,
        ttl: Duration,
        policy: &RetryPolicy,
    ) -> KvLockResult<Lock> {
        validate_ttl(ttl)?;
        policy.validate()?;

        let token = get_lock_token();

        for attempt in 1..=policy.max_attempts {
            if self.store.set_if_absent(key, token.as_bytes(), ttl)? {
                debug!(key, attempt, "lock acquired");
                return Ok(Lock::with_token(key.to_string(), token, ttl));
            }

            if attempt == policy.max_attempts {
                break;
            }

            thread::sleep(policy.delay_for(attempt));
        }

        warn!(key, attempts = policy.max_attempts, "lock unavailable, retries exhausted");
        Err(KvLockError::LockUnavailable {
            key: key.to_string(),
            attempts: policy.max_attempts,
        })
    }

    pub fn try_acquire(&self, key: &str, ttl: Duration) -> KvLockResult<Option<Lock>> {
        validate_ttl(ttl)?;
        let token = get_lock_token();
        if self.store.set_if_absent(key, token.as_bytes(), ttl)? {
            Ok(Some(Lock::with_token(key.to_string(), token, ttl)))
        } else {
            Ok(None)
        }
    }

    pub fn release(&self, lock: &Lock) -> KvLockResult<()> {
        if self.store.delete_if_equals(&lock.key, lock.token.as_bytes())? {
            debug!(key = %lock.key, "lock released");
            Ok(())
        } else {
            Err(KvLockError::LockNotHeld(lock.key.clone()))
        }
    }

    pub fn is_locked(&self, key: &str) -> KvLockResult<bool> {
        Ok(self.store.get(key)?.is_some())
    }
}

impl<S> Clone for SyncLockManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            default_policy: self.default_policy.clone(),
        }
    }
}

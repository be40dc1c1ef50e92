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
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::errors::{KvLockError, KvLockResult};
use crate::lock::{validate_ttl, Lock};
use crate::store::AsyncKeyValueStore;
use crate::util::{get_lock_token, num_milliseconds};

/// === LockManager (asynchronous distributed lock manager) ===
///
/// Stateless aside from the injected store handle; share one instance
/// across tasks for concurrent lock operations. Mutual exclusion rests
/// entirely on the store's atomic conditional-set.
pub struct LockManager<S> {
    store: Arc<S>,
    default_policy: RetryPolicy,
}

impl<S: AsyncKeyValueStore> LockManager<S> {
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

    /// Acquire an exclusive lock on `key`, retrying per the manager's
    /// default policy.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> KvLockResult<Lock> {
        self.acquire_inner(key, ttl, &self.default_policy, None).await
    }

    /// Acquire with a caller-supplied retry policy.
    pub async fn acquire_with_policy(
        &self,
        key: &str,
        ttl: Duration,
        policy: &RetryPolicy,
    ) -> KvLockResult<Lock> {
        self.acquire_inner(key, ttl, policy, None).await
    }

    /// Acquire with a cancellation token; cancelling mid-wait aborts the
    /// retry loop promptly with `Cancelled`.
    pub async fn acquire_with_cancel(
        &self,
        key: &str,
        ttl: Duration,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> KvLockResult<Lock> {
        self.acquire_inner(key, ttl, policy, Some(cancel)).await
    }

    /// Single attempt, no waiting. `None` means the lock is held elsewhere.
    pub async fn try_acquire(&self, key: &str, ttl: Duration) -> KvLockResult<Option<Lock>> {
        validate_ttl(ttl)?;
        let token = get_lock_token();
        if self.store.set_if_absent(key, token.as_bytes(), ttl).await? {
            Ok(Some(Lock::with_token(key.to_string(), token, ttl)))
        } else {
            Ok(None)
        }
    }

    async fn acquire_inner(
        &self,
        key: &str,
        ttl: Duration,
        policy: &RetryPolicy,
        cancel: Option<&CancellationToken>,
    ) -> KvLockResult<Lock> {
        validate_ttl(ttl)?;
        policy.validate()?;

        // One fresh token per call, reused across attempts
        let token = get_lock_token();

        for attempt in 1..=policy.max_attempts {
            if let Some(cancel) = cancel {
                if cancel.is_cancelled() {
                    return Err(KvLockError::Cancelled);
                }
            }

            if self.store.set_if_absent(key, token.as_bytes(), ttl).await? {
                debug!(key, attempt, "lock acquired");
                return Ok(Lock::with_token(key.to_string(), token, ttl));
            }

            if attempt == policy.max_attempts {
                break;
            }

            let delay = policy.delay_for(attempt);
            debug!(
                key,
                attempt,
                delay_ms = num_milliseconds(&delay),
                "lock held elsewhere, backing off"
            );
            match cancel {
                Some(cancel) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(KvLockError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                }
                None => sleep(delay).await,
            }
        }

        warn!(key, attempts = policy.max_attempts, "lock unavailable, retries exhausted");
        Err(KvLockError::LockUnavailable {
            key: key.to_string(),
            attempts: policy.max_attempts,
        })
    }

    /// Release a held lock. Fails with `LockNotHeld` when the store's value
    /// no longer matches the lock's token (expired, stolen or already
    /// released).
    pub async fn release(&self, lock: &Lock) -> KvLockResult<()> {
        if self
            .store
            .delete_if_equals(&lock.key, lock.token.as_bytes())
            .await?
        {
            debug!(key = %lock.key, "lock released");
            Ok(())
        } else {
            Err(KvLockError::LockNotHeld(lock.key.clone()))
        }
    }

    /// Check if any owner currently holds `key`.
    pub async fn is_locked(&self, key: &str) -> KvLockResult<bool> {
        Ok(self.store.get(key).await?.is_some())
    }
}

impl<S> Clone for LockManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            default_policy: self.default_policy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AsyncMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Memory store wrapper counting conditional-set attempts.
    struct CountingStore {
        inner: AsyncMemoryStore,
        attempts: AtomicU32,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: AsyncMemoryStore::new(),
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AsyncKeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> KvLockResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvLockResult<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> KvLockResult<bool> {
            self.inner.delete(key).await
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &[u8],
            ttl: Duration,
        ) -> KvLockResult<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.inner.set_if_absent(key, value, ttl).await
        }

        async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> KvLockResult<bool> {
            self.inner.delete_if_equals(key, expected).await
        }
    }

    /// Store whose backend is unreachable.
    struct FailingStore;

    #[async_trait]
    impl AsyncKeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> KvLockResult<Option<Vec<u8>>> {
            Err(KvLockError::StoreError("connection refused".to_string()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: &[u8],
            _ttl: Option<Duration>,
        ) -> KvLockResult<()> {
            Err(KvLockError::StoreError("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> KvLockResult<bool> {
            Err(KvLockError::StoreError("connection refused".to_string()))
        }

        async fn set_if_absent(
            &self,
            _key: &str,
            _value: &[u8],
            _ttl: Duration,
        ) -> KvLockResult<bool> {
            Err(KvLockError::StoreError("connection refused".to_string()))
        }

        async fn delete_if_equals(&self, _key: &str, _expected: &[u8]) -> KvLockResult<bool> {
            Err(KvLockError::StoreError("connection refused".to_string()))
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::constant(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_acquire_on_empty_store_succeeds_first_attempt() {
        let store = Arc::new(CountingStore::new());
        let manager = LockManager::new(store.clone());

        let lock = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();

        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(lock.key, "job-1");
        assert!(!lock.is_expired());
        assert!(lock.remaining_time() > Duration::from_secs(29));
        assert!(manager.is_locked("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_contended_acquire_exhausts_exactly_max_attempts() {
        let store = Arc::new(CountingStore::new());
        let manager = LockManager::new(store.clone());

        let holder = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();

        let err = manager
            .acquire_with_policy("job-1", Duration::from_secs(30), &fast_policy(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KvLockError::LockUnavailable { attempts: 5, .. }
        ));
        // 1 for the holder, then exactly max_attempts for the loser
        assert_eq!(store.attempts.load(Ordering::SeqCst), 6);

        manager.release(&holder).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_acquire_single_winner() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store).with_policy(fast_policy(3));

        let m1 = manager.clone();
        let m2 = manager.clone();
        let t1 = tokio::spawn(async move { m1.acquire("job-1", Duration::from_secs(30)).await });
        let t2 = tokio::spawn(async move { m2.acquire("job-1", Duration::from_secs(30)).await });

        let r1 = t1.await.unwrap();
        let r2 = t2.await.unwrap();

        let winners = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);

        let loser = if r1.is_err() { r1 } else { r2 };
        assert!(matches!(
            loser.unwrap_err(),
            KvLockError::LockUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_release_with_wrong_token_fails() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store);

        let lock = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();

        let forged = Lock::with_token(
            "job-1".to_string(),
            "not-the-token".to_string(),
            Duration::from_secs(30),
        );
        assert!(matches!(
            manager.release(&forged).await.unwrap_err(),
            KvLockError::LockNotHeld(_)
        ));
        // The real holder is unaffected
        assert!(manager.is_locked("job-1").await.unwrap());

        manager.release(&lock).await.unwrap();
        assert!(matches!(
            manager.release(&lock).await.unwrap_err(),
            KvLockError::LockNotHeld(_)
        ));
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store).with_policy(fast_policy(3));

        let first = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();
        manager.release(&first).await.unwrap();

        let second = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();
        assert_ne!(first.token, second.token);
        manager.release(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lock_is_reclaimed() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store).with_policy(fast_policy(3));

        let first = manager.acquire("job-1", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first.is_expired());

        // The store reclaimed the key; a new owner takes over
        let second = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();
        assert!(matches!(
            manager.release(&first).await.unwrap_err(),
            KvLockError::LockNotHeld(_)
        ));
        manager.release(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_aborts_retry_loop_promptly() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store);

        let _holder = manager.acquire("job-1", Duration::from_secs(30)).await.unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_manager = manager.clone();
        let started = Instant::now();
        let handle = tokio::spawn(async move {
            let policy = RetryPolicy::constant(Duration::from_millis(50), 1000);
            task_manager
                .acquire_with_cancel("job-1", Duration::from_secs(30), &policy, &task_cancel)
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result.unwrap_err(), KvLockError::Cancelled));
        // Far below the ~50s the policy would otherwise wait out
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_try_acquire_is_single_shot() {
        let store = Arc::new(CountingStore::new());
        let manager = LockManager::new(store.clone());

        let lock = manager
            .try_acquire("job-1", Duration::from_secs(30))
            .await
            .unwrap()
            .expect("empty store");
        assert!(manager
            .try_acquire("job-1", Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);

        manager.release(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_errors_surface_without_retry() {
        let manager = LockManager::new(Arc::new(FailingStore));

        let err = manager
            .acquire_with_policy("job-1", Duration::from_secs(30), &fast_policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, KvLockError::StoreError(_)));

        let lock = Lock::with_token(
            "job-1".to_string(),
            "token".to_string(),
            Duration::from_secs(30),
        );
        assert!(matches!(
            manager.release(&lock).await.unwrap_err(),
            KvLockError::StoreError(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected() {
        let store = Arc::new(AsyncMemoryStore::new());
        let manager = LockManager::new(store);

        assert!(matches!(
            manager.acquire("job-1", Duration::ZERO).await.unwrap_err(),
            KvLockError::ConfigError(_)
        ));

        let zero_attempts = RetryPolicy::constant(Duration::from_millis(1), 0);
        assert!(matches!(
            manager
                .acquire_with_policy("job-1", Duration::from_secs(30), &zero_attempts)
                .await
                .unwrap_err(),
            KvLockError::ConfigError(_)
        ));
    }
}

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

use std::time::{Duration, SystemTime};

use crate::errors::{KvLockError, KvLockResult};

/// === Exclusive claim on a named resource ===
///
/// Plain value independent of any backend client type. The store reclaims
/// the key once `ttl` passes; the holder is not notified, so callers must
/// tolerate silent loss of ownership after expiry.
#[derive(Debug, Clone)]
pub struct Lock {
    pub key: String,
    /// Opaque random value proving ownership
    pub token: String,
    pub ttl: Duration,
    pub acquired_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Lock {
    pub(crate) fn with_token(key: String, token: String, ttl: Duration) -> Self {
        let acquired_at = SystemTime::now();
        let expires_at = acquired_at + ttl;

        Self {
            key,
            token,
            ttl,
            acquired_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn remaining_time(&self) -> Duration {
        self.expires_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::from_secs(0))
    }
}

pub(crate) fn validate_ttl(ttl: Duration) -> KvLockResult<()> {
    if ttl.is_zero() {
        return Err(KvLockError::ConfigError(
            "ttl must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

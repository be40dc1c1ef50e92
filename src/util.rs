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
use std::time::Duration;
use rand::Rng;
use uuid::Uuid;

/// Fresh opaque token proving lock ownership.
pub fn get_lock_token() -> String {
    Uuid::new_v4().to_string()
}

pub fn num_milliseconds(duration: &Duration) -> u64 {
    duration.as_millis() as u64
}

pub fn jitter_delay(base_delay: Duration, jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return base_delay;
    }
    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(0..=jitter_ms);
    if rng.gen_bool(0.5) {
        base_delay + Duration::from_millis(jitter)
    } else {
        base_delay - Duration::from_millis(jitter).min(base_delay)
    }
}

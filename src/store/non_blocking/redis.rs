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
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::time::Duration;
use tracing::debug;

use crate::config::RedisStoreConfig;
use crate::errors::KvLockResult;
use crate::scripts;
use crate::store::AsyncKeyValueStore;
use crate::util::num_milliseconds;

/// Redis-backed key/value store - asynchronous version.
///
/// `set_if_absent` maps to `SET NX PX`; `delete_if_equals` runs the
/// token-guarded release script. Both are atomic on the server.
pub struct AsyncRedisStore {
    connection: MultiplexedConnection,
}

impl AsyncRedisStore {
    pub async fn connect(config: &RedisStoreConfig) -> KvLockResult<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.database,
                username: config.username.clone(),
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = Client::open(info)?;
        let connection = client.get_multiplexed_async_connection().await?;
        debug!(host = %config.host, port = config.port, "connected to redis store");
        Ok(Self { connection })
    }

    // The multiplexed connection is a cheap clone sharing one socket
    fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl AsyncKeyValueStore for AsyncRedisStore {
    async fn get(&self, key: &str) -> KvLockResult<Option<Vec<u8>>> {
        let mut conn = self.connection();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvLockResult<()> {
        let mut conn = self.connection();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(num_milliseconds(&ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvLockResult<bool> {
        let mut conn = self.connection();
        let deleted: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> KvLockResult<bool> {
        let mut conn = self.connection();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(num_milliseconds(&ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> KvLockResult<bool> {
        let mut conn = self.connection();
        let deleted: i64 = scripts::RELEASE_SCRIPT
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

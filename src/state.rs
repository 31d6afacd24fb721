//! # Deployment State Store
//!
//! Records, per namespace and repository, the last commit that was applied so
//! the next pass can tell whether anything changed.
//!
//! Keys have the form `k8s-deployer/<namespace>/<repository-uri>` and values
//! are commit hashes. A missing key is a normal outcome (`Ok(None)`), distinct
//! from a failure to talk to the store.
//!
//! Two implementations are provided: [`RedisStore`] for real deployments and
//! [`MemoryStore`] for tests and embedding. There are no transactions; two
//! concurrent runs against one namespace simply race on the last write.

use std::collections::BTreeMap;

use log::info;
use redis::Commands;

use crate::defaults::STATE_KEY_PREFIX;
use crate::error::{Error, Result};

/// Key under which the last applied commit of `uri` in `namespace` is stored.
pub fn state_key(namespace: &str, uri: &str) -> String {
    format!("{}/{}/{}", STATE_KEY_PREFIX, namespace, uri)
}

/// Prefix shared by every key of `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}/{}/", STATE_KEY_PREFIX, namespace)
}

/// Trait for the persisted key/value state - allows mocking in tests
pub trait StateStore {
    /// Read a key. `Ok(None)` means the key does not exist.
    fn get(&mut self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete every key that belongs to `namespace`.
    fn clear_namespace(&mut self, namespace: &str) -> Result<()>;
}

/// State kept in a Redis server.
pub struct RedisStore {
    connection: redis::Connection,
}

impl RedisStore {
    /// Connect to `addr` (`host:port` or a `redis://` URL) and check it answers.
    pub fn connect(addr: &str) -> Result<Self> {
        let unavailable = |e: redis::RedisError| Error::StoreUnavailable {
            addr: addr.to_string(),
            message: e.to_string(),
        };

        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{}/", addr)
        };
        let client = redis::Client::open(url).map_err(unavailable)?;
        let mut connection = client.get_connection().map_err(unavailable)?;
        redis::cmd("PING")
            .query::<String>(&mut connection)
            .map_err(unavailable)?;

        Ok(Self { connection })
    }
}

fn store_error(key: &str, e: redis::RedisError) -> Error {
    Error::Store {
        key: key.to_string(),
        message: e.to_string(),
    }
}

impl StateStore for RedisStore {
    fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.connection
            .get::<_, Option<String>>(key)
            .map_err(|e| store_error(key, e))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.connection
            .set::<_, _, ()>(key, value)
            .map_err(|e| store_error(key, e))
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<()> {
        let pattern = format!("{}*", namespace_prefix(namespace));
        let keys: Vec<String> = self
            .connection
            .keys(&pattern)
            .map_err(|e| store_error(&pattern, e))?;

        for key in keys {
            info!("Removing: {}", key);
            self.connection
                .del::<_, ()>(&key)
                .map_err(|e| store_error(&key, e))?;
        }

        Ok(())
    }
}

/// State kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, ordered by key.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl StateStore for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<()> {
        let prefix = namespace_prefix(namespace);
        self.entries.retain(|key, _| {
            let keep = !key.starts_with(&prefix);
            if !keep {
                info!("Removing: {}", key);
            }
            keep
        });
        Ok(())
    }
}

//! Live Redis backend using the `redis` crate's synchronous connection.

use super::{KeyType, KeyspaceStore, ScanBatch, ScanCursor, ScanOptions};
use crate::error::{ConfigError, StoreError};
use redis::{Connection, RedisError};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Parameters for opening a store connection
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Server URL, e.g. `redis://127.0.0.1:6379/`
    pub url: String,
    /// ACL user name (requires a password)
    pub username: Option<String>,
    /// Password sent with `AUTH`
    pub password: Option<String>,
    /// Logical database selected with `SELECT`
    pub db: i64,
    /// Connect, read and write timeout
    pub timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            username: None,
            password: None,
            db: 0,
            timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl ConnectionSettings {
    /// Build a URL from a host and port
    pub fn for_host(host: &str, port: u16) -> Self {
        Self {
            url: format!("redis://{}:{}/", host, port),
            ..Self::default()
        }
    }

    /// Check the settings without touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db < 0 {
            return Err(ConfigError::Connection(format!(
                "database index must not be negative (got {})",
                self.db
            )));
        }
        if self.username.is_some() && self.password.is_none() {
            return Err(ConfigError::Connection(
                "a username requires a password".to_string(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Connection(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A keyspace backed by a live Redis connection
///
/// The store owns its connection. Dropping the store closes it, so the
/// connection is released on every exit path, including an abandoned scan.
pub struct RedisStore {
    connection: Connection,
    url: String,
}

impl RedisStore {
    /// Connect, authenticate and select the configured database
    pub fn connect(settings: &ConnectionSettings) -> Result<Self, StoreError> {
        settings
            .validate()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let client = redis::Client::open(settings.url.as_str()).map_err(classify_connect)?;
        let mut connection = match settings.timeout {
            Some(timeout) => client.get_connection_with_timeout(timeout),
            None => client.get_connection(),
        }
        .map_err(classify_connect)?;

        connection
            .set_read_timeout(settings.timeout)
            .map_err(classify_connect)?;
        connection
            .set_write_timeout(settings.timeout)
            .map_err(classify_connect)?;

        if let Some(ref password) = settings.password {
            let mut auth = redis::cmd("AUTH");
            if let Some(ref username) = settings.username {
                auth.arg(username);
            }
            auth.arg(password)
                .query::<()>(&mut connection)
                .map_err(classify_connect)?;
        }

        if settings.db != 0 {
            redis::cmd("SELECT")
                .arg(settings.db)
                .query::<()>(&mut connection)
                .map_err(classify_connect)?;
        }

        info!(url = %settings.url, db = settings.db, "Connected to Redis");

        Ok(Self {
            connection,
            url: settings.url.clone(),
        })
    }

    /// Round-trip a `PING` to confirm the server answers commands
    pub fn ping(&mut self) -> Result<(), StoreError> {
        let reply: String = redis::cmd("PING")
            .query(&mut self.connection)
            .map_err(|e| classify(e, "PING", ""))?;
        debug!(url = %self.url, reply = %reply, "Server answered PING");
        Ok(())
    }
}

impl KeyspaceStore for RedisStore {
    fn iterate(
        &mut self,
        cursor: ScanCursor,
        options: &ScanOptions,
    ) -> Result<ScanBatch, StoreError> {
        // Key names are binary-safe; only UTF-8 names can be inspected
        let (next, names): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
            .arg(cursor.position())
            .arg("MATCH")
            .arg(&options.pattern)
            .arg("COUNT")
            .arg(options.count)
            .query(&mut self.connection)
            .map_err(|e| classify(e, "SCAN", &options.pattern))?;

        let mut batch = ScanBatch {
            cursor: ScanCursor::new(next),
            ..ScanBatch::default()
        };
        for name in names {
            match String::from_utf8(name) {
                Ok(key) => batch.keys.push(key),
                Err(e) => batch.undecodable.push(e.into_bytes()),
            }
        }

        Ok(batch)
    }

    fn type_of(&mut self, key: &str) -> Result<KeyType, StoreError> {
        let tag: String = redis::cmd("TYPE")
            .arg(key)
            .query(&mut self.connection)
            .map_err(|e| classify(e, "TYPE", key))?;

        Ok(KeyType::from_tag(&tag))
    }

    fn size_of(&mut self, key: &str, key_type: &KeyType) -> Result<u64, StoreError> {
        let Some(command) = key_type.size_command() else {
            return Err(StoreError::Unmeasurable {
                key: key.to_string(),
                key_type: key_type.to_string(),
            });
        };

        redis::cmd(command)
            .arg(key)
            .query(&mut self.connection)
            .map_err(|e| classify(e, command, key))
    }
}

impl Drop for RedisStore {
    fn drop(&mut self) {
        debug!(url = %self.url, "Releasing Redis connection");
    }
}

fn is_connectivity(error: &RedisError) -> bool {
    error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
        || error.is_timeout()
}

/// Sort a failed command into fatal and per-key errors
fn classify(error: RedisError, command: &'static str, key: &str) -> StoreError {
    if is_connectivity(&error) {
        StoreError::Connection(error.to_string())
    } else {
        StoreError::Command {
            command,
            key: key.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Every failure while opening a connection leaves no usable handle
fn classify_connect(error: RedisError) -> StoreError {
    StoreError::Connection(error.to_string())
}

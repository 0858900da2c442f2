use libsql::{Builder, Connection};
use std::sync::{Arc, Mutex};

use crate::config::DatabaseConfig;
use crate::error::{Result, SpliceError};

/// Handle to the tabular store. One connection is reused across calls; after
/// a failure the next use re-establishes it, retrying once before giving up.
pub struct Database {
    db: Arc<libsql::Database>,
    conn: Arc<Mutex<Option<Connection>>>,
    busy_timeout_ms: u64,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            conn: Arc::new(Mutex::new(None)),
            busy_timeout_ms: config.busy_timeout_ms,
        };
        // Establish the initial connection eagerly so startup fails loudly on
        // an unreadable store.
        database.connection().await?;

        Ok(database)
    }

    /// The reused connection, (re)established on demand.
    pub async fn connection(&self) -> Result<Connection> {
        if let Some(conn) = self.conn.lock().unwrap().clone() {
            return Ok(conn);
        }

        let conn = match self.open().await {
            Ok(conn) => conn,
            Err(first) => {
                tracing::warn!(error = %first, "Database connection failed, retrying once");
                self.open().await.map_err(|_| {
                    SpliceError::ConnectionUnavailable(format!(
                        "Database connection failed: {first}"
                    ))
                })?
            }
        };

        *self.conn.lock().unwrap() = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection so the next use reconnects.
    pub fn invalidate_connection(&self) {
        *self.conn.lock().unwrap() = None;
    }

    async fn open(&self) -> Result<Connection> {
        let conn = self.db.connect()?;

        let busy_timeout_sql = format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms);
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                error = %error,
                "Failed to set SQLite busy_timeout"
            );
        }

        Ok(conn)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            conn: Arc::clone(&self.conn),
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

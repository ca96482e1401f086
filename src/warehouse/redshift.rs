//! [`Warehouse`] over a single Redshift connection

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, Connection, Executor, Statement};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use crate::statement::column_probe_statement;

use super::Warehouse;

/// SQLSTATE for `insufficient_privilege`
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Redshift client speaking the PostgreSQL wire protocol
///
/// Holds one connection; concurrent calls are serialized.
pub struct RedshiftClient {
    conn: Mutex<Option<PgConnection>>,
    quote_columns: bool,
}

impl RedshiftClient {
    /// Open a connection to the configured cluster
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connecting to warehouse"
        );

        let connecting = PgConnection::connect_with(&options);
        let conn = tokio::time::timeout(config.connect_timeout, connecting)
            .await
            .map_err(|_| Error::Query {
                message: format!(
                    "timed out after {:?} connecting to {}:{}",
                    config.connect_timeout, config.host, config.port
                ),
            })?
            .map_err(map_sqlx_error)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            quote_columns: config.quote_columns,
        })
    }
}

#[async_trait]
impl Warehouse for RedshiftClient {
    async fn probe_columns(&self, query: &str) -> Result<Vec<String>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        // Describing the prepared probe yields the row shape without executing it
        let probe = column_probe_statement(query);
        let statement = conn
            .prepare(&probe)
            .await
            .map_err(map_sqlx_error)?;

        Ok(statement
            .columns()
            .iter()
            .map(|column| column_label(column.name(), self.quote_columns))
            .collect())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        conn.execute(sqlx::raw_sql(statement))
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close().await.map_err(map_sqlx_error)?;
            debug!("warehouse connection closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redshift"
    }
}

fn closed() -> Error {
    Error::Query {
        message: "warehouse connection is closed".to_string(),
    }
}

fn column_label(name: &str, quote: bool) -> String {
    if quote {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

fn map_sqlx_error(error: sqlx::Error) -> Error {
    match &error {
        sqlx::Error::Database(db) => classify(db.code().as_deref(), db.message()),
        _ => classify(None, &error.to_string()),
    }
}

/// `Permission` for privilege and bucket access failures, `Query` otherwise
fn classify(code: Option<&str>, message: &str) -> Error {
    let lower = message.to_ascii_lowercase();
    if code == Some(INSUFFICIENT_PRIVILEGE)
        || lower.contains("permission denied")
        || lower.contains("access denied")
    {
        Error::Permission {
            message: message.to_string(),
        }
    } else {
        Error::Query {
            message: message.to_string(),
        }
    }
}

//! The query façade handed to route handlers.
//!
//! [`ShimDb`] takes SQL text plus positional parameters, the way a relational
//! driver does, and runs it as one round trip against a [`Backend`].
//!
//! ```rust
//! use greenline::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = MemoryBackend::new().with_table("tasks", vec![]);
//! let db = ShimDb::new(backend);
//!
//! let inserted = db
//!     .query("INSERT INTO tasks (id, title) VALUES ($1, $2)", &[json!(1), json!("Réviser")])
//!     .await
//!     .unwrap();
//! assert_eq!(inserted.row_count(), 1);
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::ast::Statement;
use crate::backend::{Backend, MemoryBackend, PostgresBackend, RestBackend, TableQuery};
use crate::binding::{Binder, ParamBinding};
use crate::config::{BackendKind, Config};
use crate::error::{QueryError, ShimError, ShimResult};
use crate::parser;
use crate::result::QueryResult;
use crate::translator;

/// SQL-over-table-API client. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct ShimDb {
    backend: Arc<dyn Backend>,
    binding: ParamBinding,
}

impl std::fmt::Debug for ShimDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShimDb")
            .field("backend", &self.backend.name())
            .field("binding", &self.binding)
            .finish()
    }
}

impl Default for ShimDb {
    fn default() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl ShimDb {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Wrap a backend that is already shared elsewhere.
    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            binding: ParamBinding::default(),
        }
    }

    /// Set how `$n` operands map onto parameters.
    pub fn with_binding(mut self, binding: ParamBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn binding(&self) -> ParamBinding {
        self.binding
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Build the backend the configuration points at and probe it once.
    ///
    /// A failed probe is logged, not returned: the process keeps starting
    /// and individual queries report their own errors.
    pub async fn connect(config: &Config) -> ShimResult<Self> {
        let db = Self::from_config(config).await?;

        match db.check_connection(&config.shim.probe_table).await {
            Ok(()) => tracing::info!("Connected ({} backend)", db.backend.name()),
            Err(e) => tracing::error!("Connection check failed: {}", e),
        }
        Ok(db)
    }

    /// Build the configured backend without probing it.
    pub async fn from_config(config: &Config) -> ShimResult<Self> {
        let db = match config.backend_kind()? {
            BackendKind::Rest { url, key } => {
                tracing::info!("Connecting to table API at {}", url);
                Self::new(RestBackend::new(url, key)?)
            }
            BackendKind::Postgres { url } => {
                tracing::info!("Connecting to PostgreSQL...");
                Self::new(PostgresBackend::connect(&url).await?)
            }
        }
        .with_binding(config.shim.binding);
        Ok(db)
    }

    /// One `SELECT * FROM <probe_table> LIMIT 1` round trip.
    pub async fn check_connection(&self, probe_table: &str) -> ShimResult<()> {
        let probe = TableQuery::from(probe_table).limit(1);
        self.backend.execute(&probe).await?;
        Ok(())
    }

    /// Parse and translate without executing.
    pub fn prepare(
        &self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<(Statement, TableQuery), QueryError> {
        self.plan(sql, params)
            .map_err(|e| QueryError::new(sql, params, e))
    }

    fn plan(&self, sql: &str, params: &[JsonValue]) -> ShimResult<(Statement, TableQuery)> {
        let stmt = parser::parse(sql)?;
        let binder = Binder::new(params, self.binding, stmt.kind);
        let query = translator::translate(&stmt, &binder)?;
        Ok((stmt, query))
    }

    /// Run a statement and shape the records like a relational driver.
    pub async fn query(&self, sql: &str, params: &[JsonValue]) -> Result<QueryResult, QueryError> {
        tracing::debug!("Executing SQL: {} params={:?}", sql, params);

        match self.run(sql, params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let kind = parser::statement_kind(sql)
                    .map(|k| k.to_string())
                    .unwrap_or_else(|_| "?".to_string());
                tracing::error!("{} failed: {} | sql={} params={:?}", kind, e, sql, params);
                Err(QueryError::new(sql, params, e))
            }
        }
    }

    async fn run(&self, sql: &str, params: &[JsonValue]) -> ShimResult<QueryResult> {
        let (stmt, query) = self.plan(sql, params)?;
        let records = self.backend.execute(&query).await.map_err(ShimError::from)?;
        Ok(QueryResult::normalize(&stmt, records))
    }

    /// Release the backend's connections.
    pub async fn end(&self) {
        self.backend.close().await;
        tracing::info!("Connection closed ({} backend)", self.backend.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;
    use crate::backend::Row;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_prepare_does_not_execute() {
        let backend = Arc::new(MemoryBackend::new().with_table("tasks", vec![]));
        let db = ShimDb::from_arc(backend.clone());
        let (stmt, query) = db
            .prepare("DELETE FROM tasks WHERE id = $1", &[json!(1)])
            .unwrap();
        assert_eq!(stmt.kind, StatementKind::Delete);
        assert!(query.is_mutation());
        assert_eq!(backend.rows("tasks").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_query_error_carries_context() {
        let db = ShimDb::default();
        let err = db.query("SELECT * FROM missing", &[json!("x")]).await.unwrap_err();
        assert_eq!(err.sql, "SELECT * FROM missing");
        assert_eq!(err.params, vec![json!("x")]);
        assert!(matches!(err.kind(), ShimError::Backend(_)));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let db = ShimDb::new(
            MemoryBackend::new().with_table("conversations", vec![row(json!({"id": 1}))]),
        );
        assert!(db.check_connection("conversations").await.is_ok());
        assert!(db.check_connection("nope").await.is_err());
        db.end().await;
    }

    #[test]
    fn test_binding_builder() {
        let db = ShimDb::default().with_binding(ParamBinding::ClauseOrder);
        assert_eq!(db.binding(), ParamBinding::ClauseOrder);
        assert_eq!(db.backend().name(), "memory");
    }
}

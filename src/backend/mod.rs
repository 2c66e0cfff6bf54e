//! The hosted table API seam.
//!
//! [`TableQuery`] is the fluent query object the translator builds:
//!
//! ```rust
//! use greenline::backend::TableQuery;
//! use serde_json::json;
//!
//! let query = TableQuery::from("orders")
//!     .select(["id", "status"])
//!     .eq("client_id", json!(7))
//!     .order("created_at", false)
//!     .limit(5);
//! assert_eq!(query.filters.len(), 1);
//! ```
//!
//! A [`Backend`] executes one query per round trip and returns the affected
//! or selected records.

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use rest::RestBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::ast::Operator;

/// A record as returned by the backend.
pub type Row = serde_json::Map<String, JsonValue>;

/// What the query does to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Select,
    Insert(Vec<Row>),
    Update(Row),
    Delete,
}

/// One filter directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: Operator,
    pub value: JsonValue,
}

/// One sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A single-table query in the backend's native shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub table: String,
    pub operation: Operation,
    /// Selected or returned columns; empty means all.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TableQuery {
    /// Start a query against `table`. Selects all columns until told otherwise.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operation: Operation::Select,
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Columns to select, or to return from a mutation.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn insert(mut self, records: Vec<Row>) -> Self {
        self.operation = Operation::Insert(records);
        self
    }

    pub fn update(mut self, values: Row) -> Self {
        self.operation = Operation::Update(values);
        self
    }

    pub fn delete(mut self) -> Self {
        self.operation = Operation::Delete;
        self
    }

    /// Equality filter.
    pub fn eq(self, column: impl Into<String>, value: JsonValue) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    pub fn filter(mut self, column: impl Into<String>, op: Operator, value: JsonValue) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value,
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self.operation, Operation::Select)
    }
}

/// Errors reported by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The API answered with an error payload.
    #[error("{message} (HTTP {status}{})", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Network or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Database driver error.
    #[error("Database error: {0}")]
    Database(String),

    /// Response body could not be decoded into records.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Table unknown to the backend.
    #[error("Unknown table: {0}")]
    UnknownTable(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(", code {}", c))
        .unwrap_or_default()
}

/// Executes [`TableQuery`] values. Shared by every call; implementations hold
/// no per-call state.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run the query and return the selected or affected records.
    async fn execute(&self, query: &TableQuery) -> Result<Vec<Row>, BackendError>;

    /// Release connections. The default does nothing.
    async fn close(&self) {}

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

//! # GreenLine data layer
//!
//! Route handlers speak SQL with `$n` placeholders; the data lives behind a
//! hosted table API. This crate sits in between: it parses the small SQL
//! subset the handlers emit, translates it into one fluent table query, runs
//! it, and hands back `{ rows, rowCount }` like a relational driver would.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use greenline::prelude::*;
//! use serde_json::json;
//!
//! let config = Config::load(None)?;
//! let db = ShimDb::connect(&config).await?;
//!
//! let result = db
//!     .query(
//!         "SELECT * FROM orders WHERE status = $1 ORDER BY created_at DESC LIMIT 5",
//!         &[json!("pending")],
//!     )
//!     .await?;
//! println!("{} orders", result.rows().len());
//! ```
//!
//! ## Pipeline
//!
//! | Stage        | Module         | Output          |
//! |--------------|----------------|-----------------|
//! | Dispatch     | [`parser`]     | `StatementKind` |
//! | Extraction   | [`parser`]     | [`ast::Statement`] |
//! | Binding      | [`binding`]    | JSON operands   |
//! | Translation  | [`translator`] | [`backend::TableQuery`] |
//! | Execution    | [`backend`]    | records         |
//! | Normalizing  | [`result`]     | [`result::QueryResult`] |

pub mod ast;
pub mod backend;
pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod result;
pub mod translator;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::backend::{
        Backend, BackendError, MemoryBackend, PostgresBackend, RestBackend, Row, TableQuery,
    };
    pub use crate::binding::ParamBinding;
    pub use crate::config::Config;
    pub use crate::engine::ShimDb;
    pub use crate::error::*;
    pub use crate::parser::parse;
    pub use crate::result::QueryResult;
}

/// Parse an SQL statement into its AST.
///
/// # Example
///
/// ```
/// use greenline::parse;
///
/// let stmt = parse("SELECT * FROM orders WHERE status = $1").unwrap();
/// assert_eq!(stmt.table, "orders");
/// ```
pub fn parse(input: &str) -> Result<ast::Statement, error::ShimError> {
    parser::parse(input)
}

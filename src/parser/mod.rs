//! SQL statement parser using nom.
//!
//! Accepts the small SQL subset the route handlers emit and turns it into a
//! [`Statement`]. The first word picks the statement kind:
//!
//! ```text
//! SELECT * FROM orders WHERE status = $1 ORDER BY created_at DESC LIMIT 10
//! ──┬───   ─────┬─────  ─────┬─────────  ──────────┬───────────  ───┬────
//!   │           │            │                      │                └── paging
//!   │           │            │                      └── sort directives
//!   │           │            └── conjunction of predicates
//!   │           └── projection + table (required)
//!   └── dispatch keyword
//! ```

mod clauses;
mod statements;
pub mod tokens;

#[cfg(test)]
mod tests;

use crate::ast::{Statement, StatementKind};
use crate::error::{ShimError, ShimResult};

/// Parse a complete statement.
///
/// Syntax error positions are byte offsets into `input` as given, leading
/// whitespace included.
pub fn parse(input: &str) -> ShimResult<Statement> {
    let trimmed = input.trim();
    let lead = input.len() - input.trim_start().len();

    let parsed = match statement_kind(trimmed)? {
        StatementKind::Select => statements::parse_select(trimmed),
        StatementKind::Insert => statements::parse_insert(trimmed),
        StatementKind::Update => statements::parse_update(trimmed),
        StatementKind::Delete => statements::parse_delete(trimmed),
    };
    parsed.map_err(|e| match e {
        ShimError::Syntax { position, message } => ShimError::Syntax {
            position: position + lead,
            message,
        },
        other => other,
    })
}

/// Pick the statement kind from the first whitespace-delimited word.
pub fn statement_kind(input: &str) -> ShimResult<StatementKind> {
    let token = input
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    match token.as_str() {
        "SELECT" => Ok(StatementKind::Select),
        "INSERT" => Ok(StatementKind::Insert),
        "UPDATE" => Ok(StatementKind::Update),
        "DELETE" => Ok(StatementKind::Delete),
        _ => Err(ShimError::Unsupported(token)),
    }
}

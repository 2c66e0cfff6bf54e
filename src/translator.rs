//! Statement to table-query translation.
//!
//! Turns a parsed [`Statement`] and the caller's parameters into the single
//! [`TableQuery`] the backend runs. Mutations always ask for the affected
//! records back, so row counts come from real data.

use serde_json::Value as JsonValue;

use crate::ast::{Statement, StatementKind, Value};
use crate::backend::{Row, TableQuery};
use crate::binding::{Binder, Slot};
use crate::error::{ShimError, ShimResult};

/// Translate a statement using an already configured binder.
pub fn translate(stmt: &Statement, binder: &Binder<'_>) -> ShimResult<TableQuery> {
    let query = TableQuery::from(stmt.table.as_str());

    let query = match stmt.kind {
        StatementKind::Select => {
            let mut query = query.select(Statement::column_names(&stmt.columns));
            query = apply_filters(query, stmt, binder)?;
            for term in &stmt.order_by {
                query = query.order(term.column.as_str(), term.order == crate::ast::SortOrder::Asc);
            }
            if let Some(limit) = &stmt.limit {
                query = query.limit(paging(binder, limit, "LIMIT")?);
            }
            if let Some(offset) = &stmt.offset {
                query = query.offset(paging(binder, offset, "OFFSET")?);
            }
            query
        }
        StatementKind::Insert => {
            let columns = Statement::column_names(&stmt.columns);
            let mut record = Row::new();
            for (i, column) in columns.iter().enumerate() {
                // Without VALUES, column i reads the i-th parameter.
                let implied = Value::Param(i + 1);
                let value = stmt.values.get(i).unwrap_or(&implied);
                record.insert(column.clone(), binder.resolve(value, Slot::Column(i))?);
            }
            query.insert(vec![record]).select(returning(stmt))
        }
        StatementKind::Update => {
            let mut values = Row::new();
            for assignment in &stmt.assignments {
                values.insert(
                    assignment.column.clone(),
                    binder.resolve(&assignment.value, Slot::Assignment)?,
                );
            }
            let query = query.update(values).select(returning(stmt));
            apply_filters(query, stmt, binder)?
        }
        StatementKind::Delete => {
            let query = query.delete().select(returning(stmt));
            apply_filters(query, stmt, binder)?
        }
    };

    Ok(query)
}

fn apply_filters(
    mut query: TableQuery,
    stmt: &Statement,
    binder: &Binder<'_>,
) -> ShimResult<TableQuery> {
    for cond in &stmt.filters {
        let value = if cond.op.takes_value() {
            binder.resolve(&cond.value, Slot::Filter)?
        } else {
            JsonValue::Null
        };
        query = query.filter(cond.column.as_str(), cond.op, value);
    }
    Ok(query)
}

fn returning(stmt: &Statement) -> Vec<String> {
    stmt.returning
        .as_deref()
        .map(Statement::column_names)
        .unwrap_or_default()
}

/// LIMIT/OFFSET must bind to a non-negative integer. Numeric strings are
/// accepted since query-string values often arrive as text.
fn paging(binder: &Binder<'_>, value: &Value, clause: &'static str) -> ShimResult<u64> {
    let resolved = binder.resolve(value, Slot::Paging)?;
    let n = match &resolved {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| ShimError::InvalidPaging {
        clause,
        value: resolved.to_string(),
    })
}

//! Relational-driver result shape.

use serde::{Deserialize, Serialize};

use crate::ast::{Statement, StatementKind};
use crate::backend::Row;

/// What a `query` call resolves to: `{ rows, rowCount }`, with absent fields
/// omitted when serialised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl QueryResult {
    /// Shape backend records for the statement that produced them.
    ///
    /// SELECT gives `rows`; INSERT and UPDATE give both; DELETE gives
    /// `rowCount`, plus `rows` when it has a RETURNING clause.
    pub fn normalize(stmt: &Statement, records: Vec<Row>) -> Self {
        let count = records.len() as u64;
        match stmt.kind {
            StatementKind::Select => Self {
                rows: Some(records),
                row_count: None,
            },
            StatementKind::Insert | StatementKind::Update => Self {
                rows: Some(records),
                row_count: Some(count),
            },
            StatementKind::Delete => Self {
                rows: stmt.returning.is_some().then_some(records),
                row_count: Some(count),
            },
        }
    }

    /// Rows, or an empty slice when the statement reports none.
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or_default()
    }

    /// Affected row count, defaulting to 0.
    pub fn row_count(&self) -> u64 {
        self.row_count.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Column;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| json!({ "id": i }).as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_shapes_per_kind() {
        let select = QueryResult::normalize(&Statement::new(StatementKind::Select, "t"), records(2));
        assert_eq!(serde_json::to_value(&select).unwrap(), json!({"rows": [{"id": 0}, {"id": 1}]}));

        let insert = QueryResult::normalize(&Statement::new(StatementKind::Insert, "t"), records(1));
        assert_eq!(
            serde_json::to_value(&insert).unwrap(),
            json!({"rows": [{"id": 0}], "rowCount": 1})
        );

        let update = QueryResult::normalize(&Statement::new(StatementKind::Update, "t"), vec![]);
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"rows": [], "rowCount": 0}));

        let delete = QueryResult::normalize(&Statement::new(StatementKind::Delete, "t"), records(3));
        assert_eq!(serde_json::to_value(&delete).unwrap(), json!({"rowCount": 3}));
        assert!(delete.rows().is_empty());
    }

    #[test]
    fn test_delete_returning_keeps_rows() {
        let mut stmt = Statement::new(StatementKind::Delete, "orders");
        stmt.returning = Some(vec![Column::Star]);
        let result = QueryResult::normalize(&stmt, records(1));
        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_select_row_count_defaults_to_zero() {
        let result = QueryResult::normalize(&Statement::new(StatementKind::Select, "t"), records(4));
        assert_eq!(result.row_count, None);
        assert_eq!(result.row_count(), 0);
    }
}

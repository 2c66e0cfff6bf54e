//! In-process table store.
//!
//! Behaves like the hosted API for everything a [`TableQuery`] can express:
//! SQL comparison semantics (NULL never equals anything), LIKE patterns with
//! `%` and `_`, PostgreSQL default null ordering (last ascending, first
//! descending), then offset and limit.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Backend, BackendError, Filter, Operation, Order, Row, TableQuery};
use crate::ast::Operator;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with initial rows.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.get_mut().insert(name.into(), rows);
        self
    }

    /// Create an empty table if it does not exist yet.
    pub async fn create_table(&self, name: impl Into<String>) {
        self.tables.write().await.entry(name.into()).or_default();
    }

    /// Snapshot of a table's rows, in storage order.
    pub async fn rows(&self, table: &str) -> Option<Vec<Row>> {
        self.tables.read().await.get(table).cloned()
    }
}

impl MemoryBackend {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Row>, BackendError> {
        let tables = self.tables.read().await;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| BackendError::UnknownTable(query.table.clone()))?;

        let mut selected: Vec<Row> = rows
            .iter()
            .filter(|row| matches_all(row, &query.filters))
            .cloned()
            .collect();
        sort_rows(&mut selected, &query.order);
        let selected = selected
            .into_iter()
            .skip(query.offset.unwrap_or(0) as usize)
            .take(query.limit.map(|n| n as usize).unwrap_or(usize::MAX))
            .collect();
        Ok(project(selected, &query.columns))
    }

    /// Apply `change` to the table under the write lock; it returns the
    /// affected rows.
    async fn mutate<F>(&self, query: &TableQuery, change: F) -> Result<Vec<Row>, BackendError>
    where
        F: FnOnce(&mut Vec<Row>) -> Vec<Row>,
    {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&query.table)
            .ok_or_else(|| BackendError::UnknownTable(query.table.clone()))?;
        Ok(project(change(rows), &query.columns))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn execute(&self, query: &TableQuery) -> Result<Vec<Row>, BackendError> {
        match &query.operation {
            Operation::Select => self.select(query).await,
            Operation::Insert(records) => {
                self.mutate(query, |rows| {
                    rows.extend(records.iter().cloned());
                    records.clone()
                })
                .await
            }
            Operation::Update(values) => {
                self.mutate(query, |rows| {
                    let mut updated = Vec::new();
                    for row in rows.iter_mut().filter(|row| matches_all(row, &query.filters)) {
                        for (column, value) in values {
                            row.insert(column.clone(), value.clone());
                        }
                        updated.push(row.clone());
                    }
                    updated
                })
                .await
            }
            Operation::Delete => {
                self.mutate(query, |rows| {
                    let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
                        .into_iter()
                        .partition(|row| matches_all(row, &query.filters));
                    *rows = kept;
                    removed
                })
                .await
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let field = row.get(&filter.column).unwrap_or(&JsonValue::Null);
    let value = &filter.value;

    match filter.op {
        Operator::IsNull => field.is_null(),
        Operator::IsNotNull => !field.is_null(),
        _ if field.is_null() || value.is_null() => false,
        Operator::Eq => compare(field, value) == Some(Ordering::Equal),
        Operator::Ne => compare(field, value) != Some(Ordering::Equal),
        Operator::Gt => compare(field, value) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(field, value), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(field, value) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(field, value), Some(Ordering::Less | Ordering::Equal)),
        Operator::Like | Operator::ILike => match (field.as_str(), value.as_str()) {
            (Some(text), Some(pattern)) if filter.op == Operator::ILike => {
                like(&pattern.to_lowercase(), &text.to_lowercase())
            }
            (Some(text), Some(pattern)) => like(pattern, text),
            _ => false,
        },
    }
}

/// Compare two non-null JSON scalars of the same family.
fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

/// SQL LIKE: `%` matches any run, `_` any single character.
fn like(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if let Some((bp, bt)) = backtrack {
            pi = bp + 1;
            ti = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

fn type_rank(v: &JsonValue) -> u8 {
    match v {
        JsonValue::Bool(_) => 0,
        JsonValue::Number(_) => 1,
        JsonValue::String(_) => 2,
        JsonValue::Array(_) | JsonValue::Object(_) => 3,
        JsonValue::Null => 4,
    }
}

/// Total order with NULL above every value.
fn sort_key_cmp(a: &JsonValue, b: &JsonValue) -> Ordering {
    compare(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
}

fn sort_rows(rows: &mut [Row], order: &[Order]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for o in order {
            let x = a.get(&o.column).unwrap_or(&JsonValue::Null);
            let y = b.get(&o.column).unwrap_or(&JsonValue::Null);
            let ord = sort_key_cmp(x, y);
            let ord = if o.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(rows: Vec<Row>, columns: &[String]) -> Vec<Row> {
    if columns.is_empty() {
        return rows;
    }
    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn stock() -> MemoryBackend {
        MemoryBackend::new().with_table(
            "inventory",
            vec![
                row(json!({"id": 1, "name": "Vis M4", "quantity": 120, "location": "A1"})),
                row(json!({"id": 2, "name": "Ecrou M4", "quantity": 8, "location": null})),
                row(json!({"id": 3, "name": "Vis M6", "quantity": 40, "location": "B2"})),
            ],
        )
    }

    #[test]
    fn test_like() {
        assert!(like("Vis%", "Vis M4"));
        assert!(like("%M_", "Ecrou M4"));
        assert!(like("%", ""));
        assert!(!like("Vis_", "Vis M4"));
        assert!(like("%o%u%", "Ecrou"));
    }

    #[tokio::test]
    async fn test_select_filter_sort_limit() {
        let db = stock();
        let query = TableQuery::from("inventory")
            .filter("name", Operator::Like, json!("Vis%"))
            .order("quantity", true)
            .limit(1)
            .select(["id"]);
        let rows = db.execute(&query).await.unwrap();
        assert_eq!(rows, vec![row(json!({"id": 3}))]);
    }

    #[tokio::test]
    async fn test_null_ordering_and_comparisons() {
        let db = stock();
        let query = TableQuery::from("inventory").order("location", false);
        let rows = db.execute(&query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let query = TableQuery::from("inventory").eq("location", JsonValue::Null);
        assert!(db.execute(&query).await.unwrap().is_empty());

        let query = TableQuery::from("inventory").filter("location", Operator::IsNull, JsonValue::Null);
        assert_eq!(db.execute(&query).await.unwrap().len(), 1);

        let query = TableQuery::from("inventory").filter("quantity", Operator::Lte, json!(40.0));
        assert_eq!(db.execute(&query).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_return_affected_rows() {
        let db = stock();

        let mut values = Row::new();
        values.insert("quantity".into(), json!(0));
        let updated = db
            .execute(&TableQuery::from("inventory").update(values).eq("id", json!(2)))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["quantity"], json!(0));

        let deleted = db
            .execute(&TableQuery::from("inventory").delete().eq("id", json!(99)))
            .await
            .unwrap();
        assert!(deleted.is_empty());

        let deleted = db
            .execute(&TableQuery::from("inventory").delete().filter("quantity", Operator::Gt, json!(10)))
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert_eq!(db.rows("inventory").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let err = MemoryBackend::new()
            .execute(&TableQuery::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownTable(t) if t == "nope"));

        let insert = TableQuery::from("nope").insert(vec![row(json!({"id": 1}))]);
        let err = MemoryBackend::new().execute(&insert).await.unwrap_err();
        assert!(matches!(err, BackendError::UnknownTable(_)));
    }

    #[tokio::test]
    async fn test_insert_projects_returned_columns() {
        let db = stock();
        let query = TableQuery::from("inventory")
            .insert(vec![row(json!({"id": 4, "name": "Rondelle", "quantity": 500}))])
            .select(["id"]);
        assert_eq!(db.execute(&query).await.unwrap(), vec![row(json!({"id": 4}))]);
        assert_eq!(db.rows("inventory").await.unwrap().len(), 4);
    }
}

//! Direct PostgreSQL connection using sqlx.
//!
//! Values travel as `jsonb` parameters and are typed on the server through
//! `jsonb_populate_record(NULL::table, $n)`, so the translator never needs to
//! know column types. Records come back as `to_jsonb` rows.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::{Backend, BackendError, Filter, Operation, Order, Row, TableQuery};
use crate::ast::Operator;

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to a database using a connection URL.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let backend = PostgresBackend::connect("postgres://localhost/greenline").await?;
    /// ```
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| BackendError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn execute(&self, query: &TableQuery) -> Result<Vec<Row>, BackendError> {
        let plan = build_sql(query);

        let mut statement = sqlx::query_scalar::<_, Json<JsonValue>>(&plan.sql);
        for bind in plan.binds {
            statement = statement.bind(Json(bind));
        }

        let records = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackendError::Database(e.to_string()))?;

        records
            .into_iter()
            .map(|Json(value)| match value {
                JsonValue::Object(row) => Ok(row),
                other => Err(BackendError::Decode(format!("expected an object, got {}", other))),
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// SQL text plus its `jsonb` parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPlan {
    pub sql: String,
    pub binds: Vec<JsonValue>,
}

/// Render a table query as one PostgreSQL statement returning `jsonb` rows.
pub fn build_sql(query: &TableQuery) -> SqlPlan {
    let mut builder = SqlBuilder {
        table: quote(&query.table),
        binds: Vec::new(),
    };
    let sql = match &query.operation {
        Operation::Select => builder.select(query),
        Operation::Insert(records) => builder.insert(records, &query.columns),
        Operation::Update(values) => builder.update(values, query),
        Operation::Delete => builder.delete(query),
    };
    SqlPlan {
        sql,
        binds: builder.binds,
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

struct SqlBuilder {
    table: String,
    binds: Vec<JsonValue>,
}

impl SqlBuilder {
    fn bind(&mut self, value: JsonValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    /// `(jsonb_populate_record(NULL::table, $n))."col"` with `$n = {col: value}`.
    fn typed(&mut self, column: &str, value: &JsonValue) -> String {
        let mut record = Row::new();
        record.insert(column.to_string(), value.clone());
        let p = self.bind(JsonValue::Object(record));
        format!("(jsonb_populate_record(NULL::{}, {})).{}", self.table, p, quote(column))
    }

    fn where_sql(&mut self, filters: &[Filter]) -> String {
        if filters.is_empty() {
            return String::new();
        }
        let predicates: Vec<String> = filters
            .iter()
            .map(|f| {
                let column = quote(&f.column);
                match f.op {
                    Operator::IsNull | Operator::IsNotNull => {
                        format!("{} {}", column, f.op.as_sql())
                    }
                    op => {
                        let rhs = self.typed(&f.column, &f.value);
                        format!("{} {} {}", column, op.as_sql(), rhs)
                    }
                }
            })
            .collect();
        format!(" WHERE {}", predicates.join(" AND "))
    }

    fn returning(columns: &[String]) -> String {
        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn wrap_mutation(mutation: String) -> String {
        format!(
            "WITH affected AS ({}) SELECT to_jsonb(affected.*) FROM affected",
            mutation
        )
    }

    fn select(&mut self, query: &TableQuery) -> String {
        let projection = if query.columns.is_empty() {
            "to_jsonb(t.*)".to_string()
        } else {
            let pairs: Vec<String> = query
                .columns
                .iter()
                .map(|c| format!("'{}', t.{}", c.replace('\'', "''"), quote(c)))
                .collect();
            format!("jsonb_build_object({})", pairs.join(", "))
        };

        let mut sql = format!("SELECT {} FROM {} AS t", projection, self.table);
        sql.push_str(&self.where_sql(&query.filters));
        sql.push_str(&order_sql(&query.order));
        if let Some(n) = query.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        if let Some(n) = query.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }
        sql
    }

    fn insert(&mut self, records: &[Row], returning: &[String]) -> String {
        let mut columns: Vec<&String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
        }

        let mutation = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                self.table,
                Self::returning(returning)
            )
        } else {
            let cols = columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            let p = self.bind(JsonValue::Array(
                records.iter().cloned().map(JsonValue::Object).collect(),
            ));
            format!(
                "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_recordset(NULL::{table}, {p}) RETURNING {ret}",
                table = self.table,
                cols = cols,
                p = p,
                ret = Self::returning(returning)
            )
        };
        Self::wrap_mutation(mutation)
    }

    fn update(&mut self, values: &Row, query: &TableQuery) -> String {
        let p = self.bind(JsonValue::Object(values.clone()));
        let sets: Vec<String> = values
            .keys()
            .map(|c| {
                format!(
                    "{col} = (jsonb_populate_record(NULL::{table}, {p})).{col}",
                    col = quote(c),
                    table = self.table,
                    p = p
                )
            })
            .collect();
        let mut mutation = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        mutation.push_str(&self.where_sql(&query.filters));
        mutation.push_str(&format!(" RETURNING {}", Self::returning(&query.columns)));
        Self::wrap_mutation(mutation)
    }

    fn delete(&mut self, query: &TableQuery) -> String {
        let mut mutation = format!("DELETE FROM {}", self.table);
        mutation.push_str(&self.where_sql(&query.filters));
        mutation.push_str(&format!(" RETURNING {}", Self::returning(&query.columns)));
        Self::wrap_mutation(mutation)
    }
}

fn order_sql(order: &[Order]) -> String {
    if order.is_empty() {
        return String::new();
    }
    let terms: Vec<String> = order
        .iter()
        .map(|o| format!("{} {}", quote(&o.column), if o.ascending { "ASC" } else { "DESC" }))
        .collect();
    format!(" ORDER BY {}", terms.join(", "))
}

//! Parsed statement representation.
//!
//! A [`Statement`] lives for one call: the parser builds it, the translator
//! consumes it. `Display` renders it back as canonical SQL, which is what the
//! CLI shows in `explain` and what the logs print.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The statement kind, chosen from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A projected or targeted column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    /// All columns (*)
    Star,
    /// Named column
    Named(String),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Star => write!(f, "*"),
            Column::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Comparison operators accepted in WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (<>, !=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Pattern match (LIKE)
    Like,
    /// Case-insensitive pattern match (ILIKE)
    ILike,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl Operator {
    /// Map a symbolic or keyword operator token onto the supported set.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.to_ascii_uppercase().as_str() {
            "=" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "LIKE" => Operator::Like,
            "ILIKE" => Operator::ILike,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operator compares against an operand.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// An operand as written in the statement text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Parameter reference ($1, $2, etc.)
    Param(usize),
    /// CURRENT_TIMESTAMP / NOW()
    Now,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Param(n) => write!(f, "${}", n),
            Value::Now => write!(f, "CURRENT_TIMESTAMP"),
        }
    }
}

/// A single `column op value` predicate. WHERE clauses are conjunctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.takes_value() {
            write!(f, "{} {} {}", self.column, self.op.as_sql(), self.value)
        } else {
            write!(f, "{} {}", self.column, self.op.as_sql())
        }
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Asc => write!(f, "{} ASC", self.column),
            SortOrder::Desc => write!(f, "{} DESC", self.column),
        }
    }
}

/// One `column = value` pair of an UPDATE SET list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

/// A parsed statement.
///
/// Fields that do not apply to a kind stay empty: `values` is INSERT-only,
/// `assignments` UPDATE-only, ordering and paging SELECT-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub table: String,
    /// Projection for SELECT, target columns for INSERT.
    pub columns: Vec<Column>,
    pub values: Vec<Value>,
    pub assignments: Vec<Assignment>,
    pub filters: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Value>,
    pub offset: Option<Value>,
    pub returning: Option<Vec<Column>>,
}

impl Statement {
    /// An empty statement of the given kind against `table`.
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            assignments: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            returning: None,
        }
    }

    /// Named columns, with `*` expanding to an empty list.
    pub fn column_names(columns: &[Column]) -> Vec<String> {
        columns
            .iter()
            .filter_map(|c| match c {
                Column::Named(name) => Some(name.clone()),
                Column::Star => None,
            })
            .collect()
    }

    /// Highest `$n` referenced anywhere in the statement.
    pub fn max_placeholder(&self) -> usize {
        let operands = self
            .values
            .iter()
            .chain(self.assignments.iter().map(|a| &a.value))
            .chain(self.filters.iter().map(|c| &c.value))
            .chain(self.limit.iter())
            .chain(self.offset.iter());
        operands
            .filter_map(|v| match v {
                Value::Param(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StatementKind::Select => {
                let cols = if self.columns.is_empty() {
                    "*".to_string()
                } else {
                    join(&self.columns, ", ")
                };
                write!(f, "SELECT {} FROM {}", cols, self.table)?;
            }
            StatementKind::Insert => {
                write!(f, "INSERT INTO {} ({})", self.table, join(&self.columns, ", "))?;
                if !self.values.is_empty() {
                    write!(f, " VALUES ({})", join(&self.values, ", "))?;
                }
            }
            StatementKind::Update => {
                let sets: Vec<String> = self
                    .assignments
                    .iter()
                    .map(|a| format!("{} = {}", a.column, a.value))
                    .collect();
                write!(f, "UPDATE {} SET {}", self.table, sets.join(", "))?;
            }
            StatementKind::Delete => write!(f, "DELETE FROM {}", self.table)?,
        }

        if !self.filters.is_empty() {
            write!(f, " WHERE {}", join(&self.filters, " AND "))?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", join(&self.order_by, ", "))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        if let Some(returning) = &self.returning {
            write!(f, " RETURNING {}", join(returning, ", "))?;
        }
        Ok(())
    }
}

//! Positional parameter binding.
//!
//! Route handlers pass an SQL text plus a parameter array, the way a
//! relational driver expects. Two strategies map operands onto that array:
//!
//! - [`ParamBinding::Placeholder`] resolves `$n` to the n-th parameter and
//!   uses literals as written.
//! - [`ParamBinding::ClauseOrder`] ignores the operand text and binds fixed
//!   slots per clause: WHERE of SELECT/DELETE and SET of UPDATE take the first
//!   parameter, WHERE of UPDATE takes the second, INSERT column `i` takes
//!   parameter `i`. Handlers written against the old data layer rely on it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::ast::{StatementKind, Value};
use crate::error::{ShimError, ShimResult};

/// How operands are matched to caller parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamBinding {
    /// `$n` selects `params[n - 1]`.
    #[default]
    Placeholder,
    /// Fixed slot per clause, operand text ignored.
    ClauseOrder,
}

impl fmt::Display for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamBinding::Placeholder => write!(f, "placeholder"),
            ParamBinding::ClauseOrder => write!(f, "clause-order"),
        }
    }
}

impl FromStr for ParamBinding {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(ParamBinding::Placeholder),
            "clause-order" | "clause_order" | "legacy" => Ok(ParamBinding::ClauseOrder),
            other => Err(ShimError::Config(format!(
                "mode de liaison inconnu: '{}' (placeholder, clause-order)",
                other
            ))),
        }
    }
}

/// Where an operand sits in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// WHERE predicate.
    Filter,
    /// UPDATE SET right-hand side.
    Assignment,
    /// INSERT value for the column at this index.
    Column(usize),
    /// LIMIT / OFFSET.
    Paging,
}

/// Resolves operands for one call.
#[derive(Debug, Clone)]
pub struct Binder<'a> {
    params: &'a [JsonValue],
    mode: ParamBinding,
    kind: StatementKind,
    now: DateTime<Utc>,
}

impl<'a> Binder<'a> {
    pub fn new(params: &'a [JsonValue], mode: ParamBinding, kind: StatementKind) -> Self {
        Self {
            params,
            mode,
            kind,
            now: Utc::now(),
        }
    }

    /// Pin the timestamp `CURRENT_TIMESTAMP` resolves to.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn mode(&self) -> ParamBinding {
        self.mode
    }

    /// Resolve an operand to the JSON value sent to the backend.
    pub fn resolve(&self, value: &Value, slot: Slot) -> ShimResult<JsonValue> {
        if self.mode == ParamBinding::ClauseOrder && slot != Slot::Paging {
            let index = self.fixed_index(slot);
            return Ok(self.params.get(index).cloned().unwrap_or(JsonValue::Null));
        }

        match value {
            Value::Param(n) => self.placeholder(*n),
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Int(n) => Ok(JsonValue::from(*n)),
            Value::Float(f) => Ok(serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Now => Ok(JsonValue::String(
                self.now.to_rfc3339_opts(SecondsFormat::Micros, true),
            )),
        }
    }

    fn placeholder(&self, n: usize) -> ShimResult<JsonValue> {
        n.checked_sub(1)
            .and_then(|i| self.params.get(i))
            .cloned()
            .ok_or(ShimError::MissingParameter {
                index: n,
                provided: self.params.len(),
            })
    }

    fn fixed_index(&self, slot: Slot) -> usize {
        match (slot, self.kind) {
            (Slot::Column(i), _) => i,
            (Slot::Filter, StatementKind::Update) => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_binding_follows_numbers() {
        let params = [json!("a"), json!("b")];
        let binder = Binder::new(&params, ParamBinding::Placeholder, StatementKind::Select);
        assert_eq!(binder.resolve(&Value::Param(2), Slot::Filter).unwrap(), json!("b"));
        assert_eq!(binder.resolve(&Value::Param(1), Slot::Filter).unwrap(), json!("a"));
        assert_eq!(binder.resolve(&Value::Int(7), Slot::Filter).unwrap(), json!(7));
        assert!(matches!(
            binder.resolve(&Value::Param(3), Slot::Filter),
            Err(ShimError::MissingParameter { index: 3, provided: 2 })
        ));
    }

    #[test]
    fn test_clause_order_binding_uses_fixed_slots() {
        let params = [json!("new"), json!(42)];
        let binder = Binder::new(&params, ParamBinding::ClauseOrder, StatementKind::Update);
        assert_eq!(binder.resolve(&Value::Param(2), Slot::Assignment).unwrap(), json!("new"));
        assert_eq!(binder.resolve(&Value::Bool(true), Slot::Assignment).unwrap(), json!("new"));
        assert_eq!(binder.resolve(&Value::Param(1), Slot::Filter).unwrap(), json!(42));

        let binder = Binder::new(&params, ParamBinding::ClauseOrder, StatementKind::Delete);
        assert_eq!(binder.resolve(&Value::Param(2), Slot::Filter).unwrap(), json!("new"));
        assert_eq!(binder.resolve(&Value::Null, Slot::Column(5)).unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_now_is_stable_within_a_call() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let binder = Binder::new(&[], ParamBinding::Placeholder, StatementKind::Update).at(now);
        assert_eq!(
            binder.resolve(&Value::Now, Slot::Assignment).unwrap(),
            json!("2026-03-01T08:30:00.000000Z")
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("clause-order".parse::<ParamBinding>().unwrap(), ParamBinding::ClauseOrder);
        assert_eq!("Placeholder".parse::<ParamBinding>().unwrap(), ParamBinding::Placeholder);
        assert!("positional".parse::<ParamBinding>().is_err());
    }
}

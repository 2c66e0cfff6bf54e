//! Hosted table API over HTTP (PostgREST dialect, as exposed by Supabase).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{Backend, BackendError, Filter, Operation, Row, TableQuery};
use crate::ast::Operator;

/// Client for `{base_url}/rest/v1/{table}`.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    /// Create a client. `api_key` is sent both as `apikey` and as bearer token.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Create a client over an existing `reqwest::Client` (custom timeouts,
    /// proxies or TLS settings).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn execute(&self, query: &TableQuery) -> Result<Vec<Row>, BackendError> {
        let url = self.table_url(&query.table);

        let request = match &query.operation {
            Operation::Select => self.client.get(&url),
            Operation::Insert(records) => self.client.post(&url).json(records),
            Operation::Update(values) => self.client.patch(&url).json(values),
            Operation::Delete => self.client.delete(&url),
        };
        let mut request = request
            .query(&query_pairs(query))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if query.is_mutation() {
            request = request.header("Prefer", "return=representation");
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        decode_rows(&body)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// URL query pairs for a table query.
pub fn query_pairs(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    let select = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query.columns.join(",")
    };
    pairs.push(("select".to_string(), select));

    for filter in &query.filters {
        pairs.push((filter.column.clone(), filter_expr(filter)));
    }

    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect();
        pairs.push(("order".to_string(), order.join(",")));
    }
    if let Some(n) = query.limit {
        pairs.push(("limit".to_string(), n.to_string()));
    }
    if let Some(n) = query.offset {
        pairs.push(("offset".to_string(), n.to_string()));
    }
    pairs
}

/// `op.value` filter syntax. LIKE patterns use `*` for `%`.
fn filter_expr(filter: &Filter) -> String {
    let value = scalar(&filter.value);
    match filter.op {
        Operator::Eq => format!("eq.{}", value),
        Operator::Ne => format!("neq.{}", value),
        Operator::Gt => format!("gt.{}", value),
        Operator::Gte => format!("gte.{}", value),
        Operator::Lt => format!("lt.{}", value),
        Operator::Lte => format!("lte.{}", value),
        Operator::Like => format!("like.{}", value.replace('%', "*")),
        Operator::ILike => format!("ilike.{}", value.replace('%', "*")),
        Operator::IsNull => "is.null".to_string(),
        Operator::IsNotNull => "not.is.null".to_string(),
    }
}

fn scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => {
            let mut message = err.message.unwrap_or_else(|| format!("HTTP {}", status));
            for extra in [err.details, err.hint].into_iter().flatten() {
                message.push_str("; ");
                message.push_str(&extra);
            }
            BackendError::Api {
                status,
                code: err.code,
                message,
            }
        }
        Err(_) => BackendError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            },
        },
    }
}

/// Records from a response body. An empty body means no records.
fn decode_rows(body: &str) -> Result<Vec<Row>, BackendError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: JsonValue =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(row) => Ok(row),
                other => Err(BackendError::Decode(format!("expected an object, got {}", other))),
            })
            .collect(),
        JsonValue::Object(row) => Ok(vec![row]),
        other => Err(BackendError::Decode(format!("expected records, got {}", other))),
    }
}

//! Error types for the GreenLine data layer.
//!
//! Messages are in French: they travel up to the route handlers and from
//! there into the application logs and API responses.

use thiserror::Error;

use crate::backend::BackendError;

/// The main error type for statement parsing, translation and execution.
#[derive(Debug, Error)]
pub enum ShimError {
    /// A SELECT without an extractable `FROM <table>`.
    #[error("Table non trouvée dans la requête SELECT")]
    TableNotFound,

    /// `INSERT INTO <table> (<columns>)` not found.
    #[error("Format INSERT non reconnu")]
    InvalidInsert,

    /// `UPDATE <table> SET <assignments>` not found.
    #[error("Format UPDATE non reconnu")]
    InvalidUpdate,

    /// `DELETE FROM <table>` not found.
    #[error("Format DELETE non reconnu")]
    InvalidDelete,

    /// Leading keyword is not SELECT, INSERT, UPDATE or DELETE.
    #[error("Type de requête non supporté: {0}")]
    Unsupported(String),

    /// Comparison operator or connective outside the supported set.
    #[error("Prédicat non supporté: {0}")]
    UnsupportedPredicate(String),

    /// Text left over or malformed after the required fragments.
    #[error("Erreur de syntaxe à la position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// INSERT with a VALUES list that does not line up with its columns.
    #[error("Nombre de valeurs ({values}) différent du nombre de colonnes ({columns})")]
    ValueCount { columns: usize, values: usize },

    /// A `$n` placeholder past the end of the parameter list.
    #[error("Paramètre ${index} manquant ({provided} fourni(s))")]
    MissingParameter { index: usize, provided: usize },

    /// LIMIT/OFFSET bound to something that is not a non-negative integer.
    #[error("Valeur {clause} invalide: {value}")]
    InvalidPaging { clause: &'static str, value: String },

    /// The backend rejected or failed the translated query.
    #[error("Erreur du backend: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error.
    #[error("Erreur de configuration: {0}")]
    Config(String),
}

impl ShimError {
    /// Create a syntax error at the given byte position.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// True for errors raised before anything reached the backend.
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, Self::Backend(_) | Self::Config(_))
    }
}

/// A failed `ShimDb::query` call, carrying the statement text and parameters
/// for diagnostics.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct QueryError {
    pub sql: String,
    pub params: Vec<serde_json::Value>,
    #[source]
    pub source: ShimError,
}

impl QueryError {
    pub fn new(sql: &str, params: &[serde_json::Value], source: ShimError) -> Self {
        Self {
            sql: sql.to_string(),
            params: params.to_vec(),
            source,
        }
    }

    /// The underlying error.
    pub fn kind(&self) -> &ShimError {
        &self.source
    }
}

/// Result type alias for GreenLine operations.
pub type ShimResult<T> = Result<T, ShimError>;

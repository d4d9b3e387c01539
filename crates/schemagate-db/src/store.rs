//! Table read/write seam used by fixture refresh

use std::fmt;

/// Identifies a table in the target database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableHandle {
    /// Schema name (`None` for the search path default)
    pub schema: Option<String>,

    /// Table name
    pub name: String,
}

impl TableHandle {
    /// Table on the default search path
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Schema-qualified table
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Quoted SQL reference, e.g. `"public"."equation"`
    pub fn sql_ref(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Errors from table reads and writes
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed on {table}: {message}")]
    Query { table: String, message: String },

    #[error("Invalid row for {table}: {message}")]
    InvalidRow { table: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Delete-all and bulk-insert access to tables
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    /// Get the store name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Remove every row of `table`, returning the number removed
    async fn delete_all(&self, table: &TableHandle) -> Result<u64, StoreError>;

    /// Insert `rows` (JSON objects keyed by column name) in one statement
    async fn insert_rows(
        &self,
        table: &TableHandle,
        rows: Vec<serde_json::Value>,
    ) -> Result<u64, StoreError>;
}

/// Column names of a bulk insert, taken from the first row
pub fn row_columns(table: &TableHandle, rows: &[serde_json::Value]) -> Result<Vec<String>, StoreError> {
    let invalid = |message: String| StoreError::InvalidRow {
        table: table.to_string(),
        message,
    };

    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = first
        .as_object()
        .ok_or_else(|| invalid("rows must be JSON objects".to_string()))?
        .keys()
        .cloned()
        .collect();

    for (index, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .ok_or_else(|| invalid(format!("row {} is not a JSON object", index)))?;
        if object.len() != columns.len() || !columns.iter().all(|c| object.contains_key(c)) {
            return Err(invalid(format!("row {} has different columns than row 0", index)));
        }
    }

    Ok(columns)
}

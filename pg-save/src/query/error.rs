//! Erreurs du planificateur de requêtes

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Erreurs remontées par `fetch_table`, `run_query` et la description du catalogue
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("This utility is not meant to update data, query contains stop phrase \"{0}\"")]
    UnsafeQuery(String),

    #[error("Table is not found: {0}")]
    TableNotFound(String),

    #[error("Column is not found: {0}")]
    ColumnNotFound(String),

    #[error("Using undefined function: {0}")]
    UndefinedFunction(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Database error: {0}")]
    Database(#[source] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl From<tokio_postgres::Error> for QueryError {
    fn from(err: tokio_postgres::Error) -> Self {
        let Some(db) = err.as_db_error() else {
            return QueryError::Database(err);
        };
        let message = db.message().to_string();
        let code = db.code().clone();

        if code == SqlState::UNDEFINED_TABLE {
            QueryError::TableNotFound(message)
        } else if code == SqlState::UNDEFINED_COLUMN {
            QueryError::ColumnNotFound(message)
        } else if code == SqlState::UNDEFINED_FUNCTION || code == SqlState::UNDEFINED_PARAMETER {
            QueryError::UndefinedFunction(message)
        } else if code == SqlState::SYNTAX_ERROR {
            QueryError::Syntax(message)
        } else {
            QueryError::Database(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_query_message() {
        let err = QueryError::UnsafeQuery("drop ".into());
        assert_eq!(
            err.to_string(),
            "This utility is not meant to update data, query contains stop phrase \"drop \""
        );
    }

    #[test]
    fn test_table_not_found_message() {
        let err = QueryError::TableNotFound("public.nope".into());
        assert_eq!(err.to_string(), "Table is not found: public.nope");
    }
}

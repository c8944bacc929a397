use thiserror::Error as ThisError;

/// Failures raised by the data layer.
///
/// Every kind propagates to the immediate caller, nothing is retried or
/// suppressed.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed or disallowed input, for example an empty condition set where one is required.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A single row fetch matched zero rows.
    #[error("No row in `{table}` matches {conditions}")]
    NotFound { table: String, conditions: String },
    /// Read or write of a name that is neither a field nor a relationship of the model.
    #[error("`{name}` is neither a field nor a relationship of `{model}`")]
    UndefinedAttribute { model: &'static str, name: String },
    /// The gateway reported an error while running a statement.
    #[error("Database failure: {0:#}")]
    DatabaseFailure(anyhow::Error),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(..))
    }
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
    pub fn is_undefined_attribute(&self) -> bool {
        matches!(self, Error::UndefinedAttribute { .. })
    }
    pub fn is_database_failure(&self) -> bool {
        matches!(self, Error::DatabaseFailure(..))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// A column was requested that is not part of the owning schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Column \"{0}\" is not in the schema")]
pub struct ColumnNotFound(pub String);

#[derive(Error, Debug)]
pub enum WolldbError {
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    ColumnNotFound(#[from] ColumnNotFound),
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("Datasource not found: {0}")]
    DatasourceNotFound(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WolldbError>;

impl WolldbError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// Helper conversions
impl From<config::ConfigError> for WolldbError {
    fn from(e: config::ConfigError) -> Self { Self::Settings(e.to_string()) }
}
impl From<pest::error::Error<crate::thingy::Rule>> for WolldbError {
    fn from(e: pest::error::Error<crate::thingy::Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        Self::Parse { message: e.variant.message().to_string(), line: Some(line), col: Some(col) }
    }
}

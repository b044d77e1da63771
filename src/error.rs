use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid period '{0}': expected YYYY-MM with a month between 01 and 12")]
    InvalidPeriod(String),

    #[error("Dataset is missing required column: {0}")]
    MissingRequiredField(String),

    #[error("No data for reference period {0}")]
    MissingReferenceColumn(String),

    #[error("Invalid numeric value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

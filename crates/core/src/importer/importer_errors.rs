use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unknown statement format: {0}")]
    UnknownFormat(String),

    #[error("Could not decode statement: {0}")]
    Decode(String),

    #[error("Statement has no header row containing {0}")]
    MissingHeader(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

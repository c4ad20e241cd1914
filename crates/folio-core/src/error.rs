use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("No solution: {0}")]
    Unsolvable(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LottoError {
    #[error("Unknown lottery variant '{0}'")]
    UnknownVariant(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),
}

pub type LottoResult<T> = Result<T, LottoError>;

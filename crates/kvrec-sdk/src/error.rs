use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("codec error: {0}")]
    Codec(#[from] kvrec_codec::CodecError),

    #[error("store error: {0}")]
    Store(#[from] kvrec_store::StoreError),

    #[error("record error: {0}")]
    Record(#[from] kvrec_types::TypeError),

    #[error("no stored record at {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Index {index} is out of range for {host} ({len} rule(s) stored)")]
    IndexOutOfRange {
        host: String,
        index: i64,
        len: usize,
    },

    #[error("Template does not contain the expected {anchor} anchor")]
    TemplateMalformed { anchor: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

use std::io;

use thiserror::Error;

use crate::types::ContentType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No source URL configured for {0}")]
    MissingSourceUrl(ContentType),
    #[error("Transfer error: {0}")]
    Transfer(String),
    #[error("A download is already in progress")]
    Busy,
}

pub type Result<T> = std::result::Result<T, Error>;

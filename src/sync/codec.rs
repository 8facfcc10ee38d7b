//! Transfer encoding of documents: pretty printed JSON wrapped in standard base64, the way the
//! contents API expects file bodies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid document: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(STANDARD.encode(json))
}

/// The store wraps base64 at 60 columns, so whitespace is dropped before decoding.
pub fn decode<T: DeserializeOwned>(content: &str) -> Result<T, CodecError> {
    let compact = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    let bytes = STANDARD.decode(compact)?;
    Ok(serde_json::from_slice(&bytes)?)
}

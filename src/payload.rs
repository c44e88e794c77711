use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Payload
///
/// JSON body extractor. Unlike `axum::Json` it does not insist on a `Content-Type` header,
/// treats an empty body as `{}`, and reports malformed input as a 400 with a `detail` message.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
        parse_payload(&bytes).map(Payload)
    }
}

/// Parses a raw body. Exposed for handlers that must run permission checks before
/// looking at the body.
pub fn parse_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"{}")
    } else {
        serde_json::from_slice(bytes)
    };
    parsed.map_err(|e| ApiError::MalformedBody(e.to_string()))
}

//! API utility functions
//!
//! Stateless helpers for HTTP request processing, kept apart from the
//! handlers so they can be unit tested.

use axum::body::Body;
use axum::http::{HeaderMap, header};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::api::error::ApiError;

/// Parses and validates Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `application/json-patch+json`
/// - `text/json`
/// - Malformed media types
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}"))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Require a JSON Content-Type header.
pub fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;
    Ok(())
}

/// Collect the (already decompressed) body, refusing to buffer more than
/// `max_size` bytes.
pub async fn read_body(body: Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let collected = Limited::new(body, max_size).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge(max_size)
        } else {
            ApiError::InvalidPayload(format!("failed to read body: {err}"))
        }
    })?;
    Ok(collected.to_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_require_json_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_json(&headers),
            Err(ApiError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let data = read_body(Body::from(vec![7u8; 100]), 100).await.unwrap();
        assert_eq!(data.len(), 100);
    }

    #[tokio::test]
    async fn test_read_body_too_large() {
        let result = read_body(Body::from(vec![0u8; 1000]), 999).await;
        match result {
            Err(ApiError::PayloadTooLarge(limit)) => assert_eq!(limit, 999),
            other => panic!("Expected PayloadTooLarge error, got {other:?}"),
        }
    }
}

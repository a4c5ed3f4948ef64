//! Credential extraction from `Authorization` headers
//!
//! Both schemes share one shape: exactly two whitespace-separated fields,
//! the first being the literal scheme name.
//!
//! - `Authorization: Bearer <token>`
//! - `Authorization: ApiKey <key>`

use axum::http::{header, HeaderMap};
use chirpy_core::ErrorKind;
use thiserror::Error;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Header extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Malformed Authorization header")]
    MalformedHeader,
}

impl HeaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeaderError::MissingHeader => ErrorKind::Authentication,
            HeaderError::MalformedHeader => ErrorKind::Validation,
        }
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn extract_bearer(header_value: Option<&str>) -> Result<&str, HeaderError> {
    extract_scheme(header_value, BEARER_SCHEME)
}

/// Extract the key from an `ApiKey <key>` header value
pub fn extract_api_key(header_value: Option<&str>) -> Result<&str, HeaderError> {
    extract_scheme(header_value, API_KEY_SCHEME)
}

fn extract_scheme<'a>(
    header_value: Option<&'a str>,
    scheme: &str,
) -> Result<&'a str, HeaderError> {
    let value = header_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(HeaderError::MissingHeader)?;

    let mut fields = value.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(name), Some(credential), None) if name == scheme => Ok(credential),
        _ => Err(HeaderError::MalformedHeader),
    }
}

/// Read the `Authorization` header as text
///
/// A header that is present but not valid visible ASCII is malformed.
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, HeaderError> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| HeaderError::MalformedHeader))
        .transpose()
}

/// Extract a bearer token straight from request headers
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, HeaderError> {
    extract_bearer(authorization_header(headers)?)
}

/// Extract an API key straight from request headers
pub fn api_key_from_headers(headers: &HeaderMap) -> Result<&str, HeaderError> {
    extract_api_key(authorization_header(headers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Ok("abc123"));
        assert_eq!(extract_bearer(Some("Bearer   abc123  ")), Ok("abc123"));
    }

    #[test]
    fn test_extract_bearer_missing() {
        assert_eq!(extract_bearer(None), Err(HeaderError::MissingHeader));
        assert_eq!(extract_bearer(Some("")), Err(HeaderError::MissingHeader));
        assert_eq!(extract_bearer(Some("   ")), Err(HeaderError::MissingHeader));
    }

    #[test]
    fn test_extract_bearer_malformed() {
        for value in [
            "Basic xyz",
            "Bearer",
            "abc123",
            "Bearer a b",
            "bearer abc",
            "ApiKey abc",
        ] {
            assert_eq!(
                extract_bearer(Some(value)),
                Err(HeaderError::MalformedHeader),
                "value: {value:?}"
            );
        }
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(
            extract_api_key(Some("ApiKey f271c81ff7084ee5b99a5091b42d486e")),
            Ok("f271c81ff7084ee5b99a5091b42d486e")
        );
        assert_eq!(extract_api_key(None), Err(HeaderError::MissingHeader));
        assert_eq!(
            extract_api_key(Some("Bearer abc")),
            Err(HeaderError::MalformedHeader)
        );
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            bearer_from_headers(&headers),
            Err(HeaderError::MissingHeader)
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_from_headers(&headers), Ok("tok"));
        assert_eq!(
            api_key_from_headers(&headers),
            Err(HeaderError::MalformedHeader)
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftok").unwrap(),
        );
        assert_eq!(
            bearer_from_headers(&headers),
            Err(HeaderError::MalformedHeader)
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(HeaderError::MissingHeader.kind(), ErrorKind::Authentication);
        assert_eq!(HeaderError::MalformedHeader.kind(), ErrorKind::Validation);
    }
}

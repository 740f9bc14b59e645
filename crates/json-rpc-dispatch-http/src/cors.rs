//! CORS (Cross-Origin Resource Sharing) support

use hyper::HeaderMap;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, HeaderValue,
};
use tracing::warn;

/// CORS layer for adding appropriate headers
pub struct CorsLayer;

impl CorsLayer {
    /// Apply permissive CORS headers to a response
    pub fn apply_cors_headers(headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        Self::apply_common(headers);
    }

    /// Apply restrictive CORS headers for a specific origin
    pub fn apply_cors_headers_for_origin(headers: &mut HeaderMap, origin: &str) {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
                Self::apply_common(headers);
            }
            Err(err) => warn!("ignoring unusable CORS origin {:?}: {}", origin, err),
        }
    }

    fn apply_common(headers: &mut HeaderMap) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Accept, Authorization"),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_cors_headers() {
        let mut headers = HeaderMap::new();
        CorsLayer::apply_cors_headers(&mut headers);

        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "POST, OPTIONS"
        );
        assert!(headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(headers.contains_key(ACCESS_CONTROL_MAX_AGE));
    }

    #[test]
    fn test_apply_cors_headers_for_origin() {
        let mut headers = HeaderMap::new();
        CorsLayer::apply_cors_headers_for_origin(&mut headers, "https://example.com");

        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://example.com"
        );
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[test]
    fn test_invalid_origin_is_ignored() {
        let mut headers = HeaderMap::new();
        CorsLayer::apply_cors_headers_for_origin(&mut headers, "bad\norigin");
        assert!(headers.is_empty());
    }
}

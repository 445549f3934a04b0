//! Request tracking middleware
//!
//! Request ID generation and propagation, and masking of credentials in
//! the trace output.

use axum::http::HeaderName;
use tower_http::{
    propagate_header::PropagateHeaderLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::config::RequestTrackingConfig;

/// Correlation headers copied from the request onto the response
pub const PROPAGATE_HEADERS: &[&str] = &["x-trace-id", "x-span-id", "x-correlation-id"];

/// Sensitive headers that should be masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the request ID, falling back to `x-request-id` when the
/// configured name is not a valid header name
pub fn request_id_header(config: &RequestTrackingConfig) -> HeaderName {
    HeaderName::try_from(config.request_id_header.as_str()).unwrap_or_else(|_| {
        tracing::warn!(
            "Invalid request ID header '{}', using {}",
            config.request_id_header,
            DEFAULT_REQUEST_ID_HEADER
        );
        HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER)
    })
}

/// Assign a UUID v4 request ID when the caller did not send one
pub fn request_id_layer(header: HeaderName) -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header, MakeRequestUuid)
}

/// Echo the request ID on the response
pub fn request_id_propagation_layer(header: HeaderName) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header)
}

/// One propagation layer per correlation header
pub fn propagate_header_layers() -> impl Iterator<Item = PropagateHeaderLayer> {
    PROPAGATE_HEADERS
        .iter()
        .map(|name| PropagateHeaderLayer::new(HeaderName::from_static(*name)))
}

/// Mark credentials as sensitive so the trace layer never prints them
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(
        SENSITIVE_HEADERS
            .iter()
            .map(|name| HeaderName::from_static(*name)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_header_from_config() {
        let config = RequestTrackingConfig {
            request_id_header: "x-custom-id".to_string(),
            ..RequestTrackingConfig::default()
        };
        assert_eq!(request_id_header(&config), "x-custom-id");
    }

    #[test]
    fn test_invalid_request_id_header_falls_back() {
        let config = RequestTrackingConfig {
            request_id_header: "not a header".to_string(),
            ..RequestTrackingConfig::default()
        };
        assert_eq!(request_id_header(&config), DEFAULT_REQUEST_ID_HEADER);
    }

    #[test]
    fn test_header_constants_are_valid() {
        assert_eq!(propagate_header_layers().count(), PROPAGATE_HEADERS.len());
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        let _ = sensitive_headers_layer();
    }
}

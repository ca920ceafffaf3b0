//! Request identity.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Propagate the ID onto the response so clients and logs correlate
//! - Expose the ID to handlers

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer stamping `x-request-id` onto requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Read the request ID off a request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_make_request_id_is_unique() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let a = MakeRequestUuid.make_request_id(&request).unwrap();
        let b = MakeRequestUuid.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }

    #[test]
    fn test_request_id_ext_falls_back() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request.request_id(), "unknown");

        let request = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request.request_id(), "abc-123");
    }
}

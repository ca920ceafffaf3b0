//! Response rendering.
//!
//! # Responsibilities
//! - Render multistatus documents as 207 replies
//! - Map DavError to its status line, with an XML error body when a
//!   structured condition applies
//! - Build single-object responses with ETag and Last-Modified headers
//!
//! # Design Decisions
//! - ETags are served quoted, as conditional-request headers require
//! - Last-Modified is formatted by the timestamp codec, nothing else

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::backend::AddressObject;
use crate::dav::element::{encode_document, names, Child, Element};
use crate::dav::error::DavError;
use crate::dav::multistatus::{Condition, MultiStatus};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=\"utf-8\"";
pub const VCARD_CONTENT_TYPE: &str = "text/vcard; charset=\"utf-8\"";

/// 207 Multi-Status with the encoded document as body.
pub fn multistatus_response(multistatus: &MultiStatus) -> Response {
    match multistatus.encode() {
        Ok(body) => (
            StatusCode::MULTI_STATUS,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

/// Plain status-line rendering of a DAV error.
pub fn error_response(err: &DavError) -> Response {
    let status = err.status();
    tracing::debug!(status = %status, error = %err, "Rendering DAV error");
    (status, err.to_string()).into_response()
}

/// Refusal carrying a `DAV:error` body with a structured condition.
pub fn condition_response(status: StatusCode, condition: Condition) -> Response {
    let root = Element::with_children(names::ERROR, vec![Child::Empty(condition.name())]);
    match encode_document(&root) {
        Ok(body) => (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response(),
        Err(err) => internal_error(&err),
    }
}

/// Single-object GET/HEAD response; headers derive from the object fields.
pub fn address_object_response(object: &AddressObject, include_body: bool) -> Response {
    let body = object.card.to_vcf();
    let result = Response::builder()
        .status(StatusCode::OK)
        .header(header::ETAG, format!("\"{}\"", object.etag))
        .header(header::LAST_MODIFIED, object.mod_time.encode())
        .header(header::CONTENT_TYPE, VCARD_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, body.len())
        .body(if include_body {
            Body::from(body)
        } else {
            Body::empty()
        });

    match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, path = %object.path, "Failed to build object response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn internal_error(err: &DavError) -> Response {
    tracing::error!(error = %err, "Failed to encode response document");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::multistatus::ResponseEntry;
    use crate::vcard::{Card, Field};
    use crate::dav::timestamp::Timestamp;

    #[test]
    fn test_error_response_uses_taxonomy_status() {
        assert_eq!(
            error_response(&DavError::ScopeViolation).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_response(&DavError::QueryNotImplemented).status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn test_multistatus_response_is_207() {
        let ms = MultiStatus::new(vec![ResponseEntry::with_status("/x", StatusCode::OK)]);
        let response = multistatus_response(&ms);
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn test_object_response_headers() {
        let mut card = Card::new();
        card.insert("FN", Field::new("Fest T"));
        let object = AddressObject {
            path: "/ZGU/contacts/default/alice.vcf".into(),
            mod_time: Timestamp::from_unix(1_724_574_462).unwrap(),
            etag: "sQNI/mCtS7HUYkK+447YWozmRX10-Fest".into(),
            card,
        };
        let response = address_object_response(&object, true);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ETAG).unwrap(),
            "\"sQNI/mCtS7HUYkK+447YWozmRX10-Fest\""
        );
        assert_eq!(
            response.headers().get(header::LAST_MODIFIED).unwrap(),
            "Sun, 25 Aug 2024 08:27:42 GMT"
        );
    }
}

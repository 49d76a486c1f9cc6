//! Request ID generation.
//!
//! Every request gets an `x-request-id` header (UUID v4) as early as
//! possible; the propagate layer copies it onto the response so callers can
//! quote it when reporting problems.

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_parseable_uuid() {
        let mut make = UuidRequestId;
        let request = Request::builder().body(()).unwrap();
        let id = make.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(value).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut make = UuidRequestId;
        let request = Request::builder().body(()).unwrap();
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}

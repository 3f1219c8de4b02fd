use http::header::{HeaderValue, CONTENT_TYPE, LOCATION, VARY};
use http::StatusCode;
use jsonapi_core::MediaType;

use crate::document::Document;

/// Response produced by the pipeline. `None` body means no content.
pub type Response = http::Response<Option<Document>>;

pub fn document(status: StatusCode, doc: Document) -> Response {
    let mut response = http::Response::new(Some(doc));
    *response.status_mut() = status;
    response
}

pub fn no_content() -> Response {
    let mut response = http::Response::new(None);
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

pub(crate) fn with_location(mut response: Response, location: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

/// Stamp `Vary: Accept` and, when there is a body, the JSON:API media type
/// carrying the active extensions.
pub(crate) fn finalize(mut response: Response, extensions: &[&str]) -> Response {
    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static("Accept"));
    if response.body().is_some() {
        if let Ok(value) = HeaderValue::from_str(&MediaType::json_api(extensions)) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
    }
    response
}

/// Serialize the body for a transport.
pub fn body_bytes(response: &Response) -> serde_json::Result<Vec<u8>> {
    match response.body() {
        Some(doc) => serde_json::to_vec(doc),
        None => Ok(Vec::new()),
    }
}

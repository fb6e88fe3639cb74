mod body;
mod request;
mod response;

pub use body::{collect_body, is_json_content_type, parse_json};
pub use request::Request;
pub use response::{HttpResponse, Response, ResponseExt};

/// Create a text response
pub fn text(body: impl Into<String>) -> Response {
    Ok(HttpResponse::text(body))
}

/// Create a JSON response from a serde_json::Value
pub fn json(body: serde_json::Value) -> Response {
    Ok(HttpResponse::json(body))
}

/// JSON response with a status code
///
/// ```rust,ignore
/// return json_status(201, serde_json::json!(created));
/// ```
pub fn json_status(status: u16, body: serde_json::Value) -> Response {
    Ok(HttpResponse::json(body).status(status))
}

//! Body collection and parsing for HTTP requests

use crate::error::FrameworkError;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

/// Collect the full body from an Incoming stream, up to `limit` bytes
pub async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, FrameworkError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(FrameworkError::PayloadTooLarge { limit })
        }
        Err(e) => Err(FrameworkError::malformed_body(format!(
            "failed to read request body: {}",
            e
        ))),
    }
}

/// Whether a Content-Type denotes JSON (`application/json` or `application/*+json`)
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Parse bytes as JSON into the target type
///
/// Syntax errors are a malformed body (400); well-formed JSON of the wrong
/// shape is a validation failure (422).
pub fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, FrameworkError> {
    serde_json::from_slice(bytes).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            FrameworkError::malformed_body(e.to_string())
        } else {
            FrameworkError::validation("body", e.to_string())
        }
    })
}

/// Parse a urlencoded query string into the target type
pub fn parse_query<T: DeserializeOwned>(query: &str) -> Result<T, FrameworkError> {
    serde_urlencoded::from_str(query).map_err(|e| FrameworkError::InvalidQuery {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[test]
    fn recognises_json_media_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/merge-patch+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("multipart/form-data; boundary=x"));
    }

    #[test]
    fn syntax_errors_and_shape_errors_differ() {
        let broken = parse_json::<Payload>(&Bytes::from_static(b"{\"name\":"));
        assert_eq!(broken.unwrap_err().status_code(), 400);

        let wrong_shape = parse_json::<Payload>(&Bytes::from_static(b"{\"title\":\"x\"}"));
        assert_eq!(wrong_shape.unwrap_err().status_code(), 422);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Filter {
        category_id: Option<i32>,
        q: Option<String>,
    }

    #[test]
    fn query_strings_are_decoded_and_typed() {
        let filter: Filter = parse_query("category_id=%31&q=garden+tools").unwrap();
        assert_eq!(
            filter,
            Filter {
                category_id: Some(1),
                q: Some("garden tools".to_string()),
            }
        );

        let empty: Filter = parse_query("").unwrap();
        assert_eq!(empty.category_id, None);

        let bad = parse_query::<Filter>("category_id=abc").unwrap_err();
        assert_eq!(bad.status_code(), 400);
    }
}

//! Pluggable body encoding and decoding.

use crate::error::{Error, Result};
use crate::request_template::RequestTemplate;
use crate::response::Response;
use bytes::Bytes;
use serde_json::Value;

/// Serializes a call-time body argument into the request template.
pub trait Encoder: Send + Sync {
    /// `body_ty` is the parameter's declared type descriptor, for encoders
    /// that dispatch on it.
    fn encode(&self, value: &Value, body_ty: &str, template: &mut RequestTemplate) -> Result<()>;
}

/// Encodes bodies as JSON and sets `Content-Type` when none is declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Value, _body_ty: &str, template: &mut RequestTemplate) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))?;
        template.body_literal(bytes);
        if !template.has_header("Content-Type") {
            template.header("Content-Type", "application/json; charset=utf-8");
        }
        Ok(())
    }
}

/// Deserializes a buffered response body into a [`Value`] the caller's type
/// is then built from.
pub trait Decoder: Send + Sync {
    fn decode(&self, response: &Response, body: &Bytes) -> Result<Value>;
}

/// Decodes JSON bodies. An empty body decodes to `Value::Null` so unit-like
/// return types work against 204-style responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, response: &Response, body: &Bytes) -> Result<Value> {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(body).map_err(|e| Error::Decode {
            status: response.status().as_u16(),
            message: e.to_string(),
            body: body.clone(),
        })
    }
}

/// Decodes any body as text. 404 and 204 responses decode to `Value::Null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecoder;

impl Decoder for StringDecoder {
    fn decode(&self, response: &Response, body: &Bytes) -> Result<Value> {
        match response.status().as_u16() {
            204 | 404 => Ok(Value::Null),
            _ => Ok(Value::String(String::from_utf8_lossy(body).into_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Body;
    use http::{HeaderMap, Method, StatusCode};
    use serde_json::json;

    fn response(status: StatusCode) -> Response {
        let request = Request::new(
            Method::GET,
            "http://localhost/test".to_string(),
            HeaderMap::new(),
            None,
            "utf-8",
        );
        Response::new(status, None, HeaderMap::new(), Body::Empty, request)
    }

    #[test]
    fn json_encoder_sets_body_and_content_type() {
        let mut template = RequestTemplate::new();
        JsonEncoder
            .encode(&json!({"name": "alice"}), "User", &mut template)
            .unwrap();
        assert_eq!(
            template.body_bytes().unwrap().as_ref(),
            br#"{"name":"alice"}"#
        );
        assert!(template.has_header("Content-Type"));
    }

    #[test]
    fn json_encoder_respects_declared_content_type() {
        let mut template = RequestTemplate::new();
        template.header("Content-Type", "application/vnd.custom+json");
        JsonEncoder
            .encode(&json!({}), "Custom", &mut template)
            .unwrap();
        assert_eq!(
            template.headers()[0].1,
            vec!["application/vnd.custom+json".to_string()]
        );
    }

    #[test]
    fn json_decoder_round_trips() {
        let body = Bytes::from_static(br#"["octocat","hubot"]"#);
        let decoded = JsonDecoder.decode(&response(StatusCode::OK), &body).unwrap();
        assert_eq!(decoded, json!(["octocat", "hubot"]));
    }

    #[test]
    fn json_decoder_maps_malformed_content_to_decode_error() {
        let body = Bytes::from_static(b"not json");
        let err = JsonDecoder
            .decode(&response(StatusCode::OK), &body)
            .unwrap_err();
        match err {
            Error::Decode { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body.as_ref(), b"not json");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn json_decoder_treats_empty_body_as_null() {
        let decoded = JsonDecoder
            .decode(&response(StatusCode::NO_CONTENT), &Bytes::new())
            .unwrap();
        assert_eq!(decoded, Value::Null);
    }

    #[test]
    fn string_decoder_returns_text_or_null() {
        let body = Bytes::from_static(b"plain text");
        let decoded = StringDecoder.decode(&response(StatusCode::OK), &body).unwrap();
        assert_eq!(decoded, json!("plain text"));

        let decoded = StringDecoder
            .decode(&response(StatusCode::NOT_FOUND), &body)
            .unwrap();
        assert_eq!(decoded, Value::Null);
    }
}

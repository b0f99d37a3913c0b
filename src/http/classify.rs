//! Maps transport failures and HTTP error responses to [`ApiError`].

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ApiError, ErrorKind};

/// Classifies an error raised by reqwest itself.
pub fn classify_transport(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        return ApiError::new(ErrorKind::Timeout, error.to_string());
    }

    if let Some(status) = error.status() {
        let status = status.as_u16();
        let kind = ErrorKind::from_status(status).unwrap_or(ErrorKind::Unknown);
        return ApiError::new(kind, error.to_string()).with_status(status);
    }

    // DNS failures, refused and reset connections
    if error.is_connect() || error.is_request() {
        return ApiError::new(ErrorKind::ConnectionError, error.to_string());
    }

    ApiError::new(ErrorKind::Unknown, error.to_string())
}

/// Classifies a non-2xx response from its status and body.
///
/// The message is taken from the first of `ResponseStatus.Message`,
/// `message` or `error` found in a JSON body, falling back to the kind's
/// user message. Field errors come from an `errors` object whose values are
/// a string or a list of strings.
pub fn classify_response(status: u16, body: &str) -> ApiError {
    let kind = ErrorKind::from_status(status).unwrap_or(ErrorKind::Unknown);
    let json: Option<Value> = serde_json::from_str(body).ok();

    let message = json
        .as_ref()
        .and_then(server_message)
        .unwrap_or_else(|| kind.user_message().to_string());

    let field_errors = json.as_ref().map(field_errors).unwrap_or_default();

    ApiError::new(kind, message)
        .with_status(status)
        .with_field_errors(field_errors)
}

fn server_message(json: &Value) -> Option<String> {
    let candidates = [
        json.pointer("/ResponseStatus/Message"),
        json.get("message"),
        json.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn field_errors(json: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(errors) = json.get("errors").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    errors
        .iter()
        .filter_map(|(field, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => return None,
            };
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect()
}

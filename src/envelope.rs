//! Standard response envelope.
//!
//! The backend wraps every payload as
//!
//! ```json
//! {
//!   "ResponseStatus": { "Statuscode": 200, "Message": "Success", "ErrorCode": "SUCCESS" },
//!   "TotalCount": 1, "Index": 0, "PageSize": 10,
//!   "Data": { ... }
//! }
//! ```
//!
//! Success is decided by `ResponseStatus.Statuscode` alone; whether `Data`
//! was present has no bearing on it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returned by [`Envelope::error_message`] when there is no status object.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    #[serde(rename = "Statuscode", default)]
    pub status_code: Option<i64>,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "MessageAr", default)]
    pub message_ar: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: String,
}

impl ResponseStatus {
    /// Reads a status object, tolerating missing or mistyped fields.
    pub fn from_json(value: &Value) -> Self {
        Self {
            status_code: value.get("Statuscode").and_then(Value::as_i64),
            message: value
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            message_ar: value
                .get("MessageAr")
                .and_then(Value::as_str)
                .map(str::to_string),
            error_code: value
                .get("ErrorCode")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == Some(200)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status_code, Some(code) if code >= 400)
    }
}

/// A normalised response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "ResponseStatus")]
    pub status: Option<ResponseStatus>,
    #[serde(rename = "TotalCount")]
    pub total_count: i64,
    #[serde(rename = "Index")]
    pub index: i64,
    #[serde(rename = "PageSize")]
    pub page_size: i64,
    #[serde(rename = "Data")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Builds an envelope, running `decode` on `Data` when it is present and
    /// not null. A decoder error is returned unchanged.
    pub fn from_json<F>(json: &Value, decode: F) -> anyhow::Result<Self>
    where
        F: FnOnce(Value) -> anyhow::Result<T>,
    {
        let mut envelope = Self::from_json_without_result(json);
        envelope.data = match json.get("Data") {
            None | Some(Value::Null) => None,
            Some(data) => Some(decode(data.clone())?),
        };
        Ok(envelope)
    }

    /// Builds an envelope without touching `Data`; the payload is always empty.
    pub fn from_json_without_result(json: &Value) -> Self {
        let status = match json.get("ResponseStatus") {
            None | Some(Value::Null) => None,
            Some(status) => Some(ResponseStatus::from_json(status)),
        };
        Self {
            status,
            total_count: read_count(json, "TotalCount"),
            index: read_count(json, "Index"),
            page_size: read_count(json, "PageSize"),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_ref().is_some_and(ResponseStatus::is_success)
    }

    pub fn is_error(&self) -> bool {
        self.status.as_ref().is_some_and(ResponseStatus::is_error)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Takes the payload out of the envelope.
    ///
    /// # Panics
    ///
    /// Panics when there is no payload. Check [`Envelope::has_data`] first
    /// when the backend may legitimately omit `Data`.
    #[track_caller]
    pub fn into_data(self) -> T {
        match self.data {
            Some(data) => data,
            None => panic!("envelope has no data (status: {})", self.error_message()),
        }
    }

    pub fn status_code(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.status_code)
    }

    /// Server message, or [`UNKNOWN_ERROR`] when no status was sent.
    pub fn error_message(&self) -> &str {
        self.status
            .as_ref()
            .map_or(UNKNOWN_ERROR, |s| s.message.as_str())
    }

    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        Envelope {
            status: self.status,
            total_count: self.total_count,
            index: self.index,
            page_size: self.page_size,
            data: self.data.map(f),
        }
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// [`Envelope::from_json`] with a serde decoder for `T`.
    pub fn from_json_typed(json: &Value) -> anyhow::Result<Self> {
        Self::from_json(json, |data| Ok(serde_json::from_value(data)?))
    }
}

fn read_count(json: &Value, key: &str) -> i64 {
    json.get(key).and_then(Value::as_i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
        name: String,
    }

    fn sample() -> Value {
        json!({
            "ResponseStatus": {"Statuscode": 200, "Message": "Success", "ErrorCode": "SUCCESS"},
            "TotalCount": 1,
            "Index": 0,
            "PageSize": 10,
            "Data": {"id": 1, "name": "Test"}
        })
    }

    #[test]
    fn test_from_json_identity_decoder() {
        let envelope = Envelope::from_json(&sample(), Ok).unwrap();
        assert!(envelope.is_success());
        assert!(envelope.has_data());
        assert_eq!(envelope.data().unwrap()["id"], 1);
        assert_eq!(envelope.total_count, 1);
        assert_eq!(envelope.index, 0);
        assert_eq!(envelope.page_size, 10);
    }

    #[test]
    fn test_from_json_typed() {
        let envelope = Envelope::<Item>::from_json_typed(&sample()).unwrap();
        assert_eq!(
            envelope.into_data(),
            Item {
                id: 1,
                name: "Test".to_string()
            }
        );
    }

    #[test]
    fn test_success_without_data() {
        let json = json!({"ResponseStatus": {"Statuscode": 200, "Message": "OK"}});
        let envelope = Envelope::<Value>::from_json(&json, Ok).unwrap();
        assert!(envelope.is_success());
        assert!(!envelope.has_data());
    }

    #[test]
    fn test_null_data_skips_decoder() {
        let json = json!({"ResponseStatus": {"Statuscode": 200}, "Data": null});
        let envelope =
            Envelope::<Item>::from_json(&json, |_| panic!("decoder must not run")).unwrap();
        assert!(!envelope.has_data());
    }

    #[test]
    fn test_decoder_error_propagates() {
        let json = json!({"ResponseStatus": {"Statuscode": 200}, "Data": {"id": "x"}});
        let result = Envelope::<Item>::from_json_typed(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_without_result_ignores_data() {
        let envelope = Envelope::<Value>::from_json_without_result(&sample());
        assert!(envelope.is_success());
        assert!(!envelope.has_data());
        assert_eq!(envelope.total_count, 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let envelope = Envelope::<Value>::from_json(&json!({}), Ok).unwrap();
        assert!(envelope.status.is_none());
        assert!(!envelope.is_success());
        assert!(!envelope.is_error());
        assert_eq!(envelope.total_count, 0);
        assert_eq!(envelope.index, 0);
        assert_eq!(envelope.page_size, 0);
        assert_eq!(envelope.error_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_status_tolerates_missing_fields() {
        let status = ResponseStatus::from_json(&json!({"Message": "hi"}));
        assert_eq!(status.status_code, None);
        assert_eq!(status.message, "hi");
        assert_eq!(status.error_code, "");
        assert!(!status.is_success());
        assert!(!status.is_error());
    }

    #[test]
    fn test_is_success_only_for_200() {
        for (code, success, error) in [
            (200, true, false),
            (201, false, false),
            (400, false, true),
            (500, false, true),
        ] {
            let status = ResponseStatus {
                status_code: Some(code),
                ..Default::default()
            };
            assert_eq!(status.is_success(), success, "code {code}");
            assert_eq!(status.is_error(), error, "code {code}");
        }
    }

    #[test]
    fn test_response_status_round_trip() {
        let statuses = [
            ResponseStatus::default(),
            ResponseStatus {
                status_code: Some(404),
                message: "Not found".to_string(),
                message_ar: Some("غير موجود".to_string()),
                error_code: "NOT_FOUND".to_string(),
            },
            ResponseStatus {
                status_code: None,
                message: "partial".to_string(),
                message_ar: None,
                error_code: String::new(),
            },
        ];
        for status in statuses {
            let encoded = serde_json::to_value(&status).unwrap();
            let decoded: ResponseStatus = serde_json::from_value(encoded.clone()).unwrap();
            assert_eq!(decoded, status);
            assert_eq!(ResponseStatus::from_json(&encoded), status);
        }
    }

    #[test]
    fn test_error_message_from_status() {
        let json = json!({"ResponseStatus": {"Statuscode": 404, "Message": "Missing"}});
        let envelope = Envelope::<Value>::from_json_without_result(&json);
        assert!(envelope.is_error());
        assert_eq!(envelope.error_message(), "Missing");
        assert_eq!(envelope.status_code(), Some(404));
    }

    #[test]
    #[should_panic(expected = "envelope has no data")]
    fn test_into_data_panics_when_absent() {
        let envelope = Envelope::<Value>::from_json_without_result(&sample());
        let _ = envelope.into_data();
    }

    #[test]
    fn test_map_keeps_metadata() {
        let envelope = Envelope::<Item>::from_json_typed(&sample())
            .unwrap()
            .map(|item| item.name);
        assert_eq!(envelope.data(), Some(&"Test".to_string()));
        assert_eq!(envelope.page_size, 10);
    }

    #[test]
    fn test_serializes_to_wire_shape() {
        let envelope = Envelope::from_json(&sample(), Ok).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["ResponseStatus"]["Statuscode"], 200);
        assert_eq!(value["Data"]["name"], "Test");
        assert_eq!(value["PageSize"], 10);
    }
}

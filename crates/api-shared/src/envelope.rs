//! JSON envelope wrapped around every REST response.
//!
//! Successful calls answer `{"success": true, "message"?, "count"?, "data"?}`; failures answer
//! [`ErrorBody`].

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> Envelope<Vec<T>> {
    /// A list response; `count` mirrors the number of items.
    pub fn list(items: Vec<T>) -> Self {
        Self {
            success: true,
            message: None,
            count: Some(items.len()),
            data: Some(items),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    /// Only set when a patient record lacks fields a visit needs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            missing_fields: None,
            patient_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_envelope_counts_items() {
        let body = serde_json::to_value(Envelope::list(vec![1, 2, 3])).unwrap();
        assert_eq!(body, json!({"success": true, "count": 3, "data": [1, 2, 3]}));
    }

    #[test]
    fn test_message_only_envelope_omits_data() {
        let body = serde_json::to_value(Envelope::message("done")).unwrap();
        assert_eq!(body, json!({"success": true, "message": "done"}));
    }

    #[test]
    fn test_error_body_shape() {
        let mut err = ErrorBody::new("patient record is incomplete");
        err.missing_fields = Some(vec!["gender".into()]);
        assert_eq!(
            serde_json::to_value(err).unwrap(),
            json!({
                "success": false,
                "message": "patient record is incomplete",
                "missingFields": ["gender"]
            })
        );
    }
}

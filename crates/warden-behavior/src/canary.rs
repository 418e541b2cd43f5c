//! Canary form fields.
//!
//! Hidden fields that legitimate clients submit empty or omit entirely.
//! A non-empty value means the submitter filled every field it found,
//! which only automated form stuffers do.

use serde_json::Value;
use tracing::info;

/// Default reserved canary field names.
pub const DEFAULT_CANARY_FIELDS: &[&str] = &["website", "url_confirm", "contact_me_by_fax"];

/// Outcome of inspecting a submitted body for canary values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanaryVerdict {
    /// No canary field carried a value.
    Clean,
    /// A canary field was filled in.
    Tripped {
        /// The field that was filled.
        field: String,
    },
}

/// Inspects parsed form bodies for filled canary fields.
#[derive(Debug, Clone)]
pub struct CanaryFields {
    names: Vec<String>,
}

impl Default for CanaryFields {
    fn default() -> Self {
        Self::new(DEFAULT_CANARY_FIELDS.iter().map(ToString::to_string))
    }
}

impl CanaryFields {
    /// Build an inspector over the given reserved names.
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// The reserved names being watched.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check a parsed body's top-level fields.
    ///
    /// Only non-empty string values trip; absent fields, empty strings,
    /// and null are what real clients send.
    #[must_use]
    pub fn inspect(&self, body: &Value) -> CanaryVerdict {
        let Some(map) = body.as_object() else {
            return CanaryVerdict::Clean;
        };
        for name in &self.names {
            if let Some(value) = map.get(name) {
                let filled = match value {
                    Value::String(s) => !s.is_empty(),
                    Value::Null => false,
                    _ => true,
                };
                if filled {
                    info!(field = %name, "canary field submitted non-empty");
                    return CanaryVerdict::Tripped { field: name.clone() };
                }
            }
        }
        CanaryVerdict::Clean
    }

    /// The generic success body returned in place of the real handler.
    ///
    /// Indistinguishable from a normal submission acknowledgement.
    #[must_use]
    pub fn decoy_success_body() -> Value {
        serde_json::json!({ "success": true, "message": "Submission received" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_clean() {
        let canary = CanaryFields::default();
        let body = json!({"email": "a@b.example", "password": "hunter2"});
        assert_eq!(canary.inspect(&body), CanaryVerdict::Clean);
    }

    #[test]
    fn test_empty_canary_value_is_clean() {
        let canary = CanaryFields::default();
        let body = json!({"website": "", "email": "a@b.example"});
        assert_eq!(canary.inspect(&body), CanaryVerdict::Clean);
    }

    #[test]
    fn test_null_canary_value_is_clean() {
        let canary = CanaryFields::default();
        let body = json!({"website": null});
        assert_eq!(canary.inspect(&body), CanaryVerdict::Clean);
    }

    #[test]
    fn test_filled_canary_trips() {
        let canary = CanaryFields::default();
        let body = json!({"website": "http://spam.example"});
        assert_eq!(
            canary.inspect(&body),
            CanaryVerdict::Tripped {
                field: "website".into()
            }
        );
    }

    #[test]
    fn test_non_string_canary_value_trips() {
        let canary = CanaryFields::default();
        let body = json!({"url_confirm": 42});
        assert!(matches!(
            canary.inspect(&body),
            CanaryVerdict::Tripped { .. }
        ));
    }

    #[test]
    fn test_non_object_body_is_clean() {
        let canary = CanaryFields::default();
        assert_eq!(canary.inspect(&json!("just a string")), CanaryVerdict::Clean);
        assert_eq!(canary.inspect(&json!([1, 2, 3])), CanaryVerdict::Clean);
    }

    #[test]
    fn test_custom_field_names() {
        let canary = CanaryFields::new(vec!["hp_token".to_string()]);
        let body = json!({"website": "filled", "hp_token": ""});
        assert_eq!(canary.inspect(&body), CanaryVerdict::Clean);
        let body = json!({"hp_token": "x"});
        assert!(matches!(canary.inspect(&body), CanaryVerdict::Tripped { .. }));
    }

    #[test]
    fn test_decoy_success_body_shape() {
        let body = CanaryFields::decoy_success_body();
        assert_eq!(body["success"], json!(true));
    }
}

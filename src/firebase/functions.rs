use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::Firebase;
use crate::backend::Functions;
use crate::models::AuthSession;

/// Unwraps a callable-function reply: `{"result": ...}` on success,
/// `{"error": {...}}` otherwise.
fn callable_result(name: &str, body: Value) -> Result<Value> {
    match body {
        Value::Object(mut map) => {
            if let Some(result) = map.remove("result") {
                return Ok(result);
            }
            if let Some(error) = map.remove("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                let status = error.get("status").and_then(Value::as_str).unwrap_or("UNKNOWN");
                return Err(anyhow!("Function {} failed ({}): {}", name, status, message));
            }
            Err(anyhow!("Function {} returned no result", name))
        }
        other => Err(anyhow!("Function {} returned a non-object reply: {}", name, other)),
    }
}

impl Functions for Firebase {
    fn call(&self, session: &AuthSession, name: &str, payload: &Value) -> Result<Value> {
        let request = self
            .client
            .post(self.function_url(name))
            .bearer_auth(&session.id_token)
            .json(&json!({ "data": payload }));
        let body: Value = self.send_json(name, request)?;
        callable_result(name, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_result_unwraps() {
        let body = json!({ "result": { "isFraud": false } });
        assert_eq!(
            callable_result("detectFraud", body).unwrap(),
            json!({ "isFraud": false })
        );
    }

    #[test]
    fn test_callable_error() {
        let body = json!({ "error": { "message": "quota", "status": "RESOURCE_EXHAUSTED" } });
        let err = callable_result("detectFraud", body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function detectFraud failed (RESOURCE_EXHAUSTED): quota"
        );
    }

    #[test]
    fn test_callable_missing_result() {
        assert!(callable_result("detectFraud", json!({})).is_err());
        assert!(callable_result("detectFraud", json!([1])).is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

use crate::models::AuthSession;

// --- Backend seams ---

pub trait AuthBackend {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession>;
    fn refresh(&self, session: &AuthSession) -> Result<AuthSession>;
    fn send_password_reset(&self, email: &str) -> Result<()>;
    fn send_email_verification(&self, session: &AuthSession) -> Result<()>;
    fn update_email(&self, session: &AuthSession, new_email: &str) -> Result<AuthSession>;
    fn update_password(&self, session: &AuthSession, new_password: &str) -> Result<AuthSession>;
    fn update_display_name(&self, session: &AuthSession, name: &str) -> Result<AuthSession>;
    fn delete_account(&self, session: &AuthSession) -> Result<()>;
}

/// A document as read back from the store: its id plus untyped fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

pub trait DocumentStore {
    fn get(&self, session: &AuthSession, collection: &str, id: &str) -> Result<Option<StoredDocument>>;
    /// Writes the whole record, replacing whatever was stored under `id`.
    fn set(&self, session: &AuthSession, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()>;
    fn delete(&self, session: &AuthSession, collection: &str, id: &str) -> Result<()>;
    fn list(&self, session: &AuthSession, collection: &str) -> Result<Vec<StoredDocument>>;
    fn query_eq(
        &self,
        session: &AuthSession,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>>;
}

pub trait BlobStorage {
    /// Uploads `local` to `remote_path` and returns a URL the file can be fetched from.
    fn upload(&self, session: &AuthSession, remote_path: &str, local: &Path) -> Result<String>;
}

pub trait Functions {
    fn call(&self, session: &AuthSession, name: &str, payload: &Value) -> Result<Value>;
}

// --- Record helpers ---

pub fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Serializes a record into document fields. The id is carried by the
/// document name, so it is dropped from the fields.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record).context("Failed to serialize record")? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(anyhow!("Expected record to serialize as an object, got {}", other)),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: StoredDocument) -> Result<T> {
    let StoredDocument { id, mut fields } = doc;
    fields.insert("id".to_string(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(fields))
        .with_context(|| format!("Failed to decode document '{}'", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Company, FlaggedCompany};
    use serde_json::json;

    #[test]
    fn test_new_document_id_shape() {
        let a = new_document_id();
        let b = new_document_id();
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_to_fields_drops_id() {
        let company = Company::new("c1", "Acme").with_review("fine");
        let fields = to_fields(&company).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["name"], json!("Acme"));
        assert_eq!(fields["reviews"], json!(["fine"]));
        assert_eq!(fields["flaggedAsFake"], json!(false));
    }

    #[test]
    fn test_from_document_restores_id() {
        let mut fields = Map::new();
        fields.insert("companyId".to_string(), json!("c1"));
        fields.insert("companyName".to_string(), json!("Acme"));
        fields.insert("flaggedBy".to_string(), json!("u1"));
        fields.insert("flaggedAt".to_string(), json!("2024-03-01T09:00:00Z"));

        let flagged: FlaggedCompany = from_document(StoredDocument {
            id: "f1".to_string(),
            fields,
        })
        .unwrap();
        assert_eq!(flagged.id, "f1");
        assert_eq!(flagged.company_name, "Acme");
        assert_eq!(flagged.reason, "");
    }

    #[test]
    fn test_from_document_reports_id_on_failure() {
        let err = from_document::<FlaggedCompany>(StoredDocument {
            id: "broken".to_string(),
            fields: Map::new(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}

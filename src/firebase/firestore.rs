use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use super::Firebase;
use crate::backend::{DocumentStore, StoredDocument};
use crate::models::AuthSession;

const PAGE_SIZE: &str = "300";

// --- Value codec ---
//
// Firestore wraps every value in a single-key object naming its type, e.g.
// {"stringValue": "x"} or {"integerValue": "42"} (64-bit ints travel as strings).

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if items.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                let values: Vec<Value> = items.iter().map(encode_value).collect();
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value> {
    let wrapper = value
        .as_object()
        .filter(|m| m.len() == 1)
        .ok_or_else(|| anyhow!("Malformed Firestore value: {}", value))?;
    let (kind, inner) = wrapper
        .iter()
        .next()
        .ok_or_else(|| anyhow!("Empty Firestore value"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| anyhow!("booleanValue is not a boolean: {}", inner)),
        "integerValue" => {
            // Usually a string, but accept a bare number too
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| anyhow!("integerValue is not an integer: {}", inner))
        }
        "doubleValue" => {
            let f = match inner {
                Value::String(s) => s.parse::<f64>().ok(),
                other => other.as_f64(),
            }
            .ok_or_else(|| anyhow!("doubleValue is not a number: {}", inner))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| anyhow!("{} is not a string: {}", kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                _ => Map::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(anyhow!("Unsupported Firestore value type '{}'", other)),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
    fields
        .iter()
        .map(|(k, v)| {
            decode_value(v)
                .with_context(|| format!("Failed to decode field '{}'", k))
                .map(|decoded| (k.clone(), decoded))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn decode(self) -> Result<StoredDocument> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("Document name has no id: {}", self.name))?
            .to_string();
        Ok(StoredDocument {
            id,
            fields: decode_fields(&self.fields)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<RawDocument>,
}

fn equality_query(collection: &str, field: &str, value: &Value) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode_value(value),
                }
            }
        }
    })
}

impl Firebase {
    fn document_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.documents_root()).context("Invalid Firestore URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Firestore URL cannot take path segments"))?
            .extend(segments);
        Ok(url)
    }
}

impl DocumentStore for Firebase {
    fn get(&self, session: &AuthSession, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let url = self.document_url(&[collection, id])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&session.id_token)
            .send()
            .context("Failed to send Firestore get request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Firestore get request failed with status {}: {}",
                status,
                super::api_error_message(&error_text)
            ));
        }
        let raw: RawDocument = response
            .json()
            .context("Failed to parse Firestore document")?;
        raw.decode().map(Some)
    }

    fn set(&self, session: &AuthSession, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        // PATCH without an update mask replaces the whole document
        let url = self.document_url(&[collection, id])?;
        let request = self
            .client
            .patch(url)
            .bearer_auth(&session.id_token)
            .json(&json!({ "fields": encode_fields(fields) }));
        self.send("Firestore write", request)?;
        Ok(())
    }

    fn delete(&self, session: &AuthSession, collection: &str, id: &str) -> Result<()> {
        let url = self.document_url(&[collection, id])?;
        let request = self.client.delete(url).bearer_auth(&session.id_token);
        self.send("Firestore delete", request)?;
        Ok(())
    }

    fn list(&self, session: &AuthSession, collection: &str) -> Result<Vec<StoredDocument>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.document_url(&[collection])?;
            url.query_pairs_mut().append_pair("pageSize", PAGE_SIZE);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let request = self.client.get(url).bearer_auth(&session.id_token);
            let page: ListResponse = self.send_json("Firestore list", request)?;
            for raw in page.documents {
                documents.push(raw.decode()?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    fn query_eq(
        &self,
        session: &AuthSession,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>> {
        let url = format!("{}:runQuery", self.documents_root());
        let request = self
            .client
            .post(url)
            .bearer_auth(&session.id_token)
            .json(&equality_query(collection, field, value));
        let results: Vec<QueryResult> = self.send_json("Firestore query", request)?;

        // Empty result sets come back as a single entry with only a readTime
        results
            .into_iter()
            .filter_map(|r| r.document)
            .map(RawDocument::decode)
            .collect()
    }
}

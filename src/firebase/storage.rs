use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use super::Firebase;
use crate::backend::BlobStorage;
use crate::models::AuthSession;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    bucket: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" | "md" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Builds the tokenized URL the storage service serves the object from.
fn download_url(base: &str, upload: &UploadResponse) -> Result<String> {
    let token = upload
        .download_tokens
        .as_deref()
        .and_then(|tokens| tokens.split(',').next())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("Upload of '{}' returned no download token", upload.name))?;

    let mut url = Url::parse(base).context("Invalid storage URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Storage URL cannot take path segments"))?
        .extend(["b", upload.bucket.as_str(), "o", upload.name.as_str()]);
    url.query_pairs_mut()
        .append_pair("alt", "media")
        .append_pair("token", token);
    Ok(url.into())
}

impl BlobStorage for Firebase {
    fn upload(&self, session: &AuthSession, remote_path: &str, local: &Path) -> Result<String> {
        let file = File::open(local)
            .with_context(|| format!("Failed to open {}", local.display()))?;

        let mut url = Url::parse(&self.storage_objects_url()).context("Invalid storage URL")?;
        url.query_pairs_mut().append_pair("name", remote_path);

        let request = self
            .client
            .post(url)
            .header("Authorization", format!("Firebase {}", session.id_token))
            .header("Content-Type", content_type_for(local))
            .body(file);
        let uploaded: UploadResponse = self.send_json("Storage upload", request)?;

        download_url(super::STORAGE_URL, &uploaded)
    }
}

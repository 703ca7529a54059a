use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::backend::BlobStorage;
use crate::models::AuthSession;

pub struct DocumentRepository<'a> {
    storage: &'a dyn BlobStorage,
    session: &'a AuthSession,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(storage: &'a dyn BlobStorage, session: &'a AuthSession) -> Self {
        Self { storage, session }
    }

    /// Uploads a local file under the signed-in user's folder and returns
    /// its access URL.
    pub fn upload(&self, local: &Path) -> Result<String> {
        if !local.is_file() {
            return Err(anyhow!("File not found: {}", local.display()));
        }
        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file name: {}", local.display()))?;

        let remote_path = document_path(&self.session.uid, file_name);
        let url = self
            .storage
            .upload(self.session, &remote_path, local)
            .inspect_err(|e| warn!(path = %remote_path, error = %e, "document upload failed"))?;
        info!(path = %remote_path, "uploaded document");
        Ok(url)
    }
}

pub fn document_path(uid: &str, file_name: &str) -> String {
    format!("documents/{}/{}", uid, file_name)
}

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::models::AuthSession;

const DEFAULT_REGION: &str = "us-central1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub functions_region: String,
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("FIREBASE_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("FIREBASE_API_KEY environment variable not set. Set it with: export FIREBASE_API_KEY=your-web-api-key")?;
        let project_id = lookup("FIREBASE_PROJECT_ID")
            .filter(|v| !v.trim().is_empty())
            .context("FIREBASE_PROJECT_ID environment variable not set")?;

        let storage_bucket = lookup("FIREBASE_STORAGE_BUCKET")
            .unwrap_or_else(|| format!("{}.appspot.com", project_id));
        let functions_region =
            lookup("FIREBASE_FUNCTIONS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let request_timeout_secs = match lookup("JOBTRACK_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("JOBTRACK_TIMEOUT_SECS must be a whole number of seconds, got '{}'", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            project_id,
            storage_bucket,
            functions_region,
            request_timeout_secs,
        })
    }
}

pub fn log_level() -> String {
    env::var("JOBTRACK_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}

/// Where local state (signed-in session, feed) is kept between runs.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn default_location() -> Self {
        // Use XDG data directory or fallback
        let data_dir = directories::ProjectDirs::from("", "", "jobtrack")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self { data_dir }
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn feed_file(&self) -> PathBuf {
        self.data_dir.join("feed.json")
    }

    pub fn load_session(&self) -> Result<Option<AuthSession>> {
        let path = self.session_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(Some(session))
    }

    pub fn save_session(&self, session: Option<&AuthSession>) -> Result<()> {
        let path = self.session_file();
        match session {
            Some(session) => {
                std::fs::create_dir_all(&self.data_dir)?;
                std::fs::write(&path, serde_json::to_string_pretty(session)?)
                    .with_context(|| format!("Failed to write session file: {}", path.display()))
            }
            None if path.exists() => std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session file: {}", path.display())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "job-tracker"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "key");
        assert_eq!(config.storage_bucket, "job-tracker.appspot.com");
        assert_eq!(config.functions_region, "us-central1");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "job-tracker"),
            ("FIREBASE_STORAGE_BUCKET", "custom-bucket"),
            ("FIREBASE_FUNCTIONS_REGION", "europe-west1"),
            ("JOBTRACK_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.storage_bucket, "custom-bucket");
        assert_eq!(config.functions_region, "europe-west1");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_missing_api_key() {
        let err = BackendConfig::from_lookup(lookup(&[("FIREBASE_PROJECT_ID", "p")])).unwrap_err();
        assert!(err.to_string().contains("FIREBASE_API_KEY"));

        let err = BackendConfig::from_lookup(lookup(&[
            ("FIREBASE_API_KEY", "  "),
            ("FIREBASE_PROJECT_ID", "p"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("FIREBASE_API_KEY"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = BackendConfig::from_lookup(lookup(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "p"),
            ("JOBTRACK_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_session_file_roundtrip() {
        let paths = AppPaths {
            data_dir: std::env::temp_dir().join(format!("jobtrack-session-{}", std::process::id())),
        };
        assert!(paths.load_session().unwrap().is_none());

        let session = crate::testing::session("u1", "a@b.c");
        paths.save_session(Some(&session)).unwrap();
        assert_eq!(paths.load_session().unwrap(), Some(session));

        paths.save_session(None).unwrap();
        assert!(paths.load_session().unwrap().is_none());
        // Clearing twice is fine
        paths.save_session(None).unwrap();

        std::fs::remove_dir_all(&paths.data_dir).unwrap();
    }
}

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::ApplyError;

/// Write-only destination for the merged configuration.
///
/// A sink is handed the finished document exactly once per successful update
/// cycle; it is never read back and never assumed idempotent.
#[async_trait]
pub trait ConfigSink {
    async fn apply(&self, document: &str, force_reload: bool) -> Result<(), ApplyError>;
}

/// Writes the document to a file, creating parent directories as needed.
pub struct FileSink {
    pub path: PathBuf,
}

#[async_trait]
impl ConfigSink for FileSink {
    async fn apply(&self, document: &str, _force_reload: bool) -> Result<(), ApplyError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, document).await?;
        Ok(())
    }
}

/// Pushes the document to a running engine through its external controller
/// API.
pub struct ControllerSink {
    pub endpoint: String,
    pub secret: Option<String>,
    pub client: reqwest::Client,
}

#[async_trait]
impl ConfigSink for ControllerSink {
    async fn apply(&self, document: &str, force_reload: bool) -> Result<(), ApplyError> {
        let url = format!(
            "{}/configs?force={}",
            self.endpoint.trim_end_matches('/'),
            force_reload
        );
        let mut request = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "payload": document }));
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApplyError::Rejected(status));
        }
        Ok(())
    }
}

//! Credential Provider
//!
//! Loads the service-account style JSON file that identifies the pipeline to
//! the warehouse. The loaded [`ServiceAccount`] is handed to whatever needs it;
//! nothing here touches process-wide state.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    /// Connection string for the warehouse. Carries the secret.
    pub warehouse_url: String,
    #[serde(skip)]
    source_path: PathBuf,
}

impl ServiceAccount {
    /// Read and parse the credential file.
    ///
    /// A missing or unreadable file, invalid JSON, or an empty
    /// `warehouse_url` all yield [`PipelineError::Configuration`].
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PipelineError::Configuration(format!(
                "Credential file {} not found",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to read credential file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut account: ServiceAccount = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Configuration(format!(
                "Invalid credential file {}: {}",
                path.display(),
                e
            ))
        })?;

        if account.warehouse_url.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Credential file {} has an empty warehouse_url",
                path.display()
            )));
        }

        account.source_path = path.to_path_buf();

        tracing::debug!(
            path = %path.display(),
            client_email = account.client_email.as_deref().unwrap_or("-"),
            "Loaded service account"
        );

        Ok(account)
    }

    /// Identity used in log lines; never the secret.
    pub fn identity(&self) -> &str {
        self.client_email
            .as_deref()
            .or(self.project_id.as_deref())
            .unwrap_or("anonymous")
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

// warehouse_url embeds a password
impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("warehouse_url", &"<redacted>")
            .finish()
    }
}

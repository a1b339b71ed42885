pub mod confluence;
pub mod gitlab;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CISyncError, Result};

pub use confluence::ConfluenceClient;
pub use gitlab::GitLabClient;

/// Source of raw pipeline records.
pub trait PipelineSource {
    async fn get_pipeline(&self, project_id: &str, pipeline_id: u64) -> Result<Value>;

    async fn get_test_summary(&self, project_id: &str, pipeline_id: u64) -> Result<Value>;

    /// Lists the most recent pipelines, newest first.
    async fn list_pipelines(
        &self,
        project_id: &str,
        limit: usize,
        status: Option<&str>,
    ) -> Result<Vec<Value>>;
}

/// A page as read from the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub version: u64,
}

/// Store of versioned documents.
pub trait DocumentStore {
    async fn get_document(&self, id: &str) -> Result<Document>;

    /// Writes `content` on top of `version`, the version that was read.
    ///
    /// The store bumps the version itself and rejects stale writes.
    async fn update_document(
        &self,
        id: &str,
        title: &str,
        content: &str,
        version: u64,
    ) -> Result<Value>;
}

/// Decodes a successful JSON response, turning any other status into [`CISyncError::Api`].
async fn read_json<T>(response: reqwest::Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();

    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(CISyncError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

fn user_agent() -> String {
    format!("CISync/{}", env!("CARGO_PKG_VERSION"))
}

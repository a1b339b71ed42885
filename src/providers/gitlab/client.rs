use log::debug;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::auth::Token;
use crate::error::{CISyncError, Result};
use crate::providers::{read_json, user_agent, PipelineSource};

/// GitLab caps `per_page` at this value.
pub const MAX_PAGE_SIZE: usize = 100;

/// Client for the GitLab REST API (v4).
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|e| CISyncError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(&with_trailing_slash(base_url))
            .map_err(|e| CISyncError::Config(format!("Invalid GitLab URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| CISyncError::Config(format!("Invalid GitLab API URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header("PRIVATE-TOKEN", token.as_str())
        } else {
            request
        }
    }

    /// Builds `projects/:id/pipelines[/...]`, encoding the project id as one segment.
    fn pipelines_url(&self, project_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| CISyncError::Config(format!("Invalid GitLab API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["projects", project_id, "pipelines"])
            .extend(tail);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<reqwest::Response> {
        debug!("GET {url}");
        let request = self.auth_request(self.client.get(url).query(query));
        Ok(request.send().await?)
    }
}

impl PipelineSource for GitLabClient {
    async fn get_pipeline(&self, project_id: &str, pipeline_id: u64) -> Result<Value> {
        let url = self.pipelines_url(project_id, &[pipeline_id.to_string().as_str()])?;
        read_json(self.get(url, &[]).await?).await
    }

    async fn get_test_summary(&self, project_id: &str, pipeline_id: u64) -> Result<Value> {
        let url = self.pipelines_url(
            project_id,
            &[pipeline_id.to_string().as_str(), "test_report_summary"],
        )?;
        read_json(self.get(url, &[]).await?).await
    }

    async fn list_pipelines(
        &self,
        project_id: &str,
        limit: usize,
        status: Option<&str>,
    ) -> Result<Vec<Value>> {
        let url = self.pipelines_url(project_id, &[])?;

        let mut query = vec![("per_page", limit.clamp(1, MAX_PAGE_SIZE).to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }

        read_json(self.get(url, &query).await?).await
    }
}

fn with_trailing_slash(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_pipeline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/21/pipelines/287")
            .match_header("private-token", "test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"id": 287, "ref": "my-app - v1.2.3", "status": "success"}).to_string())
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("test_token"))).unwrap();
        let pipeline = client.get_pipeline("21", 287).await.unwrap();

        mock.assert_async().await;
        assert_eq!(pipeline["id"], 287);
        assert_eq!(pipeline["ref"], "my-app - v1.2.3");
    }

    #[tokio::test]
    async fn test_project_path_is_encoded_as_one_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/group%2Fproject/pipelines/5/test_report_summary")
            .with_status(200)
            .with_body(json!({"total": {"count": 3}}).to_string())
            .create_async()
            .await;

        let client = GitLabClient::new(&format!("{}/", server.url()), None).unwrap();
        let summary = client.get_test_summary("group/project", 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(summary["total"]["count"], 3);
    }

    #[tokio::test]
    async fn test_list_pipelines_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/21/pipelines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "10".into()),
                Matcher::UrlEncoded("status".into(), "success".into()),
            ]))
            .with_status(200)
            .with_body(json!([{"id": 287}, {"id": 286}]).to_string())
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let pipelines = client
            .list_pipelines("21", 10, Some("success"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0]["id"], 287);
    }

    #[tokio::test]
    async fn test_list_pipelines_caps_page_size() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/21/pipelines")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let pipelines = client.list_pipelines("21", 500, None).await.unwrap();

        mock.assert_async().await;
        assert!(pipelines.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_reported_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/21/pipelines/999")
            .with_status(404)
            .with_body(r#"{"message":"404 Not found"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client.get_pipeline("21", 999).await.unwrap_err();

        match err {
            CISyncError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, r#"{"message":"404 Not found"}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_pipelines_rejects_wrong_shape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/21/pipelines")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": 1}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client.list_pipelines("21", 10, None).await.unwrap_err();

        assert!(matches!(err, CISyncError::Json(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            GitLabClient::new("not a url", None),
            Err(CISyncError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_with_path() {
        let client = GitLabClient::new("https://example.com/gitlab", None).unwrap();
        let url = client.pipelines_url("a/b", &["7"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/gitlab/api/v4/projects/a%2Fb/pipelines/7"
        );
    }
}

use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::auth::Token;
use crate::error::{CISyncError, Result};
use crate::providers::{read_json, user_agent, Document, DocumentStore};

const VERSION_MESSAGE: &str = "Updated via GitLab pipeline sync";

/// Client for the Confluence REST content API.
///
/// Authenticates with an account email and API token (HTTP basic auth).
pub struct ConfluenceClient {
    client: Client,
    content_url: Url,
    email: String,
    token: Token,
}

impl ConfluenceClient {
    pub fn new(base_url: &str, email: String, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|e| CISyncError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let content_url = Url::parse(&base)
            .map_err(|e| CISyncError::Config(format!("Invalid Confluence URL: {e}")))?
            .join("rest/api/content/")
            .map_err(|e| CISyncError::Config(format!("Invalid Confluence API URL: {e}")))?;

        Ok(Self {
            client,
            content_url,
            email,
            token,
        })
    }

    fn page_url(&self, page_id: &str) -> Result<Url> {
        let mut url = self.content_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CISyncError::Config(format!("Invalid Confluence API URL: {}", self.content_url))
            })?
            .pop_if_empty()
            .push(page_id);
        Ok(url)
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.email, Some(self.token.as_str()))
    }
}

impl DocumentStore for ConfluenceClient {
    async fn get_document(&self, id: &str) -> Result<Document> {
        let url = self.page_url(id)?;
        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url))
            .query(&[("expand", "body.storage,version")])
            .send()
            .await?;
        let page: PageResponse = read_json(response).await?;

        Ok(Document {
            title: page.title,
            content: page.body.storage.value,
            version: page.version.number,
        })
    }

    async fn update_document(
        &self,
        id: &str,
        title: &str,
        content: &str,
        version: u64,
    ) -> Result<Value> {
        let url = self.page_url(id)?;
        debug!("PUT {url} (version {version} -> {})", version + 1);

        let body = json!({
            "id": id,
            "type": "page",
            "title": title,
            "body": {
                "storage": {
                    "value": content,
                    "representation": "storage"
                }
            },
            "version": {
                "number": version + 1,
                "message": VERSION_MESSAGE
            }
        });

        let response = self
            .auth_request(self.client.put(url))
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }
}

/// The parts of `GET /rest/api/content/:id?expand=body.storage,version` used here.
#[derive(Deserialize)]
struct PageResponse {
    title: String,
    body: PageBody,
    version: PageVersion,
}

#[derive(Deserialize)]
struct PageBody {
    storage: PageStorage,
}

#[derive(Deserialize)]
struct PageStorage {
    value: String,
}

#[derive(Deserialize)]
struct PageVersion {
    number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> ConfluenceClient {
        ConfluenceClient::new(
            &server.url(),
            "test@example.com".to_string(),
            Token::from("test_token"),
        )
        .unwrap()
    }

    fn page_response() -> Value {
        json!({
            "id": "123456",
            "type": "page",
            "status": "current",
            "title": "Pipeline Results",
            "body": {
                "storage": {
                    "value": "<h2>my-app</h2><p>Old content here</p><h2>other-app</h2><p>More content</p>",
                    "representation": "storage"
                }
            },
            "version": {
                "number": 5,
                "message": "Previous update"
            }
        })
    }

    #[tokio::test]
    async fn test_get_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/content/123456")
            .match_query(Matcher::UrlEncoded(
                "expand".into(),
                "body.storage,version".into(),
            ))
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_body(page_response().to_string())
            .create_async()
            .await;

        let document = client(&server).get_document("123456").await.unwrap();

        mock.assert_async().await;
        assert_eq!(document.title, "Pipeline Results");
        assert_eq!(document.version, 5);
        assert!(document.content.starts_with("<h2>my-app</h2>"));
    }

    #[tokio::test]
    async fn test_get_document_missing_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/content/123456")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"title": "Pipeline Results", "version": {"number": 5}}).to_string())
            .create_async()
            .await;

        let err = client(&server).get_document("123456").await.unwrap_err();

        assert!(matches!(err, CISyncError::Json(_)));
    }

    #[tokio::test]
    async fn test_update_document_increments_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/rest/api/content/123456")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "id": "123456",
                "type": "page",
                "title": "Pipeline Results",
                "body": {
                    "storage": {
                        "value": "<h2>my-app</h2><p>New content</p>",
                        "representation": "storage"
                    }
                },
                "version": { "number": 6 }
            })))
            .with_status(200)
            .with_body(json!({"id": "123456", "version": {"number": 6}}).to_string())
            .create_async()
            .await;

        let confirmation = client(&server)
            .update_document(
                "123456",
                "Pipeline Results",
                "<h2>my-app</h2><p>New content</p>",
                5,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(confirmation["version"]["number"], 6);
    }

    #[tokio::test]
    async fn test_update_conflict_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/rest/api/content/123456")
            .with_status(409)
            .with_body("Version must be incremented on update")
            .create_async()
            .await;

        let err = client(&server)
            .update_document("123456", "Pipeline Results", "", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, CISyncError::Api { status: 409, .. }));
        assert!(err.to_string().contains("Version must be incremented"));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::collector::ChangedItemsApi;
use crate::error::SourceError;
use crate::story::RawItem;

/// Client for the Hacker News Firebase API.
pub struct HackerNewsClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Updates {
    #[serde(default)]
    items: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct HnItem {
    title: Option<String>,
    url: Option<String>,
    by: Option<String>,
}

impl HackerNewsClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>, reqwest::Error> {
        self.client
            .get(format!("{}/v0/item/{}.json", self.base_url, id))
            .send()
            .await?
            .error_for_status()?
            .json::<Option<HnItem>>()
            .await
    }
}

#[async_trait]
impl ChangedItemsApi for HackerNewsClient {
    async fn changed_ids(&self) -> Result<Vec<u64>, SourceError> {
        let updates = self
            .client
            .get(format!("{}/v0/updates.json", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<Updates>()
            .await?;

        Ok(updates.items)
    }

    async fn item(&self, id: u64) -> Result<RawItem, SourceError> {
        match self.fetch_item(id).await {
            Ok(Some(item)) => Ok(RawItem {
                title: item.title,
                url: item.url,
                author: item.by,
            }),
            Ok(None) => Err(SourceError::ItemMissing(id)),
            Err(e) if e.is_timeout() => Err(SourceError::Timeout),
            Err(e) => Err(SourceError::ItemFetchFailed {
                id,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HackerNewsClient {
        HackerNewsClient::new(&server.uri(), "storyhub-test", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_changed_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/updates.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [8423305, 8420805, 8423379],
                "profiles": ["thefox", "mdda"]
            })))
            .mount(&server)
            .await;

        let ids = client_for(&server).changed_ids().await.unwrap();
        assert_eq!(ids, vec![8423305, 8420805, 8423379]);
    }

    #[tokio::test]
    async fn test_changed_ids_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/updates.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).changed_ids().await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_item_maps_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/item/8863.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "by": "dhouston",
                "id": 8863,
                "score": 111,
                "title": "My YC app: Dropbox - Throw away your USB drive",
                "type": "story",
                "url": "http://www.getdropbox.com/u/2/screencast.html"
            })))
            .mount(&server)
            .await;

        let item = client_for(&server).item(8863).await.unwrap();
        assert_eq!(
            item.title.as_deref(),
            Some("My YC app: Dropbox - Throw away your USB drive")
        );
        assert_eq!(item.author.as_deref(), Some("dhouston"));
        assert_eq!(
            item.url.as_deref(),
            Some("http://www.getdropbox.com/u/2/screencast.html")
        );
    }

    #[tokio::test]
    async fn test_item_without_title_or_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/item/2921983.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "by": "norvig",
                "id": 2921983,
                "type": "comment"
            })))
            .mount(&server)
            .await;

        let item = client_for(&server).item(2921983).await.unwrap();
        assert_eq!(item.title, None);
        assert_eq!(item.url, None);
        assert_eq!(item.author.as_deref(), Some("norvig"));
    }

    #[tokio::test]
    async fn test_item_null_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/item/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let result = client_for(&server).item(1).await;
        assert!(matches!(result, Err(SourceError::ItemMissing(1))));
    }

    #[tokio::test]
    async fn test_item_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/item/2.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).item(2).await;
        assert!(matches!(
            result,
            Err(SourceError::ItemFetchFailed { id: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_item_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/item/3.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("null")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client =
            HackerNewsClient::new(&server.uri(), "storyhub-test", Duration::from_millis(100));
        let result = client.item(3).await;
        assert!(matches!(result, Err(SourceError::Timeout)));
    }
}

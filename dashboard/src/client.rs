//! Typed access to the node API

use reqwest::Url;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::io::HttpClient;
use crate::model::{Node, NodeDetailResponse, NodesResponse, Reading};

pub struct NodeClient {
    base: Url,
    http: Arc<dyn HttpClient>,
}

impl NodeClient {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid API URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API URL '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self { base, http })
    }

    /// `{base}/nodes/`
    pub fn nodes_url(&self) -> String {
        self.url_for(&["nodes", ""])
    }

    /// `{base}/nodes/{id}` with the id percent-encoded
    pub fn node_url(&self, node_id: &str) -> String {
        self.url_for(&["nodes", node_id])
    }

    fn url_for(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let body = self.fetch(&self.nodes_url()).await?;
        let parsed: NodesResponse = serde_json::from_str(&body)?;
        Ok(parsed.nodes)
    }

    pub async fn node_readings(&self, node_id: &str) -> Result<Vec<Reading>> {
        let body = self.fetch(&self.node_url(node_id)).await?;
        let parsed: NodeDetailResponse = serde_json::from_str(&body)?;
        Ok(parsed.last_readings)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).await?;
        if response.status != 200 {
            return Err(Error::Status(response.status));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn client_with(mock: MockHttpClient) -> NodeClient {
        NodeClient::new("http://127.0.0.1:8000", Arc::new(mock)).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client_with(MockHttpClient::new());
        assert_eq!(client.nodes_url(), "http://127.0.0.1:8000/nodes/");
        assert_eq!(client.node_url("65f0a1"), "http://127.0.0.1:8000/nodes/65f0a1");
        assert_eq!(client.node_url("a b/c"), "http://127.0.0.1:8000/nodes/a%20b%2Fc");
    }

    #[test]
    fn test_urls_keep_base_path() {
        let client = NodeClient::new("http://host:9000/api/", Arc::new(MockHttpClient::new()))
            .unwrap();
        assert_eq!(client.nodes_url(), "http://host:9000/api/nodes/");
        assert_eq!(client.node_url("x"), "http://host:9000/api/nodes/x");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = NodeClient::new("not a url", Arc::new(MockHttpClient::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_list_nodes_success() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("127.0.0.1:8000/nodes/"))
            .returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"nodes":[{"_id":"a","node_name":"A","latitude":1.0,"longitude":2.0}]}"#
                            .to_string(),
                    })
                })
            });

        let nodes = client_with(mock).list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_name, "A");
    }

    #[tokio::test]
    async fn test_non_200_is_status_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 204,
                    body: String::new(),
                })
            })
        });

        let err = client_with(mock).list_nodes().await.unwrap_err();
        assert!(matches!(err, Error::Status(204)), "{err:?}");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    body: "<html>oops</html>".to_string(),
                })
            })
        });

        let err = client_with(mock).node_readings("a").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)), "{err:?}");
    }
}

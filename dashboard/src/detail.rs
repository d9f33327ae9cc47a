use std::sync::Arc;

use tracing::{debug, error};

use crate::client::NodeClient;
use crate::metrics::{DETAIL_FAILURES_TOTAL, DETAIL_REQUESTS_TOTAL};
use crate::state::StateHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    /// The panel opened with this many readings
    Opened(usize),
    /// Another selection (or a close) happened while the request was in flight
    Superseded,
    Failed,
}

/// Loads one node's reading history into the side panel
#[derive(Clone)]
pub struct DetailFetcher {
    client: Arc<NodeClient>,
    state: StateHandle,
}

impl DetailFetcher {
    pub fn new(client: Arc<NodeClient>, state: StateHandle) -> Self {
        Self { client, state }
    }

    pub async fn select(&self, node_id: &str, node_name: &str) -> DetailOutcome {
        let generation = self.state.write().await.begin_selection();
        DETAIL_REQUESTS_TOTAL.inc();

        let readings = match self.client.node_readings(node_id).await {
            Ok(readings) => readings,
            Err(e) => {
                DETAIL_FAILURES_TOTAL.inc();
                error!("Error fetching data for node {}: {}", node_id, e);
                return DetailOutcome::Failed;
            }
        };

        let count = readings.len();
        let mut state = self.state.write().await;
        if state.open_panel(generation, node_id, node_name, readings) {
            debug!("Opened panel for node {} ({} readings)", node_id, count);
            DetailOutcome::Opened(count)
        } else {
            debug!("Dropping superseded history for node {}", node_id);
            DetailOutcome::Superseded
        }
    }

    pub async fn close(&self) {
        self.state.write().await.close_panel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::state::new_state_handle;
    use std::time::Duration;

    const HISTORY: &str = r#"{"last_readings":[
        {"temperature":31.0,"humidity":20.0,"smoke_value":400,"timestamp":"2024-03-01T14:05:09","fire_risk_level":3},
        {"temperature":30.0,"humidity":21.0,"smoke_value":380,"timestamp":"2024-03-01T14:04:09","fire_risk_level":2}
    ]}"#;

    fn fetcher_with(mock: MockHttpClient, state: StateHandle) -> DetailFetcher {
        let client = NodeClient::new("http://127.0.0.1:8000", Arc::new(mock)).unwrap();
        DetailFetcher::new(Arc::new(client), state)
    }

    #[test]
    fn test_select_issues_one_request_and_opens_panel() {
        tokio_test::block_on(async {
            let mut mock = MockHttpClient::new();
            mock.expect_get()
                .withf(|url| url.ends_with("/nodes/65f0a1"))
                .times(1)
                .returning(|_| {
                    Box::pin(async {
                        Ok(HttpResponse {
                            status: 200,
                            body: HISTORY.to_string(),
                        })
                    })
                });

            let state = new_state_handle();
            let fetcher = fetcher_with(mock, Arc::clone(&state));

            assert_eq!(
                fetcher.select("65f0a1", "Ridge").await,
                DetailOutcome::Opened(2)
            );

            let state = state.read().await;
            assert!(state.panel.open);
            assert_eq!(state.panel.node_id, "65f0a1");
            assert_eq!(state.panel.node_name, "Ridge");
            assert_eq!(state.panel.readings.len(), 2);
        });
    }

    #[test]
    fn test_failed_select_leaves_panel_closed() {
        tokio_test::block_on(async {
            let mut mock = MockHttpClient::new();
            mock.expect_get()
                .times(1)
                .returning(|_| Box::pin(async { Err(Error::Http("timed out".to_string())) }));

            let state = new_state_handle();
            let fetcher = fetcher_with(mock, Arc::clone(&state));

            assert_eq!(fetcher.select("a", "A").await, DetailOutcome::Failed);
            assert!(!state.read().await.panel.open);
            assert!(state.read().await.panel.readings.is_empty());
        });
    }

    #[test]
    fn test_failed_select_keeps_open_panel() {
        tokio_test::block_on(async {
            let mut mock = MockHttpClient::new();
            mock.expect_get()
                .withf(|url| url.ends_with("/nodes/a"))
                .times(1)
                .returning(|_| {
                    Box::pin(async {
                        Ok(HttpResponse {
                            status: 200,
                            body: HISTORY.to_string(),
                        })
                    })
                });
            mock.expect_get()
                .withf(|url| url.ends_with("/nodes/b"))
                .times(1)
                .returning(|_| {
                    Box::pin(async {
                        Ok(HttpResponse {
                            status: 404,
                            body: "{\"detail\":\"Not Found\"}".to_string(),
                        })
                    })
                });

            let state = new_state_handle();
            let fetcher = fetcher_with(mock, Arc::clone(&state));

            fetcher.select("a", "A").await;
            let before = state.read().await.panel.clone();

            assert_eq!(fetcher.select("b", "B").await, DetailOutcome::Failed);
            assert_eq!(state.read().await.panel, before);
        });
    }

    #[test]
    fn test_close_clears_history() {
        tokio_test::block_on(async {
            let mut mock = MockHttpClient::new();
            mock.expect_get().times(1).returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: HISTORY.to_string(),
                    })
                })
            });

            let state = new_state_handle();
            let fetcher = fetcher_with(mock, Arc::clone(&state));

            fetcher.select("a", "A").await;
            fetcher.close().await;

            let state = state.read().await;
            assert!(!state.panel.open);
            assert!(state.panel.readings.is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_request_keeps_panel_closed() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().times(1).returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(HttpResponse {
                    status: 200,
                    body: HISTORY.to_string(),
                })
            })
        });

        let state = new_state_handle();
        let fetcher = fetcher_with(mock, Arc::clone(&state));

        let (outcome, _) = tokio::join!(fetcher.select("a", "A"), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            fetcher.close().await;
        });

        assert_eq!(outcome, DetailOutcome::Superseded);
        assert!(!state.read().await.panel.open);
    }
}

//! HTTP client for the commerce orders API.
//!
//! `GET <url>?modifiedAfter=..&modifiedBefore=..` with bearer auth. The API
//! pages large result sets; continuation requests carry only `cursor`.

use chrono::SecondsFormat;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, instrument};

use designmail_orders::Order;

use super::{OrderSource, OrderSourceError, TimeWindow};
use crate::config::OrderSourceConfig;

/// Upper bound on continuation requests per fetch.
const MAX_PAGES: usize = 50;

/// Order source backed by the remote orders API.
#[derive(Debug, Clone)]
pub struct HttpOrderSource {
    client: reqwest::Client,
    config: OrderSourceConfig,
}

#[derive(Debug, Deserialize)]
struct OrdersPage {
    /// `null` and a missing field both mean no orders.
    #[serde(default)]
    result: Option<Vec<Order>>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    next_page_cursor: Option<String>,
}

impl HttpOrderSource {
    pub fn new(config: OrderSourceConfig) -> Result<Self, OrderSourceError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| OrderSourceError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: OrderSourceConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_page(&self, query: &[(&str, String)]) -> Result<OrdersPage, OrderSourceError> {
        let resp = self
            .client
            .get(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .header(USER_AGENT, &self.config.user_agent)
            .query(query)
            .send()
            .await
            .map_err(|e| OrderSourceError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| OrderSourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(OrderSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| OrderSourceError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl OrderSource for HttpOrderSource {
    #[instrument(
        skip(self),
        fields(
            start = %window.start.to_rfc3339(),
            end = %window.end.to_rfc3339()
        )
    )]
    async fn fetch_orders(&self, window: TimeWindow) -> Result<Vec<Order>, OrderSourceError> {
        debug!(key_preview = %key_preview(&self.config.api_key), "polling order source");

        let mut page = self
            .fetch_page(&[
                (
                    "modifiedAfter",
                    window.start.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
                (
                    "modifiedBefore",
                    window.end.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ])
            .await?;

        let mut orders = page.result.take().unwrap_or_default();
        let mut pages = 1;

        while let Some(cursor) = next_cursor(page.pagination.take()) {
            if pages >= MAX_PAGES {
                return Err(OrderSourceError::Decode(format!(
                    "pagination did not terminate after {MAX_PAGES} pages"
                )));
            }
            page = self.fetch_page(&[("cursor", cursor)]).await?;
            orders.extend(page.result.take().unwrap_or_default());
            pages += 1;
        }

        debug!(count = orders.len(), pages, "order source responded");
        Ok(orders)
    }
}

fn next_cursor(pagination: Option<Pagination>) -> Option<String> {
    let p = pagination?;
    if !p.has_next_page {
        return None;
    }
    p.next_page_cursor.filter(|c| !c.is_empty())
}

/// First 8 characters of a secret, for correlating logs without leaking it.
fn key_preview(key: &str) -> String {
    let head: String = key.chars().take(8).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use std::time::Duration;

    const PATH: &str = "/1.0/commerce/orders";

    fn config(server: &mockito::ServerGuard) -> OrderSourceConfig {
        OrderSourceConfig {
            url: format!("{}{}", server.url(), PATH),
            api_key: "test-key-0123456789".to_string(),
            user_agent: "designmail-test".to_string(),
        }
    }

    fn window() -> TimeWindow {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        TimeWindow::trailing(now, Duration::from_secs(600))
    }

    fn order_json(id: &str, number: &str) -> String {
        format!(
            r#"{{"id":"{id}","orderNumber":"{number}","customerEmail":"c@example.com",
                "lineItems":[{{"sku":"SKU","quantity":1,"customizations":[{{"label":"Text","value":"d-{id}"}}]}}],
                "fulfillmentStatus":"PENDING","modifiedOn":"2024-03-01T11:55:00Z"}}"#
        )
    }

    #[tokio::test]
    async fn sends_window_and_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_header("authorization", "Bearer test-key-0123456789")
            .match_header("user-agent", "designmail-test")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("modifiedAfter".into(), "2024-03-01T11:50:00.000Z".into()),
                Matcher::UrlEncoded("modifiedBefore".into(), "2024-03-01T12:00:00.000Z".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"result":[{}]}}"#, order_json("o1", "1001")))
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let orders = source.fetch_orders(window()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_number, "1001");
        assert_eq!(orders[0].design_reference().unwrap().as_str(), "d-o1");
    }

    #[tokio::test]
    async fn missing_result_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        assert!(source.fetch_orders(window()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_result_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":null,"pagination":{"hasNextPage":false}}"#)
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let orders = source.fetch_orders(window()).await.unwrap();

        mock.assert_async().await;
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn null_result_on_a_later_page_ends_cleanly() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded(
                "modifiedAfter".into(),
                "2024-03-01T11:50:00.000Z".into(),
            ))
            .with_status(200)
            .with_body(format!(
                r#"{{"result":[{}],"pagination":{{"hasNextPage":true,"nextPageCursor":"c1"}}}}"#,
                order_json("o1", "1001")
            ))
            .create_async()
            .await;
        let _second = server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded("cursor".into(), "c1".into()))
            .with_status(200)
            .with_body(r#"{"result":null}"#)
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let orders = source.fetch_orders(window()).await.unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_number, "1001");
    }

    #[tokio::test]
    async fn follows_pagination_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded(
                "modifiedAfter".into(),
                "2024-03-01T11:50:00.000Z".into(),
            ))
            .with_status(200)
            .with_body(format!(
                r#"{{"result":[{}],"pagination":{{"hasNextPage":true,"nextPageCursor":"c1"}}}}"#,
                order_json("o1", "1001")
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded("cursor".into(), "c1".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"result":[{}],"pagination":{{"hasNextPage":false,"nextPageCursor":null}}}}"#,
                order_json("o2", "1002")
            ))
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let numbers: Vec<_> = source
            .fetch_orders(window())
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_number)
            .collect();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(numbers, vec!["1001", "1002"]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"unauthorized"}"#)
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let err = source.fetch_orders(window()).await.unwrap_err();
        assert!(matches!(err, OrderSourceError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result": "nope"}"#)
            .create_async()
            .await;

        let source = HttpOrderSource::new(config(&server)).unwrap();
        let err = source.fetch_orders(window()).await.unwrap_err();
        assert!(matches!(err, OrderSourceError::Decode(_)));
    }

    #[test]
    fn key_preview_truncates() {
        assert_eq!(key_preview("abcdefghijkl"), "abcdefgh...");
        assert_eq!(key_preview("abc"), "abc...");
    }
}

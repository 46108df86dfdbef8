//! Remote service boundary
//!
//! The orchestrator talks to three abstract operations: an export planning
//! call, an export batch fetch, and a bulk message send. [`RemoteService`]
//! captures that boundary as a trait so tests (and embedders with a
//! non-HTTP transport) can substitute their own implementation;
//! [`HttpRemote`] is the reqwest-backed implementation for the real API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::types::SendResult;

/// Server-reported export plan
///
/// The server owns chunking: it may use a different batch size than the
/// client's hint, so these counts are authoritative.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ExportInfo {
    /// Total records matching the filter
    pub total_records: u64,
    /// Number of batches the server will serve
    pub num_batches: u64,
    /// Records per batch on the server side
    pub batch_size: u64,
}

/// One fetched export batch
#[derive(Clone, Debug)]
pub struct ExportBatch {
    /// Opaque binary payload to persist
    pub payload: Vec<u8>,
    /// Filename from the Content-Disposition header, if present
    pub suggested_name: Option<String>,
}

/// One personalized outbound message
#[derive(Clone, Debug, Serialize)]
pub struct OutboundMessage {
    /// Recipient phone number or contact identifier
    pub phone: String,
    /// Fully rendered message body
    pub message: String,
}

/// Request body for the bulk-send endpoint
#[derive(Debug, Serialize)]
struct BulkSendRequest<'a> {
    messages: &'a [OutboundMessage],
    batch_size: usize,
}

/// Per-recipient entry in the gateway response
#[derive(Debug, Deserialize)]
struct GatewayResult {
    phone: String,
    success: bool,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Response body from the bulk-send endpoint
#[derive(Debug, Deserialize)]
struct BulkSendResponse {
    results: Vec<GatewayResult>,
}

/// Abstract transport to the remote service
///
/// All three calls must respect the implementation's configured timeout and
/// surface it as an ordinary error, never a panic.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Export planning call: filter → authoritative item and batch counts
    async fn export_info(&self, filter: &HashMap<String, String>) -> Result<ExportInfo>;

    /// Fetch one export batch by its server-assigned number
    async fn export_batch(
        &self,
        batch_number: usize,
        filter: &HashMap<String, String>,
    ) -> Result<ExportBatch>;

    /// Send one batch of personalized messages; returns per-recipient results
    async fn send_batch(&self, messages: &[OutboundMessage]) -> Result<Vec<SendResult>>;
}

/// HTTP implementation of [`RemoteService`]
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    export_info: Url,
    export_batch_base: Url,
    bulk_send: Url,
}

impl HttpRemote {
    /// Create an HTTP remote with explicit endpoints
    ///
    /// `export_batch_base` has the batch number appended as a path segment
    /// (`{base}/{batch_number}`). The timeout applies to every request.
    pub fn new(
        export_info: Url,
        export_batch_base: Url,
        bulk_send: Url,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            export_info,
            export_batch_base,
            bulk_send,
        })
    }

    /// Turn a non-success response into a [`Error::Gateway`]
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(Error::Gateway {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn export_info(&self, filter: &HashMap<String, String>) -> Result<ExportInfo> {
        let response = self
            .client
            .get(self.export_info.clone())
            .query(filter)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn export_batch(
        &self,
        batch_number: usize,
        filter: &HashMap<String, String>,
    ) -> Result<ExportBatch> {
        let mut url = self.export_batch_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config {
                message: "export batch URL cannot be a base".into(),
                key: Some("export_batch_base".into()),
            })?
            .push(&batch_number.to_string());

        let response = self.client.get(url).query(filter).send().await?;
        let response = Self::check_status(response).await?;

        let suggested_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        let payload = response.bytes().await?.to_vec();

        Ok(ExportBatch {
            payload,
            suggested_name,
        })
    }

    async fn send_batch(&self, messages: &[OutboundMessage]) -> Result<Vec<SendResult>> {
        let body = BulkSendRequest {
            messages,
            batch_size: messages.len(),
        };
        let response = self
            .client
            .post(self.bulk_send.clone())
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let parsed: BulkSendResponse = response.json().await?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SendResult {
                address: r.phone,
                success: r.success,
                message_id: r.message_id,
                error: r.error,
            })
            .collect())
    }
}

/// Extract the filename from a Content-Disposition header value
///
/// Takes everything after `filename=`, stripped of quotes. Matches what the
/// export endpoints actually send (`attachment; filename=..._parte_1.xlsx`).
fn content_disposition_filename(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=")?;
    let name: String = rest
        .trim()
        .trim_end_matches(';')
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();
    if name.is_empty() { None } else { Some(name) }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_for(server: &MockServer) -> HttpRemote {
        let base: Url = server.uri().parse().unwrap();
        HttpRemote::new(
            base.join("/export/info").unwrap(),
            base.join("/export/batch").unwrap(),
            base.join("/messages/bulk").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // Content-Disposition parsing
    // -----------------------------------------------------------------------

    #[test]
    fn filename_extracted_from_quoted_header() {
        let name = content_disposition_filename("attachment; filename=\"electores_parte_1.xlsx\"");
        assert_eq!(name.as_deref(), Some("electores_parte_1.xlsx"));
    }

    #[test]
    fn filename_extracted_without_quotes() {
        let name = content_disposition_filename("attachment; filename=tickets_parte_3.xlsx");
        assert_eq!(name.as_deref(), Some("tickets_parte_3.xlsx"));
    }

    #[test]
    fn header_without_filename_yields_none() {
        assert_eq!(content_disposition_filename("inline"), None);
        assert_eq!(content_disposition_filename("attachment; filename="), None);
    }

    // -----------------------------------------------------------------------
    // export_info
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn export_info_forwards_filter_and_parses_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export/info"))
            .and(query_param("codigo_estado", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_records": 250_000,
                "num_batches": 3,
                "batch_size": 100_000,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let mut filter = HashMap::new();
        filter.insert("codigo_estado".to_string(), "10".to_string());

        let info = remote.export_info(&filter).await.unwrap();
        assert_eq!(info.total_records, 250_000);
        assert_eq!(info.num_batches, 3);
        assert_eq!(info.batch_size, 100_000);
    }

    #[tokio::test]
    async fn export_info_non_success_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export/info"))
            .respond_with(ResponseTemplate::new(500).set_body_string("query failed"))
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let err = remote.export_info(&HashMap::new()).await.unwrap_err();
        match err {
            Error::Gateway { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "query failed");
            }
            other => panic!("expected Gateway error, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // export_batch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn export_batch_appends_number_and_reads_suggested_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export/batch/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Content-Disposition",
                        "attachment; filename=\"electores_parte_2.xlsx\"",
                    )
                    .set_body_bytes(b"payload-bytes".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let batch = remote.export_batch(2, &HashMap::new()).await.unwrap();
        assert_eq!(batch.payload, b"payload-bytes");
        assert_eq!(batch.suggested_name.as_deref(), Some("electores_parte_2.xlsx"));
    }

    #[tokio::test]
    async fn export_batch_without_header_has_no_suggested_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export/batch/1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let batch = remote.export_batch(1, &HashMap::new()).await.unwrap();
        assert_eq!(batch.payload, vec![1, 2, 3]);
        assert!(batch.suggested_name.is_none());
    }

    // -----------------------------------------------------------------------
    // send_batch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn send_batch_posts_whole_batch_and_maps_results() {
        let server = MockServer::start().await;
        let expected_body = serde_json::json!({
            "messages": [
                {"phone": "+58414", "message": "Hola Ana"},
                {"phone": "+58424", "message": "Hola Luis"},
            ],
            "batch_size": 2,
        });
        Mock::given(method("POST"))
            .and(path("/messages/bulk"))
            .and(body_json_string(expected_body.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "results": [
                    {"phone": "+58414", "success": true, "message_id": "msg_1"},
                    {"phone": "+58424", "success": false, "error": "carrier rejected"},
                ],
                "summary": {"total": 2, "success": 1, "failed": 1},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let messages = vec![
            OutboundMessage {
                phone: "+58414".into(),
                message: "Hola Ana".into(),
            },
            OutboundMessage {
                phone: "+58424".into(),
                message: "Hola Luis".into(),
            },
        ];
        let results = remote.send_batch(&messages).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].message_id.as_deref(), Some("msg_1"));
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("carrier rejected"));
    }

    #[tokio::test]
    async fn send_batch_transport_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/bulk"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let messages = vec![OutboundMessage {
            phone: "+58414".into(),
            message: "hi".into(),
        }];
        assert!(remote.send_batch(&messages).await.is_err());
    }
}

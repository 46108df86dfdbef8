//! Batch execution
//!
//! One entry point, two variants selected by the job's kind: fetch an export
//! batch (binary payload plus filename), or send one batch of personalized
//! messages. The executor performs exactly one attempt per call; retries
//! are orchestrator policy, never applied here.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::error::Result;
use crate::remote::{OutboundMessage, RemoteService};
use crate::template;
use crate::types::{BatchDescriptor, BatchSuccess, JobKind, JobSpec, Recipient, SendResult};

/// Executes single batches of a job against the remote service
pub struct BatchExecutor<'a> {
    remote: &'a dyn RemoteService,
    spec: &'a JobSpec,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor bound to one job's spec and remote
    pub fn new(remote: &'a dyn RemoteService, spec: &'a JobSpec) -> Self {
        Self { remote, spec }
    }

    /// Execute one batch; any transport or gateway failure comes back as `Err`
    pub async fn execute(&self, descriptor: &BatchDescriptor) -> Result<BatchSuccess> {
        match &self.spec.kind {
            JobKind::Export => self.execute_download(descriptor).await,
            JobKind::BulkSend {
                template,
                recipients,
            } => self.execute_send(descriptor, template, recipients).await,
        }
    }

    async fn execute_download(&self, descriptor: &BatchDescriptor) -> Result<BatchSuccess> {
        let batch = self
            .remote
            .export_batch(descriptor.batch_number, &self.spec.filter)
            .await?;

        let name = batch
            .suggested_name
            .unwrap_or_else(|| format!("export_part_{}.bin", descriptor.index));

        tracing::debug!(
            batch = descriptor.index,
            bytes = batch.payload.len(),
            name = %name,
            "export batch fetched"
        );

        Ok(BatchSuccess::Download {
            payload: batch.payload,
            name,
        })
    }

    async fn execute_send(
        &self,
        descriptor: &BatchDescriptor,
        template: &crate::types::MessageTemplate,
        recipients: &[Recipient],
    ) -> Result<BatchSuccess> {
        let start = (descriptor.index - 1) * self.spec.batch_size;
        let slice = &recipients[start..start + descriptor.size];

        let messages: Vec<OutboundMessage> = slice
            .iter()
            .map(|r| OutboundMessage {
                phone: r.address.clone(),
                message: template::render(template, r),
            })
            .collect();

        let gateway_results = self.remote.send_batch(&messages).await?;

        // Map gateway results back by address, preserving batch order. A
        // duplicated address consumes one gateway entry per occurrence.
        let mut by_address: HashMap<String, VecDeque<SendResult>> = HashMap::new();
        for result in gateway_results {
            by_address
                .entry(result.address.clone())
                .or_default()
                .push_back(result);
        }

        let results: Vec<SendResult> = slice
            .iter()
            .map(|recipient| {
                by_address
                    .get_mut(recipient.address.as_str())
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| SendResult {
                        address: recipient.address.clone(),
                        success: false,
                        message_id: None,
                        error: Some("no result returned by gateway".to_string()),
                    })
            })
            .collect();

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            tracing::warn!(
                batch = descriptor.index,
                failed,
                total = results.len(),
                "send batch completed with individual failures"
            );
        }

        Ok(BatchSuccess::Sent { results })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::{ExportBatch, ExportInfo};
    use crate::types::MessageTemplate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Remote stub recording sent messages and replaying canned results
    struct StubRemote {
        batch: Option<ExportBatch>,
        send_results: Vec<SendResult>,
        sent: Mutex<Vec<Vec<OutboundMessage>>>,
    }

    impl StubRemote {
        fn for_send(results: Vec<SendResult>) -> Self {
            Self {
                batch: None,
                send_results: results,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn for_download(batch: ExportBatch) -> Self {
            Self {
                batch: Some(batch),
                send_results: Vec::new(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteService for StubRemote {
        async fn export_info(
            &self,
            _filter: &HashMap<String, String>,
        ) -> Result<ExportInfo> {
            unreachable!("executor never plans")
        }

        async fn export_batch(
            &self,
            _batch_number: usize,
            _filter: &HashMap<String, String>,
        ) -> Result<ExportBatch> {
            self.batch.clone().ok_or(Error::Gateway {
                status: 500,
                message: "no batch configured".into(),
            })
        }

        async fn send_batch(&self, messages: &[OutboundMessage]) -> Result<Vec<SendResult>> {
            self.sent.lock().unwrap().push(messages.to_vec());
            Ok(self.send_results.clone())
        }
    }

    fn ok_result(address: &str) -> SendResult {
        SendResult {
            address: address.into(),
            success: true,
            message_id: Some(format!("msg_{address}")),
            error: None,
        }
    }

    fn failed_result(address: &str, error: &str) -> SendResult {
        SendResult {
            address: address.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }

    fn send_spec(addresses: &[&str], batch_size: usize) -> JobSpec {
        let recipients = addresses
            .iter()
            .map(|a| Recipient::new(*a).with_field("nombre", format!("user-{a}")))
            .collect();
        JobSpec::bulk_send(MessageTemplate::new("Hola {nombre}"), recipients, batch_size)
    }

    // -----------------------------------------------------------------------
    // Download variant
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn download_uses_server_suggested_name() {
        let remote = StubRemote::for_download(ExportBatch {
            payload: vec![1, 2, 3],
            suggested_name: Some("electores_parte_1.xlsx".into()),
        });
        let spec = JobSpec::export(HashMap::new(), 100);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 1,
            size: 100,
            batch_number: 1,
        };

        match executor.execute(&descriptor).await.unwrap() {
            BatchSuccess::Download { payload, name } => {
                assert_eq!(payload, vec![1, 2, 3]);
                assert_eq!(name, "electores_parte_1.xlsx");
            }
            other => panic!("expected Download, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn download_synthesizes_name_when_header_missing() {
        let remote = StubRemote::for_download(ExportBatch {
            payload: Vec::new(),
            suggested_name: None,
        });
        let spec = JobSpec::export(HashMap::new(), 100);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 4,
            size: 100,
            batch_number: 4,
        };

        match executor.execute(&descriptor).await.unwrap() {
            BatchSuccess::Download { name, .. } => assert_eq!(name, "export_part_4.bin"),
            other => panic!("expected Download, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Send variant
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn send_renders_template_per_recipient() {
        let remote = StubRemote::for_send(vec![ok_result("+1"), ok_result("+2")]);
        let spec = send_spec(&["+1", "+2"], 2);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 1,
            size: 2,
            batch_number: 1,
        };

        executor.execute(&descriptor).await.unwrap();

        let sent = remote.sent.lock().unwrap();
        assert_eq!(sent.len(), 1, "one gateway call for the whole batch");
        assert_eq!(sent[0][0].message, "Hola user-+1");
        assert_eq!(sent[0][1].message, "Hola user-+2");
    }

    #[tokio::test]
    async fn scenario_b_individual_failure_is_still_batch_success() {
        let remote = StubRemote::for_send(vec![
            ok_result("+1"),
            failed_result("+2", "carrier rejected"),
        ]);
        let spec = send_spec(&["+1", "+2", "+3"], 2);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 1,
            size: 2,
            batch_number: 1,
        };

        match executor.execute(&descriptor).await.unwrap() {
            BatchSuccess::Sent { results } => {
                assert_eq!(results.len(), 2);
                assert!(results[0].success);
                assert!(!results[1].success);
                assert_eq!(results[1].error.as_deref(), Some("carrier rejected"));
            }
            other => panic!("expected Sent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_results_mapped_back_into_batch_order() {
        // Gateway answers out of order; mapping is by address
        let remote = StubRemote::for_send(vec![ok_result("+2"), ok_result("+1")]);
        let spec = send_spec(&["+1", "+2"], 2);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 1,
            size: 2,
            batch_number: 1,
        };

        match executor.execute(&descriptor).await.unwrap() {
            BatchSuccess::Sent { results } => {
                assert_eq!(results[0].address, "+1");
                assert_eq!(results[1].address, "+2");
            }
            other => panic!("expected Sent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_gateway_entry_becomes_failed_result() {
        let remote = StubRemote::for_send(vec![ok_result("+1")]);
        let spec = send_spec(&["+1", "+2"], 2);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 1,
            size: 2,
            batch_number: 1,
        };

        match executor.execute(&descriptor).await.unwrap() {
            BatchSuccess::Sent { results } => {
                assert!(results[0].success);
                assert!(!results[1].success);
                assert_eq!(
                    results[1].error.as_deref(),
                    Some("no result returned by gateway")
                );
            }
            other => panic!("expected Sent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_batch_slices_the_tail_of_the_recipient_list() {
        let remote = StubRemote::for_send(vec![ok_result("+3")]);
        let spec = send_spec(&["+1", "+2", "+3"], 2);
        let executor = BatchExecutor::new(&remote, &spec);
        let descriptor = BatchDescriptor {
            index: 2,
            size: 1,
            batch_number: 2,
        };

        executor.execute(&descriptor).await.unwrap();

        let sent = remote.sent.lock().unwrap();
        assert_eq!(sent[0].len(), 1);
        assert_eq!(sent[0][0].phone, "+3");
    }
}


use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};

use leadline_core::EventError;

use crate::handler::MessageHandler;
use crate::transport::{TransportError, UpdateTransport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Drives the long-poll loop: pull an event, acknowledge it, run the
/// handler, deliver the reply. A failing event never terminates the loop;
/// a failing transport reconnects with capped exponential backoff.
pub struct PollingRunner {
    transport: Arc<dyn UpdateTransport>,
    handler: Arc<MessageHandler>,
    reconnect_policy: ReconnectPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        handler: Arc<MessageHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "polling transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "polling retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "connecting polling transport");
        self.transport.connect().await?;
        info!(attempt, "polling transport connected");

        loop {
            let Some(event) = self.transport.next_event().await? else {
                info!(attempt, "polling transport stream closed");
                return Ok(());
            };

            info!(
                event_name = "ingress.telegram.update_received",
                event_id = %event.event_id,
                channel = ?event.channel,
                correlation_id = %event.event_id,
                "received inbound event"
            );

            if let Err(error) = self.transport.acknowledge(&event).await {
                warn!(
                    event_name = "ingress.telegram.ack_failed",
                    event_id = %event.event_id,
                    correlation_id = %event.event_id,
                    error = %error,
                    "failed to acknowledge inbound event"
                );
            }

            let reply = match self.handler.handle_event(&event).await {
                Ok(reply) => reply,
                Err(event_error) => {
                    warn!(
                        event_name = "ingress.telegram.event_failed",
                        event_id = %event.event_id,
                        correlation_id = %event.event_id,
                        error = %event_error,
                        "event handling failed; continuing poll loop"
                    );
                    Some(
                        event_error
                            .user_message()
                            .unwrap_or_else(EventError::generic_failure_message)
                            .to_string(),
                    )
                }
            };

            match reply {
                Some(text) => {
                    if let Err(error) = self.transport.send_text(&event, &text).await {
                        warn!(
                            event_id = %event.event_id,
                            correlation_id = %event.event_id,
                            error = %error,
                            "failed to deliver reply"
                        );
                    }
                }
                None => {
                    debug!(event_id = %event.event_id, "event absorbed without reply");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use leadline_core::{
        AnswerBackend, BackendError, BackendQuery, BackendReply, ChannelKind, ConversationKey,
        ExtractedLead, LeadForwardOutcome, LeadSink, LeadSinkError,
    };
    use leadline_db::InMemoryHistoryStore;

    use super::{PollingRunner, ReconnectPolicy};
    use crate::events::InboundEvent;
    use crate::handler::{HandlerSettings, MessageHandler};
    use crate::transport::{TransportError, UpdateTransport};

    struct FixedBackend;

    #[async_trait]
    impl AnswerBackend for FixedBackend {
        async fn answer(&self, _query: BackendQuery<'_>) -> Result<BackendReply, BackendError> {
            Ok(BackendReply { response: "Hi there".to_string(), additional_data: None })
        }
    }

    struct NullSink;

    #[async_trait]
    impl LeadSink for NullSink {
        async fn forward(
            &self,
            _key: &ConversationKey,
            _lead: &ExtractedLead,
            _channel: ChannelKind,
        ) -> Result<LeadForwardOutcome, LeadSinkError> {
            Ok(LeadForwardOutcome::Duplicate)
        }
    }

    fn handler() -> Arc<MessageHandler> {
        Arc::new(MessageHandler::new(
            Arc::new(InMemoryHistoryStore::default()),
            Arc::new(FixedBackend),
            Arc::new(NullSink),
            HandlerSettings {
                company_name: "SpineUP".to_string(),
                sentinel_token: "LEAD_CAPTURED".to_string(),
                business_account_identity: "spineup_admin".to_string(),
                window_size_primary: 20,
                window_size_business: 10,
            },
        ))
    }

    fn event(update_id: i64, text: Option<&str>) -> InboundEvent {
        InboundEvent {
            event_id: format!("tg-{update_id}"),
            channel: ChannelKind::Primary,
            primary_text: text.map(str::to_string),
            business_text: None,
            sender_identity: "u1".to_string(),
            chat_identity: "100".to_string(),
            is_own_business_account: false,
            chat_id: 100,
            business_connection_id: None,
            update_id,
        }
    }

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        events: VecDeque<Result<Option<InboundEvent>, TransportError>>,
        connect_attempts: usize,
        acknowledged: Vec<String>,
        sent: Vec<(String, String)>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            events: Vec<Result<Option<InboundEvent>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    events: events.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledged(&self) -> Vec<String> {
            self.state.lock().await.acknowledged.clone()
        }

        async fn sent(&self) -> Vec<(String, String)> {
            self.state.lock().await.sent.clone()
        }
    }

    #[async_trait]
    impl UpdateTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
            let mut state = self.state.lock().await;
            state.events.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, event: &InboundEvent) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledged.push(event.event_id.clone());
            Ok(())
        }

        async fn send_text(&self, event: &InboundEvent, text: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.sent.push((event.event_id.clone(), text.to_string()));
            Ok(())
        }
    }

    fn no_backoff(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_string())), Ok(())],
            vec![Ok(Some(event(1, Some("hello")))), Ok(None)],
        ));

        let runner = PollingRunner::new(transport.clone(), handler(), no_backoff(2));
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledged().await, vec!["tg-1"]);
        assert_eq!(transport.sent().await, vec![("tg-1".to_string(), "Hi there".to_string())]);
    }

    #[tokio::test]
    async fn rejected_event_gets_the_fixed_apology_and_the_loop_continues() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(event(1, None))),
                Ok(Some(event(2, Some("hello")))),
                Ok(None),
            ],
        ));

        let runner = PollingRunner::new(transport.clone(), handler(), no_backoff(0));
        runner.start().await.expect("runner should not fail");

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "tg-1");
        assert!(sent[0].1.contains("text"));
        assert_eq!(sent[1], ("tg-2".to_string(), "Hi there".to_string()));
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_string())),
                Err(TransportError::Connect("fail-2".to_string())),
                Err(TransportError::Connect("fail-3".to_string())),
            ],
            vec![],
        ));

        let runner = PollingRunner::new(transport.clone(), handler(), no_backoff(2));
        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }
}

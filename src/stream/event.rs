use std::sync::Arc;
use std::time::Duration;

use diatheke_types::v1::{self, diatheke_event};

use super::Inbound;
use crate::command::CommandStatus;
use crate::error::Result;
use crate::transport::{CallContext, LegacyTransport};

/// Something that happened in a legacy session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Recognize(v1::RecognizeEvent),
    Reply(v1::ReplyEvent),
    /// Must be answered with [`EventStream::command_finished`] (or
    /// `LegacyClient::command_finished`) or the dialogue stalls.
    Command(v1::CommandEvent),
}

/// Events of one legacy session, in the order the server sent them.
pub struct EventStream {
    session_id: String,
    inbound: Inbound<v1::DiathekeEvent>,
    transport: Arc<dyn LegacyTransport>,
    timeout: Option<Duration>,
}

impl EventStream {
    pub(crate) async fn open(
        transport: Arc<dyn LegacyTransport>,
        session_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let context = CallContext::new();
        let reader = transport
            .session_event_stream(v1::SessionId::new(session_id), context.clone())
            .await?;
        Ok(Self {
            session_id: session_id.to_string(),
            inbound: Inbound::new("event", reader, context),
            transport,
            timeout,
        })
    }

    /// Waits for the next event. `Ok(None)` means the session ended.
    pub async fn wait_for_event(&mut self) -> Result<Option<Event>> {
        loop {
            let Some(event) = self.inbound.recv().await? else {
                return Ok(None);
            };
            match event.result {
                Some(diatheke_event::Result::Recognize(e)) => return Ok(Some(Event::Recognize(e))),
                Some(diatheke_event::Result::Reply(e)) => return Ok(Some(Event::Reply(e))),
                Some(diatheke_event::Result::Command(e)) => return Ok(Some(Event::Command(e))),
                None => {
                    tracing::warn!("session {}: skipping event of unknown type", self.session_id);
                }
            }
        }
    }

    /// Reports a command result for this stream's session.
    pub async fn command_finished(&self, status: &CommandStatus) -> Result<()> {
        self.transport
            .command_finished(status.to_legacy(&self.session_id), self.timeout)
            .await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.inbound.close().await
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cancelling the context ends the stream from another task.
    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedReader;
    use crate::transport::MockLegacyTransport;
    use mockall::predicate::*;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use tonic::{Code, Status};

    fn wrap(result: Option<diatheke_event::Result>) -> v1::DiathekeEvent {
        v1::DiathekeEvent { result }
    }

    #[tokio::test]
    async fn test_events_in_order_and_unknown_skipped() {
        // Arrange
        let reader = ScriptedReader::new(vec![
            wrap(Some(diatheke_event::Result::Recognize(v1::RecognizeEvent {
                text: "turn on the lights".to_string(),
                valid_input: true,
            }))),
            wrap(None),
            wrap(Some(diatheke_event::Result::Reply(v1::ReplyEvent {
                text: "Okay".to_string(),
            }))),
        ]);
        let finishes = reader.finishes();
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_session_event_stream()
            .with(eq(v1::SessionId::new("s1")), always())
            .return_once(move |_, _| Ok(Box::new(reader)));

        // Act
        let mut stream = EventStream::open(Arc::new(transport), "s1", None).await.unwrap();

        // Assert
        assert!(matches!(stream.wait_for_event().await.unwrap(), Some(Event::Recognize(e)) if e.valid_input));
        assert!(matches!(stream.wait_for_event().await.unwrap(), Some(Event::Reply(e)) if e.text == "Okay"));
        assert_eq!(stream.wait_for_event().await.unwrap(), None);
        stream.close().await.unwrap();
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_stream_reports_status() {
        let reader = ScriptedReader::new(Vec::new()).with_status(Status::not_found("no such session"));
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_session_event_stream()
            .return_once(move |_, _| Ok(Box::new(reader)));

        let mut stream = EventStream::open(Arc::new(transport), "gone", None).await.unwrap();

        let err = stream.wait_for_event().await.unwrap_err();
        assert_eq!(err.code(), Some(Code::NotFound));
        assert_eq!(stream.wait_for_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_command_finished_uses_stream_session() {
        let command = v1::CommandEvent {
            command_id: "lights".to_string(),
            parameters: HashMap::new(),
            command_state_id: "state-1".to_string(),
        };
        let reader = ScriptedReader::new(vec![wrap(Some(diatheke_event::Result::Command(command)))]);
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_session_event_stream()
            .return_once(move |_, _| Ok(Box::new(reader)));
        transport
            .expect_command_finished()
            .withf(|status, _| status.session_id == "s9" && status.command_state_id == "state-1")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut stream = EventStream::open(Arc::new(transport), "s9", None).await.unwrap();
        let Some(Event::Command(event)) = stream.wait_for_event().await.unwrap() else {
            panic!("expected a command event");
        };

        stream.command_finished(&CommandStatus::from(&event)).await.unwrap();
    }
}

//! One interface over both session APIs.
//!
//! A [`Conversation`] hides whether the server is driven through session ids
//! and event streams or through tokens and per-turn actions. Actions are
//! produced in the order the server asked for them; callers feed text with
//! [`Conversation::push_text`] from one task and drain
//! [`Conversation::next_action`] from another.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use diatheke_types::v2::{self, action_data};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::client::config::Config;
use crate::client::{connect_legacy_with_config, connect_with_config, Client, LegacyClient};
use crate::command::CommandStatus;
use crate::error::{Error, Result};
use crate::stream::{Event, EventStream};
use crate::transport::CallContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Token based sessions.
    #[default]
    Token,
    /// Session ids with event streams.
    Legacy,
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "token" | "v2" => Ok(Self::Token),
            "legacy" | "v1" => Ok(Self::Legacy),
            other => Err(Error::Config(format!("unknown protocol: {}", other))),
        }
    }
}

/// Something the client has to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Wait for the user. Only the token API asks for this explicitly.
    WaitForInput {
        requires_wake_word: bool,
        immediate: bool,
    },
    /// Speech or text the server understood. Only the legacy API reports it.
    Recognized { text: String, valid: bool },
    Reply { text: String, luna_model: String },
    /// Run the command and report back through
    /// [`Conversation::command_finished`].
    Command(CommandStatus),
    Transcribe(v2::TranscribeAction),
}

#[async_trait]
pub trait Conversation: Send + Sync {
    async fn push_text(&self, text: &str) -> Result<()>;

    /// Waits for the next action. `Ok(None)` once the conversation ended.
    async fn next_action(&self) -> Result<Option<Action>>;

    async fn command_finished(&self, status: &CommandStatus) -> Result<()>;

    /// Ends the session on the server.
    async fn end(&self) -> Result<()>;
}

/// Opens a conversation using the protocol named in `config`.
pub async fn open(config: &Config, model_id: &str) -> Result<Box<dyn Conversation>> {
    match config.protocol() {
        Protocol::Token => {
            let client = connect_with_config(config).await?;
            Ok(Box::new(TokenConversation::start(client, model_id, "").await?))
        }
        Protocol::Legacy => {
            let client = connect_legacy_with_config(config).await?;
            Ok(Box::new(LegacyConversation::start(client, model_id).await?))
        }
    }
}

/// Conversation over the token API. Holds the current token and applies
/// every update under a lock, so concurrent callers never submit a stale
/// token.
pub struct TokenConversation {
    client: Client,
    token: Mutex<Option<v2::TokenData>>,
    tx: Mutex<Option<mpsc::UnboundedSender<Action>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Action>>,
}

impl TokenConversation {
    pub async fn start(client: Client, model_id: &str, wakeword: &str) -> Result<Self> {
        let output = client.create_session(model_id, wakeword).await?;
        let conversation = Self::new(client, None);
        {
            let mut token = conversation.token.lock().await;
            conversation.apply(&mut token, output).await?;
        }
        Ok(conversation)
    }

    /// Picks up a conversation from a token saved with
    /// [`TokenConversation::export_token`].
    pub fn resume(client: Client, token_json: &str) -> Result<Self> {
        let token: v2::TokenData = serde_json::from_str(token_json)?;
        tracing::debug!("resuming session {}", token.id);
        Ok(Self::new(client, Some(token)))
    }

    fn new(client: Client, token: Option<v2::TokenData>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            token: Mutex::new(token),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Current token as JSON.
    pub async fn export_token(&self) -> Result<String> {
        let token = self.token().await?;
        Ok(serde_json::to_string(&token)?)
    }

    pub async fn token(&self) -> Result<v2::TokenData> {
        self.token.lock().await.clone().ok_or(Error::Misuse("conversation already ended"))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Submits a recognition result from an ASR stream.
    pub async fn process_asr_result(&self, result: v2::AsrResult) -> Result<()> {
        let mut token = self.token.lock().await;
        let current = token.as_ref().ok_or(Error::Misuse("conversation already ended"))?;
        let output = self.client.process_asr_result(current, result).await?;
        self.apply(&mut token, output).await
    }

    async fn apply(&self, token: &mut Option<v2::TokenData>, output: v2::SessionOutput) -> Result<()> {
        let next = output
            .token
            .ok_or_else(|| Error::Protocol("session output without a token".to_string()))?;
        *token = Some(next);

        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Ok(());
        };
        for data in output.action_list {
            let action = match data.action {
                Some(action_data::Action::Input(input)) => Action::WaitForInput {
                    requires_wake_word: input.requires_wake_word,
                    immediate: input.immediate,
                },
                Some(action_data::Action::Command(command)) => {
                    Action::Command(CommandStatus::from(&command))
                }
                Some(action_data::Action::Reply(reply)) => Action::Reply {
                    text: reply.text,
                    luna_model: reply.luna_model,
                },
                Some(action_data::Action::Transcribe(transcribe)) => Action::Transcribe(transcribe),
                None => {
                    tracing::warn!("skipping action of unknown type");
                    continue;
                }
            };
            if tx.send(action).is_err() {
                tracing::debug!("conversation ended, dropping action");
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Conversation for TokenConversation {
    async fn push_text(&self, text: &str) -> Result<()> {
        let mut token = self.token.lock().await;
        let current = token.as_ref().ok_or(Error::Misuse("conversation already ended"))?;
        let output = self.client.process_text(current, text).await?;
        self.apply(&mut token, output).await
    }

    async fn next_action(&self) -> Result<Option<Action>> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn command_finished(&self, status: &CommandStatus) -> Result<()> {
        let mut token = self.token.lock().await;
        let current = token.as_ref().ok_or(Error::Misuse("conversation already ended"))?;
        let output = self.client.process_command_result(current, status).await?;
        self.apply(&mut token, output).await
    }

    async fn end(&self) -> Result<()> {
        let token = self.token.lock().await.take();
        self.tx.lock().await.take();
        match token {
            Some(token) => self.client.delete_session(&token).await,
            None => Ok(()),
        }
    }
}

/// Conversation over the session id API, driven by the session's event
/// stream.
pub struct LegacyConversation {
    client: LegacyClient,
    session_id: String,
    events: Mutex<EventStream>,
    context: CallContext,
    ended: AtomicBool,
}

impl LegacyConversation {
    pub async fn start(client: LegacyClient, model: &str) -> Result<Self> {
        let session_id = client.new_session(model).await?;
        let events = match client.session_event_stream(&session_id).await {
            Ok(events) => events,
            Err(e) => {
                if let Err(end) = client.end_session(&session_id).await {
                    tracing::warn!("failed to end session {}: {}", session_id, end);
                }
                return Err(e);
            }
        };
        Ok(Self {
            context: events.context().clone(),
            client,
            session_id,
            events: Mutex::new(events),
            ended: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn client(&self) -> &LegacyClient {
        &self.client
    }
}

#[async_trait]
impl Conversation for LegacyConversation {
    async fn push_text(&self, text: &str) -> Result<()> {
        self.client.push_text(&self.session_id, text).await
    }

    async fn next_action(&self) -> Result<Option<Action>> {
        let event = match self.events.lock().await.wait_for_event().await {
            Ok(event) => event,
            Err(_) if self.ended.load(Ordering::SeqCst) => None,
            Err(e) => return Err(e),
        };
        Ok(event.map(|event| match event {
            Event::Recognize(e) => Action::Recognized {
                text: e.text,
                valid: e.valid_input,
            },
            Event::Reply(e) => Action::Reply {
                text: e.text,
                luna_model: String::new(),
            },
            Event::Command(e) => Action::Command(CommandStatus::from(&e)),
        }))
    }

    async fn command_finished(&self, status: &CommandStatus) -> Result<()> {
        self.client.command_finished(&self.session_id, status).await
    }

    async fn end(&self) -> Result<()> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.client.end_session(&self.session_id).await;
        // Wakes up a pending next_action.
        self.context.cancel();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::StatusCode;
    use crate::testing::ScriptedReader;
    use crate::transport::{MockLegacyTransport, MockTransport};
    use diatheke_types::v1;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn output(id: u8, actions: Vec<action_data::Action>) -> v2::SessionOutput {
        v2::SessionOutput {
            token: Some(v2::TokenData {
                data: vec![id],
                id: "session".to_string(),
                metadata: String::new(),
            }),
            action_list: actions
                .into_iter()
                .map(|action| v2::ActionData { action: Some(action) })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_actions_for_closed_receiver_are_dropped() {
        let mut transport = MockTransport::new();
        transport
            .expect_create_session()
            .return_once(|_, _| Ok(output(0, vec![])));
        transport.expect_update_session().times(1).returning(|_, _| {
            Ok(output(
                1,
                vec![
                    action_data::Action::Reply(v2::ReplyAction::new("One", "")),
                    action_data::Action::Reply(v2::ReplyAction::new("Two", "")),
                ],
            ))
        });
        let conversation = TokenConversation::start(Client::new(Arc::new(transport)), "1", "")
            .await
            .unwrap();
        conversation.rx.lock().await.close();

        conversation.push_text("hello").await.unwrap();

        assert_eq!(conversation.token().await.unwrap().data, vec![1]);
        assert!(conversation.rx.lock().await.try_recv().is_err());
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!("token".parse::<Protocol>().unwrap(), Protocol::Token);
        assert_eq!("V1".parse::<Protocol>().unwrap(), Protocol::Legacy);
        assert!(matches!("v3".parse::<Protocol>(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_token_conversation_tracks_latest_token() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_create_session().return_once(|_, _| {
            Ok(output(0, vec![action_data::Action::Input(v2::WaitForUserAction::default())]))
        });
        transport
            .expect_update_session()
            .withf(|request, _| request.token.as_ref().map(|t| t.data.clone()) == Some(vec![0]))
            .times(1)
            .returning(|_, _| {
                Ok(output(
                    1,
                    vec![
                        action_data::Action::Command(v2::CommandAction {
                            id: "lights".to_string(),
                            input_parameters: HashMap::new(),
                        }),
                    ],
                ))
            });
        transport
            .expect_update_session()
            .withf(|request, _| request.token.as_ref().map(|t| t.data.clone()) == Some(vec![1]))
            .times(1)
            .returning(|_, _| {
                Ok(output(2, vec![action_data::Action::Reply(v2::ReplyAction::new("Done", ""))]))
            });
        transport
            .expect_delete_session()
            .withf(|token, _| token.data == vec![2])
            .times(1)
            .returning(|_, _| Ok(()));
        let client = Client::new(Arc::new(transport));

        // Act
        let conversation = TokenConversation::start(client, "1", "").await.unwrap();
        assert!(matches!(conversation.next_action().await.unwrap(), Some(Action::WaitForInput { .. })));
        conversation.push_text("lights on").await.unwrap();
        let Some(Action::Command(mut status)) = conversation.next_action().await.unwrap() else {
            panic!("expected a command");
        };
        status.set_status_code(StatusCode::Success);
        conversation.command_finished(&status).await.unwrap();

        // Assert
        assert_eq!(
            conversation.next_action().await.unwrap(),
            Some(Action::Reply {
                text: "Done".to_string(),
                luna_model: String::new()
            })
        );
        conversation.end().await.unwrap();
        assert_eq!(conversation.next_action().await.unwrap(), None);
        assert!(matches!(conversation.push_text("again").await, Err(Error::Misuse(_))));
    }

    #[tokio::test]
    async fn test_token_export_and_resume() {
        let mut transport = MockTransport::new();
        transport
            .expect_create_session()
            .return_once(|_, _| Ok(output(5, Vec::new())));
        let client = Client::new(Arc::new(transport));
        let conversation = TokenConversation::start(client.clone(), "1", "").await.unwrap();

        let saved = conversation.export_token().await.unwrap();
        let resumed = TokenConversation::resume(client, &saved).unwrap();

        assert_eq!(resumed.token().await.unwrap().data, vec![5]);
        assert!(matches!(
            TokenConversation::resume(resumed.client().clone(), "not json"),
            Err(Error::Token(_))
        ));
    }

    #[tokio::test]
    async fn test_legacy_conversation_maps_events() {
        let reader = ScriptedReader::new(vec![
            v1::DiathekeEvent {
                result: Some(v1::diatheke_event::Result::Recognize(v1::RecognizeEvent {
                    text: "hello".to_string(),
                    valid_input: true,
                })),
            },
            v1::DiathekeEvent {
                result: Some(v1::diatheke_event::Result::Command(v1::CommandEvent {
                    command_id: "lights".to_string(),
                    parameters: HashMap::new(),
                    command_state_id: "st".to_string(),
                })),
            },
        ])
        .pending();
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_new_session()
            .return_once(|_, _| Ok(v1::SessionId::new("abc")));
        transport
            .expect_session_event_stream()
            .return_once(move |_, _| Ok(Box::new(reader)));
        transport
            .expect_command_finished()
            .withf(|status, _| status.session_id == "abc" && status.command_state_id == "st")
            .times(1)
            .returning(|_, _| Ok(()));
        transport.expect_end_session().times(1).returning(|_, _| Ok(()));
        let conversation = Arc::new(
            LegacyConversation::start(LegacyClient::new(Arc::new(transport)), "1")
                .await
                .unwrap(),
        );

        assert_eq!(
            conversation.next_action().await.unwrap(),
            Some(Action::Recognized {
                text: "hello".to_string(),
                valid: true
            })
        );
        let Some(Action::Command(status)) = conversation.next_action().await.unwrap() else {
            panic!("expected a command");
        };
        conversation.command_finished(&status).await.unwrap();

        let waiting = tokio::spawn({
            let conversation = conversation.clone();
            async move { conversation.next_action().await }
        });
        conversation.end().await.unwrap();
        assert_eq!(waiting.await.unwrap().unwrap(), None);
        conversation.end().await.unwrap();
    }
}

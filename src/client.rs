use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use diatheke_types::v2::{self, session_input};

use crate::command::CommandStatus;
use crate::stream::{AsrStream, TranscribeStream, TtsStream};
use crate::transport::{GrpcTransport, Transport};
use crate::Result;

pub mod config;
pub(crate) mod consts;
mod legacy;

pub use legacy::LegacyClient;

pub(crate) fn timeout_from_ms(timeout_ms: u64) -> Option<Duration> {
    match timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

/// Client for the token based API.
///
/// Every call that changes a session returns a [`v2::SessionOutput`] whose
/// token replaces the one passed in. The client does not track tokens;
/// callers that share a session across tasks must serialize its updates
/// themselves (or use a [`TokenConversation`](crate::TokenConversation)).
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: timeout_from_ms(consts::DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    /// Timeout for unary calls; zero waits forever. Streams never time out.
    pub fn set_request_timeout(&mut self, timeout_ms: u64) {
        self.timeout = timeout_from_ms(timeout_ms);
    }

    pub async fn version(&self) -> Result<v2::VersionResponse> {
        Ok(self.transport.version(self.timeout).await?)
    }

    pub async fn list_models(&self) -> Result<Vec<v2::ModelInfo>> {
        Ok(self.transport.list_models(self.timeout).await?.models)
    }

    /// Starts a session. An empty `wakeword` keeps the model default.
    pub async fn create_session(&self, model_id: &str, wakeword: &str) -> Result<v2::SessionOutput> {
        let request = v2::SessionStart {
            model_id: model_id.to_string(),
            wakeword: wakeword.to_string(),
        };
        let output = self.transport.create_session(request, self.timeout).await?;
        tracing::debug!("created session for model {}", model_id);
        Ok(output)
    }

    pub async fn delete_session(&self, token: &v2::TokenData) -> Result<()> {
        self.transport.delete_session(token.clone(), self.timeout).await?;
        tracing::debug!("deleted session {}", token.id);
        Ok(())
    }

    pub async fn process_text(&self, token: &v2::TokenData, text: &str) -> Result<v2::SessionOutput> {
        let input = session_input::Input::Text(v2::TextInput {
            text: text.to_string(),
        });
        self.update(token, input).await
    }

    pub async fn process_asr_result(
        &self,
        token: &v2::TokenData,
        result: v2::AsrResult,
    ) -> Result<v2::SessionOutput> {
        self.update(token, session_input::Input::Asr(result)).await
    }

    pub async fn process_command_result(
        &self,
        token: &v2::TokenData,
        status: &CommandStatus,
    ) -> Result<v2::SessionOutput> {
        self.update(token, session_input::Input::Cmd(status.to_result()))
            .await
    }

    /// Moves the session to another story.
    pub async fn set_story(
        &self,
        token: &v2::TokenData,
        story_id: &str,
        parameters: HashMap<String, String>,
    ) -> Result<v2::SessionOutput> {
        let story = v2::SetStory {
            story_id: story_id.to_string(),
            parameters,
        };
        self.update(token, session_input::Input::Story(story)).await
    }

    async fn update(
        &self,
        token: &v2::TokenData,
        input: session_input::Input,
    ) -> Result<v2::SessionOutput> {
        let request = v2::SessionInput {
            token: Some(token.clone()),
            input: Some(input),
        };
        Ok(self.transport.update_session(request, self.timeout).await?)
    }

    /// ASR stream for a session; the token is sent before anything else.
    /// The result should go back to the session with
    /// [`Client::process_asr_result`].
    pub async fn new_session_asr_stream(&self, token: &v2::TokenData) -> Result<AsrStream> {
        let stream = self.new_asr_stream().await?;
        if !stream.send_token(token.clone()).await? {
            tracing::debug!("asr stream closed before the session token was sent");
        }
        Ok(stream)
    }

    /// ASR stream with nothing sent yet.
    pub async fn new_asr_stream(&self) -> Result<AsrStream> {
        AsrStream::open(self.transport.as_ref()).await
    }

    pub async fn new_tts_stream(&self, reply: &v2::ReplyAction) -> Result<TtsStream> {
        TtsStream::open(self.transport.as_ref(), reply.clone()).await
    }

    /// Transcribe stream configured by `action`.
    pub async fn new_transcribe_stream(&self, action: &v2::TranscribeAction) -> Result<TranscribeStream> {
        let mut stream = TranscribeStream::open(self.transport.as_ref()).await?;
        if !stream.send_action(action.clone()).await? {
            tracing::debug!("transcribe stream closed before the action was sent");
        }
        Ok(stream)
    }
}

/// Connects with settings from the environment.
pub async fn connect() -> Result<Client> {
    connect_with_config(&config::Config::new()).await
}

pub async fn connect_with_config(config: &config::Config) -> Result<Client> {
    let transport = GrpcTransport::connect(config).await?;
    let mut client = Client::new(Arc::new(transport));
    client.set_request_timeout(config.request_timeout_ms());
    Ok(client)
}

pub async fn connect_legacy_with_config(config: &config::Config) -> Result<LegacyClient> {
    let transport = GrpcTransport::connect(config).await?;
    let mut client = LegacyClient::new(Arc::new(transport));
    client.set_request_timeout(config.request_timeout_ms());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingWriter, ScriptedReader};
    use crate::transport::{Duplex, MockTransport};
    use diatheke_types::v2::action_data::Action;
    use diatheke_types::v2::asr_input::Data;
    use mockall::predicate::*;
    use tonic::{Code, Status};

    fn token(id: &str, data: u8) -> v2::TokenData {
        v2::TokenData {
            data: vec![data],
            id: id.to_string(),
            metadata: String::new(),
        }
    }

    fn output(token: v2::TokenData, action: Action) -> v2::SessionOutput {
        v2::SessionOutput {
            token: Some(token),
            action_list: vec![v2::ActionData { action: Some(action) }],
        }
    }

    #[tokio::test]
    async fn test_session_round_trip_replaces_token() {
        // Arrange
        let t0 = token("s", 0);
        let t1 = token("s", 1);
        let mut transport = MockTransport::new();
        let first = output(t0.clone(), Action::Input(v2::WaitForUserAction::default()));
        transport
            .expect_create_session()
            .withf(|request, _| request.model_id == "model-A" && request.wakeword.is_empty())
            .return_once(move |_, _| Ok(first));
        let second = output(t1.clone(), Action::Reply(v2::ReplyAction::new("Hi there", "")));
        let expected = t0.clone();
        transport
            .expect_update_session()
            .withf(move |request, _| {
                request.token.as_ref() == Some(&expected)
                    && matches!(&request.input, Some(session_input::Input::Text(t)) if t.text == "hello")
            })
            .return_once(move |_, _| Ok(second));
        transport
            .expect_delete_session()
            .with(eq(t1.clone()), always())
            .times(1)
            .returning(|_, _| Ok(()));
        transport
            .expect_delete_session()
            .returning(|_, _| Err(Status::not_found("session deleted")));
        let client = Client::new(Arc::new(transport));

        // Act
        let created = client.create_session("model-A", "").await.unwrap();
        let session = created.token.unwrap();
        let updated = client.process_text(&session, "hello").await.unwrap();
        let next = updated.token.unwrap();

        // Assert
        assert_ne!(session, next);
        client.delete_session(&next).await.unwrap();
        let err = client.delete_session(&next).await.unwrap_err();
        assert_eq!(err.code(), Some(Code::NotFound));
    }

    #[tokio::test]
    async fn test_timeout_is_passed_to_unary_calls() {
        let mut transport = MockTransport::new();
        transport
            .expect_version()
            .with(eq(Some(Duration::from_millis(1500))))
            .times(1)
            .returning(|_| Ok(v2::VersionResponse::default()));
        transport
            .expect_version()
            .with(eq(None))
            .times(1)
            .returning(|_| Ok(v2::VersionResponse::default()));
        let mut client = Client::new(Arc::new(transport));

        client.set_request_timeout(1500);
        client.version().await.unwrap();
        client.set_request_timeout(0);
        client.version().await.unwrap();
    }

    #[tokio::test]
    async fn test_command_result_goes_through_update_session() {
        let mut transport = MockTransport::new();
        transport
            .expect_update_session()
            .withf(|request, _| {
                matches!(&request.input,
                    Some(session_input::Input::Cmd(result)) if result.id == "lights" && result.error.is_empty()
                        && result.out_parameters.get("level").map(String::as_str) == Some("3"))
            })
            .return_once(|_, _| Ok(v2::SessionOutput::default()));
        let client = Client::new(Arc::new(transport));
        let mut status = CommandStatus::from(&v2::CommandAction {
            id: "lights".to_string(),
            input_parameters: HashMap::new(),
        });
        status.set_status_code(crate::StatusCode::Success);
        status.set_int_param("level", 3);

        client.process_command_result(&token("s", 0), &status).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_asr_stream_sends_token_first() {
        let writer = RecordingWriter::new();
        let log = writer.log();
        let reader = ScriptedReader::new(vec![v2::AsrResult::default()]);
        let mut transport = MockTransport::new();
        transport.expect_stream_asr().return_once(move |_| {
            Ok(Duplex {
                writer: Box::new(writer),
                reader: Box::new(reader),
            })
        });
        let client = Client::new(Arc::new(transport));

        let stream = client.new_session_asr_stream(&token("s", 4)).await.unwrap();
        stream.send_audio(&[1, 2]).await.unwrap();
        stream.result().await.unwrap();

        let writes = log.writes();
        assert!(matches!(&writes[0].data, Some(Data::Token(t)) if t.data == vec![4]));
        assert!(matches!(&writes[1].data, Some(Data::Audio(a)) if a == &vec![1, 2]));
    }

    #[tokio::test]
    async fn test_unary_failure_maps_to_transport_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_list_models()
            .returning(|_| Err(Status::unauthenticated("bad credentials")));
        let client = Client::new(Arc::new(transport));

        let err = client.list_models().await.unwrap_err();

        assert_eq!(err.code(), Some(Code::Unauthenticated));
    }
}

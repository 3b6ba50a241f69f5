use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diatheke_types::v1;

use super::{consts, timeout_from_ms};
use crate::command::CommandStatus;
use crate::stream::{AudioInputStream, AudioReplyStream, EventStream, InputGuard, LegacyAsrStream, LegacyTtsStream};
use crate::transport::LegacyTransport;
use crate::Result;

/// Client for the session id based API.
///
/// Session output is not returned from the unary calls; it arrives on the
/// session's event and audio reply streams.
#[derive(Clone)]
pub struct LegacyClient {
    transport: Arc<dyn LegacyTransport>,
    timeout: Option<Duration>,
    audio_inputs: Arc<Mutex<HashSet<String>>>,
}

impl LegacyClient {
    pub fn new(transport: Arc<dyn LegacyTransport>) -> Self {
        Self {
            transport,
            timeout: timeout_from_ms(consts::DEFAULT_REQUEST_TIMEOUT_MS),
            audio_inputs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn set_request_timeout(&mut self, timeout_ms: u64) {
        self.timeout = timeout_from_ms(timeout_ms);
    }

    pub async fn version(&self) -> Result<String> {
        Ok(self.transport.version(self.timeout).await?.server)
    }

    pub async fn models(&self) -> Result<Vec<String>> {
        Ok(self.transport.models(self.timeout).await?.models)
    }

    /// Starts a session and returns its id.
    pub async fn new_session(&self, model: &str) -> Result<String> {
        let request = v1::NewSessionRequest {
            model: model.to_string(),
        };
        let session = self.transport.new_session(request, self.timeout).await?;
        tracing::debug!("started session {} with model {}", session.session_id, model);
        Ok(session.session_id)
    }

    /// Ends the session. Its streams end with it.
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        self.transport
            .end_session(v1::SessionId::new(session_id), self.timeout)
            .await?;
        tracing::debug!("ended session {}", session_id);
        Ok(())
    }

    pub async fn push_text(&self, session_id: &str, text: &str) -> Result<()> {
        let request = v1::PushTextRequest {
            session_id: session_id.to_string(),
            text: text.to_string(),
        };
        Ok(self.transport.push_text(request, self.timeout).await?)
    }

    pub async fn command_finished(&self, session_id: &str, status: &CommandStatus) -> Result<()> {
        Ok(self
            .transport
            .command_finished(status.to_legacy(session_id), self.timeout)
            .await?)
    }

    pub async fn session_event_stream(&self, session_id: &str) -> Result<EventStream> {
        EventStream::open(self.transport.clone(), session_id, self.timeout).await
    }

    /// Opens the audio input of a session. Only one may be open per session
    /// at a time; the slot frees up when the stream is dropped.
    pub async fn stream_audio_input(&self, session_id: &str) -> Result<AudioInputStream> {
        let guard = InputGuard::acquire(self.audio_inputs.clone(), session_id)?;
        AudioInputStream::open(self.transport.as_ref(), session_id, guard).await
    }

    pub async fn stream_audio_replies(&self, session_id: &str) -> Result<AudioReplyStream> {
        AudioReplyStream::open(self.transport.as_ref(), session_id).await
    }

    /// Recognition with the given ASR model, outside of any session.
    pub async fn stream_asr(&self, model: &str) -> Result<LegacyAsrStream> {
        LegacyAsrStream::open(self.transport.as_ref(), model).await
    }

    /// Synthesizes `text` with the given TTS model, outside of any session.
    pub async fn stream_tts(&self, model: &str, text: &str) -> Result<LegacyTtsStream> {
        LegacyTtsStream::open(self.transport.as_ref(), model, text).await
    }
}

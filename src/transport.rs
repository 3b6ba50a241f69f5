//! The transport stub the session layer is built on.
//!
//! Each RPC is a method on [`Transport`] (token API) or [`LegacyTransport`]
//! (session id API). Unary calls return the response directly and carry an
//! optional per-call timeout. Streaming calls return readers and writers
//! modelled after the usual gRPC shape: `write` / `writes_done` on the send
//! side, `read` / `finish` on the receive side. Streams never time out; they
//! end when the server ends them or when their [`CallContext`] is cancelled.

use std::time::Duration;

use async_trait::async_trait;
use diatheke_types::{v1, v2};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tonic::Status;

pub mod grpc;

pub use grpc::GrpcTransport;

/// Receive side of a streaming call.
#[async_trait]
pub trait MessageReader<T>: Send {
    /// Waits for the next message. `None` means the stream is over and
    /// [`MessageReader::finish`] holds the reason.
    async fn read(&mut self) -> Option<T>;

    /// Returns the terminal status of the call. Called exactly once, after
    /// `read` returned `None` or when the caller abandons the stream.
    async fn finish(&mut self) -> Status;
}

/// Send side of a streaming call.
#[async_trait]
pub trait MessageWriter<T>: Send {
    /// Returns false once the server no longer accepts messages.
    async fn write(&mut self, message: T) -> bool;

    /// Half-closes the send direction.
    async fn writes_done(&mut self) -> bool;
}

pub type Reader<T> = Box<dyn MessageReader<T>>;
pub type Writer<T> = Box<dyn MessageWriter<T>>;

/// Both halves of a client-streaming or bidirectional call. For client
/// streaming calls the reader yields the single response.
pub struct Duplex<Req, Resp> {
    pub writer: Writer<Req>,
    pub reader: Reader<Resp>,
}

/// Cancellation handle owned by one streaming call.
///
/// Clones share the same cancellation state, so a clone can be handed to
/// another task to tear the stream down.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// RPCs of the token based API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn version(&self, timeout: Option<Duration>) -> Result<v2::VersionResponse, Status>;

    async fn list_models(&self, timeout: Option<Duration>)
        -> Result<v2::ListModelsResponse, Status>;

    async fn create_session(
        &self,
        request: v2::SessionStart,
        timeout: Option<Duration>,
    ) -> Result<v2::SessionOutput, Status>;

    async fn delete_session(
        &self,
        token: v2::TokenData,
        timeout: Option<Duration>,
    ) -> Result<(), Status>;

    async fn update_session(
        &self,
        request: v2::SessionInput,
        timeout: Option<Duration>,
    ) -> Result<v2::SessionOutput, Status>;

    async fn stream_asr(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v2::AsrInput, v2::AsrResult>, Status>;

    async fn stream_tts(
        &self,
        reply: v2::ReplyAction,
        context: CallContext,
    ) -> Result<Reader<v2::TtsAudio>, Status>;

    async fn transcribe(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v2::TranscribeInput, v2::TranscribeResult>, Status>;
}

/// RPCs of the session id based API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LegacyTransport: Send + Sync {
    async fn version(&self, timeout: Option<Duration>) -> Result<v1::VersionResponse, Status>;

    async fn models(&self, timeout: Option<Duration>) -> Result<v1::ModelsResponse, Status>;

    async fn new_session(
        &self,
        request: v1::NewSessionRequest,
        timeout: Option<Duration>,
    ) -> Result<v1::SessionId, Status>;

    async fn end_session(
        &self,
        session: v1::SessionId,
        timeout: Option<Duration>,
    ) -> Result<(), Status>;

    async fn push_text(
        &self,
        request: v1::PushTextRequest,
        timeout: Option<Duration>,
    ) -> Result<(), Status>;

    async fn command_finished(
        &self,
        status: v1::CommandStatus,
        timeout: Option<Duration>,
    ) -> Result<(), Status>;

    async fn session_event_stream(
        &self,
        session: v1::SessionId,
        context: CallContext,
    ) -> Result<Reader<v1::DiathekeEvent>, Status>;

    async fn stream_audio_input(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v1::AudioInput, v1::Empty>, Status>;

    async fn stream_audio_replies(
        &self,
        session: v1::SessionId,
        context: CallContext,
    ) -> Result<Reader<v1::AudioReply>, Status>;

    /// Recognition outside of any session.
    async fn stream_asr(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v1::AsrRequest, v1::AsrResponse>, Status>;

    /// Synthesis outside of any session.
    async fn stream_tts(
        &self,
        request: v1::TtsRequest,
        context: CallContext,
    ) -> Result<Reader<v1::TtsResponse>, Status>;
}

//! gRPC implementation of the transport traits on top of a tonic [`Channel`].
//!
//! Streaming calls are started on a background task so the caller gets its
//! writer immediately. Servers commonly hold back response headers until the
//! first response (or, for client streaming calls, until the very end), so
//! awaiting the call inline would deadlock before the first write.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use diatheke_types::{v1, v2, SERVICE_NAME};
use futures::channel::mpsc;
use futures_util::SinkExt;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tonic::client::Grpc;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::{Request, Status};

use super::{CallContext, Duplex, LegacyTransport, MessageReader, MessageWriter, Reader, Transport};
use crate::client::config::Config;
use crate::client::consts::STREAM_BUFFER;
use crate::Result;

#[derive(Clone)]
pub struct GrpcTransport {
    grpc: Grpc<Channel>,
}

impl GrpcTransport {
    /// Dials the server described by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let channel = build_endpoint(config)?.connect().await?;
        tracing::info!("connected to diatheke server at {}", config.address());
        Ok(Self::from_channel(channel))
    }

    /// Wraps an existing channel, e.g. one shared with other services.
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            grpc: Grpc::new(channel),
        }
    }

    async fn ready(&self) -> Result<Grpc<Channel>, Status> {
        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service not ready: {}", e)))?;
        Ok(grpc)
    }

    async fn unary<Req, Resp>(
        &self,
        method: &str,
        message: Req,
        timeout: Option<Duration>,
    ) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let mut request = Request::new(message);
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }
        tracing::debug!("unary call {}", method);
        let response = grpc
            .unary(request, path(method)?, ProstCodec::<Req, Resp>::default())
            .await?;
        Ok(response.into_inner())
    }

    async fn server_streaming<Req, Resp>(
        &self,
        method: &str,
        message: Req,
        context: CallContext,
    ) -> Result<Reader<Resp>, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let path = path(method)?;
        tracing::debug!("server streaming call {}", method);
        let call = spawn_call(context, async move {
            grpc.server_streaming(Request::new(message), path, ProstCodec::<Req, Resp>::default())
                .await
                .map(|response| response.into_inner())
        });
        Ok(Box::new(StreamReader::new(call)))
    }

    async fn client_streaming<Req, Resp>(
        &self,
        method: &str,
        context: CallContext,
    ) -> Result<Duplex<Req, Resp>, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let path = path(method)?;
        let (tx, rx) = mpsc::channel::<Req>(STREAM_BUFFER);
        tracing::debug!("client streaming call {}", method);
        let call = spawn_call(context, async move {
            grpc.client_streaming(Request::new(rx), path, ProstCodec::<Req, Resp>::default())
                .await
                .map(|response| response.into_inner())
        });
        Ok(Duplex {
            writer: Box::new(ChannelWriter { tx: Some(tx) }),
            reader: Box::new(SingleReader {
                call: Some(call),
                status: None,
            }),
        })
    }

    async fn bidi_streaming<Req, Resp>(
        &self,
        method: &str,
        context: CallContext,
    ) -> Result<Duplex<Req, Resp>, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let path = path(method)?;
        let (tx, rx) = mpsc::channel::<Req>(STREAM_BUFFER);
        tracing::debug!("bidirectional call {}", method);
        let call = spawn_call(context, async move {
            grpc.streaming(Request::new(rx), path, ProstCodec::<Req, Resp>::default())
                .await
                .map(|response| response.into_inner())
        });
        Ok(Duplex {
            writer: Box::new(ChannelWriter { tx: Some(tx) }),
            reader: Box::new(StreamReader::new(call)),
        })
    }
}

fn build_endpoint(config: &Config) -> Result<Endpoint> {
    let scheme = if config.insecure() { "http" } else { "https" };
    let uri = if config.address().contains("://") {
        config.address().to_string()
    } else {
        format!("{}://{}", scheme, config.address())
    };
    let mut endpoint = Endpoint::from_shared(uri)?;

    if !config.insecure() {
        let mut tls = ClientTlsConfig::new();
        if let Some(ca) = config.server_cert() {
            tls = tls.ca_certificate(Certificate::from_pem(ca));
        }
        if let Some((cert, key)) = config.client_cert() {
            tls = tls.identity(Identity::from_pem(cert, key.expose_secret().as_bytes()));
        }
        endpoint = endpoint.tls_config(tls)?;
    }

    Ok(endpoint)
}

/// Runs a call on its own task. Cancelling `context` drops the call, which
/// resets it on the server side.
fn spawn_call<T, F>(context: CallContext, call: F) -> JoinHandle<Result<T, Status>>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Status>> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = context.cancelled() => Err(Status::cancelled("call cancelled by the client")),
            result = call => result,
        }
    })
}

fn path(method: &str) -> Result<PathAndQuery, Status> {
    format!("/{}/{}", SERVICE_NAME, method)
        .parse()
        .map_err(|_| Status::internal(format!("invalid method name: {}", method)))
}

struct ChannelWriter<T> {
    tx: Option<mpsc::Sender<T>>,
}

#[async_trait]
impl<T: Send + 'static> MessageWriter<T> for ChannelWriter<T> {
    async fn write(&mut self, message: T) -> bool {
        match self.tx.as_mut() {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }

    async fn writes_done(&mut self) -> bool {
        // Dropping the sender ends the request stream.
        self.tx.take().is_some()
    }
}

/// Reader for calls with a streamed response.
struct StreamReader<T> {
    call: Option<JoinHandle<Result<Streaming<T>, Status>>>,
    stream: Option<Streaming<T>>,
    status: Option<Status>,
}

impl<T> StreamReader<T> {
    fn new(call: JoinHandle<Result<Streaming<T>, Status>>) -> Self {
        Self {
            call: Some(call),
            stream: None,
            status: None,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageReader<T> for StreamReader<T> {
    async fn read(&mut self) -> Option<T> {
        // The handle stays in place while awaited so `finish` can abort it
        // if this read is dropped.
        if let Some(call) = self.call.as_mut() {
            let started = call.await;
            self.call = None;
            match started {
                Ok(Ok(stream)) => self.stream = Some(stream),
                Ok(Err(status)) => self.status = Some(status),
                Err(e) => self.status = Some(Status::unknown(format!("call task failed: {}", e))),
            }
        }

        let stream = self.stream.as_mut()?;
        match stream.message().await {
            Ok(Some(message)) => Some(message),
            Ok(None) => {
                self.stream = None;
                self.status = Some(Status::new(tonic::Code::Ok, ""));
                None
            }
            Err(status) => {
                self.stream = None;
                self.status = Some(status);
                None
            }
        }
    }

    async fn finish(&mut self) -> Status {
        if let Some(call) = self.call.take() {
            call.abort();
        }
        // Dropping an unfinished stream resets it on the server side.
        if self.stream.take().is_some() {
            return Status::cancelled("stream closed before the server ended it");
        }
        self.status
            .take()
            .unwrap_or_else(|| Status::cancelled("stream closed before the server ended it"))
    }
}

/// Reader for client streaming calls, which produce a single response.
struct SingleReader<T> {
    call: Option<JoinHandle<Result<T, Status>>>,
    status: Option<Status>,
}

#[async_trait]
impl<T: Send + 'static> MessageReader<T> for SingleReader<T> {
    async fn read(&mut self) -> Option<T> {
        let call = self.call.as_mut()?;
        let response = call.await;
        self.call = None;
        match response {
            Ok(Ok(message)) => {
                self.status = Some(Status::new(tonic::Code::Ok, ""));
                Some(message)
            }
            Ok(Err(status)) => {
                self.status = Some(status);
                None
            }
            Err(e) => {
                self.status = Some(Status::unknown(format!("call task failed: {}", e)));
                None
            }
        }
    }

    async fn finish(&mut self) -> Status {
        if let Some(call) = self.call.take() {
            call.abort();
            return Status::cancelled("stream closed before the server responded");
        }
        self.status
            .take()
            .unwrap_or_else(|| Status::new(tonic::Code::Ok, ""))
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn version(&self, timeout: Option<Duration>) -> Result<v2::VersionResponse, Status> {
        self.unary("Version", v2::Empty {}, timeout).await
    }

    async fn list_models(
        &self,
        timeout: Option<Duration>,
    ) -> Result<v2::ListModelsResponse, Status> {
        self.unary("ListModels", v2::Empty {}, timeout).await
    }

    async fn create_session(
        &self,
        request: v2::SessionStart,
        timeout: Option<Duration>,
    ) -> Result<v2::SessionOutput, Status> {
        self.unary("CreateSession", request, timeout).await
    }

    async fn delete_session(
        &self,
        token: v2::TokenData,
        timeout: Option<Duration>,
    ) -> Result<(), Status> {
        self.unary::<_, v2::Empty>("DeleteSession", token, timeout)
            .await
            .map(|_| ())
    }

    async fn update_session(
        &self,
        request: v2::SessionInput,
        timeout: Option<Duration>,
    ) -> Result<v2::SessionOutput, Status> {
        self.unary("UpdateSession", request, timeout).await
    }

    async fn stream_asr(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v2::AsrInput, v2::AsrResult>, Status> {
        self.client_streaming("StreamASR", context).await
    }

    async fn stream_tts(
        &self,
        reply: v2::ReplyAction,
        context: CallContext,
    ) -> Result<Reader<v2::TtsAudio>, Status> {
        self.server_streaming("StreamTTS", reply, context).await
    }

    async fn transcribe(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v2::TranscribeInput, v2::TranscribeResult>, Status> {
        self.bidi_streaming("Transcribe", context).await
    }
}

#[async_trait]
impl LegacyTransport for GrpcTransport {
    async fn version(&self, timeout: Option<Duration>) -> Result<v1::VersionResponse, Status> {
        self.unary("Version", v1::Empty {}, timeout).await
    }

    async fn models(&self, timeout: Option<Duration>) -> Result<v1::ModelsResponse, Status> {
        self.unary("Models", v1::Empty {}, timeout).await
    }

    async fn new_session(
        &self,
        request: v1::NewSessionRequest,
        timeout: Option<Duration>,
    ) -> Result<v1::SessionId, Status> {
        self.unary("NewSession", request, timeout).await
    }

    async fn end_session(
        &self,
        session: v1::SessionId,
        timeout: Option<Duration>,
    ) -> Result<(), Status> {
        self.unary::<_, v1::Empty>("EndSession", session, timeout)
            .await
            .map(|_| ())
    }

    async fn push_text(
        &self,
        request: v1::PushTextRequest,
        timeout: Option<Duration>,
    ) -> Result<(), Status> {
        self.unary::<_, v1::Empty>("PushText", request, timeout)
            .await
            .map(|_| ())
    }

    async fn command_finished(
        &self,
        status: v1::CommandStatus,
        timeout: Option<Duration>,
    ) -> Result<(), Status> {
        self.unary::<_, v1::Empty>("CommandFinished", status, timeout)
            .await
            .map(|_| ())
    }

    async fn session_event_stream(
        &self,
        session: v1::SessionId,
        context: CallContext,
    ) -> Result<Reader<v1::DiathekeEvent>, Status> {
        self.server_streaming("SessionEventStream", session, context).await
    }

    async fn stream_audio_input(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v1::AudioInput, v1::Empty>, Status> {
        self.client_streaming("StreamAudioInput", context).await
    }

    async fn stream_audio_replies(
        &self,
        session: v1::SessionId,
        context: CallContext,
    ) -> Result<Reader<v1::AudioReply>, Status> {
        self.server_streaming("StreamAudioReplies", session, context).await
    }

    async fn stream_asr(
        &self,
        context: CallContext,
    ) -> Result<Duplex<v1::AsrRequest, v1::AsrResponse>, Status> {
        self.bidi_streaming("StreamASR", context).await
    }

    async fn stream_tts(
        &self,
        request: v1::TtsRequest,
        context: CallContext,
    ) -> Result<Reader<v1::TtsResponse>, Status> {
        self.server_streaming("StreamTTS", request, context).await
    }
}

use diatheke_types::v2;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{Inbound, Outbound};
use crate::error::{Error, Result};
use crate::transport::{CallContext, Transport};

/// Streaming recognition of a single utterance.
///
/// A background task waits for the terminal result from the moment the
/// stream opens, so [`AsrStream::result`] may be awaited on a different task
/// than the one feeding audio. All methods take `&self`; share the stream
/// through an `Arc` to do that.
pub struct AsrStream {
    outbound: Mutex<Outbound<v2::AsrInput>>,
    result: Mutex<Option<JoinHandle<Result<v2::AsrResult>>>>,
    context: CallContext,
}

impl AsrStream {
    pub(crate) async fn open(transport: &dyn Transport) -> Result<Self> {
        let context = CallContext::new();
        let duplex = transport.stream_asr(context.clone()).await?;
        let mut inbound = Inbound::new("asr", duplex.reader, context.clone());

        let result = tokio::spawn(async move {
            let result = inbound.recv().await?;
            while inbound.recv().await?.is_some() {
                tracing::warn!("asr stream sent more than one result");
            }
            result.ok_or_else(|| Error::Protocol("asr stream ended without a result".to_string()))
        });

        Ok(Self {
            outbound: Mutex::new(Outbound::new("asr", duplex.writer, context.clone())),
            result: Mutex::new(Some(result)),
            context,
        })
    }

    /// `Ok(false)` means the server stopped listening; call
    /// [`AsrStream::result`] next.
    pub async fn send_audio(&self, audio: &[u8]) -> Result<bool> {
        self.outbound.lock().await.send(v2::AsrInput::audio(audio)).await
    }

    /// Sends the session token. Must come before any audio.
    pub async fn send_token(&self, token: v2::TokenData) -> Result<bool> {
        self.outbound.lock().await.send(v2::AsrInput::token(token)).await
    }

    /// Stops sending audio, if that has not happened yet, and waits for the
    /// recognition result. Only one call gets the result.
    pub async fn result(&self) -> Result<v2::AsrResult> {
        let handle = self
            .result
            .lock()
            .await
            .take()
            .ok_or(Error::Misuse("asr result already taken"))?;

        {
            let mut outbound = self.outbound.lock().await;
            if !outbound.is_half_closed() {
                outbound.half_close().await?;
            }
        }

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("asr result task failed: {}", e);
                Err(Error::Protocol(format!("asr result task failed: {}", e)))
            }
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }
}

impl Drop for AsrStream {
    fn drop(&mut self) {
        if let Some(handle) = self.result.get_mut().take() {
            handle.abort();
        }
        self.context.cancel();
    }
}

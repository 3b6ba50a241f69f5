use diatheke_types::v2;

use super::{Inbound, Outbound};
use crate::error::Result;
use crate::transport::{CallContext, Transport};

/// Continuous transcription. Unlike ASR, results keep coming while audio is
/// sent, so feeding and draining should run concurrently; see
/// [`TranscribeStream::split`].
pub struct TranscribeStream {
    outbound: Outbound<v2::TranscribeInput>,
    inbound: Inbound<v2::TranscribeResult>,
}

/// Write half of a [`TranscribeStream`].
pub struct TranscribeSender<'a> {
    outbound: &'a mut Outbound<v2::TranscribeInput>,
}

/// Read half of a [`TranscribeStream`].
pub struct TranscribeReceiver<'a> {
    inbound: &'a mut Inbound<v2::TranscribeResult>,
}

impl TranscribeStream {
    pub(crate) async fn open(transport: &dyn Transport) -> Result<Self> {
        let context = CallContext::new();
        let duplex = transport.transcribe(context.clone()).await?;
        Ok(Self {
            outbound: Outbound::new("transcribe", duplex.writer, context.clone()),
            inbound: Inbound::new("transcribe", duplex.reader, context),
        })
    }

    pub fn split(&mut self) -> (TranscribeSender<'_>, TranscribeReceiver<'_>) {
        (
            TranscribeSender {
                outbound: &mut self.outbound,
            },
            TranscribeReceiver {
                inbound: &mut self.inbound,
            },
        )
    }

    pub async fn send_audio(&mut self, audio: &[u8]) -> Result<bool> {
        self.split().0.send_audio(audio).await
    }

    pub async fn send_action(&mut self, action: v2::TranscribeAction) -> Result<bool> {
        self.split().0.send_action(action).await
    }

    pub async fn send_finished(&mut self) -> Result<()> {
        self.split().0.send_finished().await
    }

    pub async fn receive_result(&mut self) -> Result<Option<v2::TranscribeResult>> {
        self.split().1.receive_result().await
    }

    /// Half-closes if still open, then ends the stream. Results not yet
    /// received are discarded.
    pub async fn close(&mut self) -> Result<()> {
        if !self.outbound.is_half_closed() {
            self.outbound.half_close().await?;
        }
        self.inbound.close().await
    }

    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

impl TranscribeSender<'_> {
    /// `Ok(false)` means the server stopped accepting audio.
    pub async fn send_audio(&mut self, audio: &[u8]) -> Result<bool> {
        self.outbound.send(v2::TranscribeInput::audio(audio)).await
    }

    /// Configures the stream. Must be the first message.
    pub async fn send_action(&mut self, action: v2::TranscribeAction) -> Result<bool> {
        self.outbound.send(v2::TranscribeInput::action(action)).await
    }

    /// Signals that no more audio follows. Results keep arriving until the
    /// server has processed what was sent.
    pub async fn send_finished(&mut self) -> Result<()> {
        self.outbound.half_close().await
    }
}

impl TranscribeReceiver<'_> {
    /// Next partial or final result, `Ok(None)` at the end of the stream.
    pub async fn receive_result(&mut self) -> Result<Option<v2::TranscribeResult>> {
        self.inbound.recv().await
    }
}

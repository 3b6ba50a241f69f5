use diatheke_types::v2;

use super::Inbound;
use crate::error::Result;
use crate::transport::{CallContext, Transport};

/// Audio synthesized for one reply action.
pub struct TtsStream {
    inbound: Inbound<v2::TtsAudio>,
}

impl TtsStream {
    pub(crate) async fn open(transport: &dyn Transport, reply: v2::ReplyAction) -> Result<Self> {
        let context = CallContext::new();
        let reader = transport.stream_tts(reply, context.clone()).await?;
        Ok(Self {
            inbound: Inbound::new("tts", reader, context),
        })
    }

    /// Next chunk of audio, `Ok(None)` when synthesis is complete.
    pub async fn receive_audio(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.inbound.recv().await?.map(|message| message.audio))
    }

    pub async fn close(&mut self) -> Result<()> {
        self.inbound.close().await
    }

    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

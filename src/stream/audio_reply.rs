use diatheke_types::v1::{self, audio_reply::OutputMessage};

use super::Inbound;
use crate::error::Result;
use crate::transport::{CallContext, LegacyTransport};

/// One message of a synthesized reply: `Begin`, any number of `Data`
/// chunks, then `End`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyFrame {
    Begin(String),
    Data(Vec<u8>),
    End,
}

#[derive(Default)]
struct Framing {
    in_reply: bool,
    warnings: usize,
}

impl Framing {
    fn observe(&mut self, session_id: &str, frame: &ReplyFrame) {
        let in_order = match frame {
            ReplyFrame::Begin(_) => !std::mem::replace(&mut self.in_reply, true),
            ReplyFrame::Data(_) => self.in_reply,
            ReplyFrame::End => std::mem::replace(&mut self.in_reply, false),
        };
        if !in_order {
            self.warnings += 1;
            tracing::warn!("session {}: audio reply frame out of order: {}", session_id, kind(frame));
        }
    }
}

fn kind(frame: &ReplyFrame) -> &'static str {
    match frame {
        ReplyFrame::Begin(_) => "begin",
        ReplyFrame::Data(_) => "data",
        ReplyFrame::End => "end",
    }
}

/// Synthesized speech for every reply of a legacy session.
pub struct AudioReplyStream {
    session_id: String,
    inbound: Inbound<v1::AudioReply>,
    framing: Framing,
}

impl AudioReplyStream {
    pub(crate) async fn open(transport: &dyn LegacyTransport, session_id: &str) -> Result<Self> {
        let context = CallContext::new();
        let reader = transport
            .stream_audio_replies(v1::SessionId::new(session_id), context.clone())
            .await?;
        Ok(Self {
            session_id: session_id.to_string(),
            inbound: Inbound::new("audio reply", reader, context),
            framing: Framing::default(),
        })
    }

    /// Next frame, `Ok(None)` once the session ended. Frames that break the
    /// begin/data/end order are still returned, and counted.
    pub async fn wait_for_reply(&mut self) -> Result<Option<ReplyFrame>> {
        loop {
            let Some(reply) = self.inbound.recv().await? else {
                return Ok(None);
            };
            let frame = match reply.output_message {
                Some(OutputMessage::Text(text)) => ReplyFrame::Begin(text),
                Some(OutputMessage::Data(audio)) => ReplyFrame::Data(audio),
                Some(OutputMessage::End(_)) => ReplyFrame::End,
                None => {
                    self.framing.warnings += 1;
                    tracing::warn!("session {}: skipping empty audio reply", self.session_id);
                    continue;
                }
            };
            self.framing.observe(&self.session_id, &frame);
            return Ok(Some(frame));
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        self.inbound.close().await
    }

    /// Number of frames seen out of order so far.
    pub fn protocol_warnings(&self) -> usize {
        self.framing.warnings
    }

    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

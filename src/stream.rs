//! Session streams.
//!
//! Every read side goes through [`Inbound`], which owns the single
//! finalization of the underlying call, and every write side goes through
//! [`Outbound`], which enforces half-close.

use tonic::Code;

use crate::error::{check, Error, Result};
use crate::transport::{CallContext, Reader, Writer};

mod asr;
mod audio_input;
mod audio_reply;
mod event;
mod standalone;
mod transcribe;
mod tts;

pub use asr::AsrStream;
pub use audio_input::AudioInputStream;
pub(crate) use audio_input::InputGuard;
pub use audio_reply::{AudioReplyStream, ReplyFrame};
pub use event::{Event, EventStream};
pub use standalone::{LegacyAsrStream, LegacyTtsStream};
pub use transcribe::{TranscribeReceiver, TranscribeSender, TranscribeStream};
pub use tts::TtsStream;

pub(crate) struct Inbound<T> {
    name: &'static str,
    reader: Reader<T>,
    context: CallContext,
    closed: bool,
}

impl<T: Send + 'static> Inbound<T> {
    pub(crate) fn new(name: &'static str, reader: Reader<T>, context: CallContext) -> Self {
        tracing::debug!("{} stream opened", name);
        Self {
            name,
            reader,
            context,
            closed: false,
        }
    }

    /// Next message, `Ok(None)` once the stream is over.
    pub(crate) async fn recv(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }

        let next = tokio::select! {
            biased;
            _ = self.context.cancelled() => None,
            message = self.reader.read() => message,
        };

        match next {
            Some(message) => Ok(Some(message)),
            None => self.finalize(false).await.map(|_| None),
        }
    }

    /// Ends the stream. Closing an open stream cancels the call; the
    /// resulting cancellation is not reported as an error.
    pub(crate) async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.finalize(true).await
    }

    pub(crate) fn context(&self) -> &CallContext {
        &self.context
    }

    async fn finalize(&mut self, closing: bool) -> Result<()> {
        self.closed = true;
        let externally_cancelled = self.context.is_cancelled();
        if closing {
            self.context.cancel();
        }

        let status = self.reader.finish().await;
        tracing::debug!("{} stream finished: {:?}", self.name, status.code());

        if closing && !externally_cancelled && status.code() == Code::Cancelled {
            return Ok(());
        }
        if externally_cancelled && status.code() == Code::Ok {
            return Err(Error::cancelled());
        }
        check(status)
    }
}

impl<T> Drop for Inbound<T> {
    fn drop(&mut self) {
        if !self.closed {
            self.context.cancel();
        }
    }
}

pub(crate) struct Outbound<T> {
    name: &'static str,
    writer: Writer<T>,
    context: CallContext,
    half_closed: bool,
}

impl<T: Send + 'static> Outbound<T> {
    pub(crate) fn new(name: &'static str, writer: Writer<T>, context: CallContext) -> Self {
        Self {
            name,
            writer,
            context,
            half_closed: false,
        }
    }

    /// Writes one message. `Ok(false)` means the server stopped accepting
    /// input and the terminal status has to be fetched from the read side.
    pub(crate) async fn send(&mut self, message: T) -> Result<bool> {
        if self.half_closed {
            return Err(Error::Misuse("write after the stream was half-closed"));
        }
        if self.context.is_cancelled() {
            return Ok(false);
        }

        let accepted = tokio::select! {
            biased;
            _ = self.context.cancelled() => false,
            accepted = self.writer.write(message) => accepted,
        };
        if !accepted {
            tracing::debug!("{} stream no longer accepts input", self.name);
        }
        Ok(accepted)
    }

    pub(crate) async fn half_close(&mut self) -> Result<()> {
        if self.half_closed {
            return Err(Error::Misuse("stream already half-closed"));
        }
        self.half_closed = true;
        if !self.writer.writes_done().await {
            // The server already ended the call; the read side has the status.
            tracing::debug!("{} stream was closed before writes_done", self.name);
        }
        Ok(())
    }

    pub(crate) fn is_half_closed(&self) -> bool {
        self.half_closed
    }
}

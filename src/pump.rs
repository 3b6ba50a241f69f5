//! Moves audio between byte streams and Diatheke streams.

use std::fmt::Display;
use std::sync::Mutex;

use diatheke_types::v2;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{Error, Result};
use crate::stream::{AsrStream, TranscribeStream, TtsStream};

/// Keeps the first error raised by any of several cooperating paths and
/// tells the others to stop.
pub(crate) struct FirstError {
    slot: Mutex<Option<Error>>,
    stop: CancellationToken,
}

impl FirstError {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            stop: CancellationToken::new(),
        }
    }

    pub(crate) fn capture(&self, path: &str, error: Error) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            tracing::debug!("{} path failed: {}", path, error);
            *slot = Some(error);
            self.stop.cancel();
        } else {
            tracing::warn!("{} path failed after an earlier error: {}", path, error);
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub(crate) fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    pub(crate) fn into_error(self) -> Option<Error> {
        self.slot.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Sends audio from `reader` until it runs dry or the server stops
/// listening, then waits for the recognition result.
pub async fn read_asr_audio<R>(stream: &AsrStream, reader: &mut R, buf_size: usize) -> Result<v2::AsrResult>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buf_size.max(1)];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 || !stream.send_audio(&buf[..n]).await? {
            break;
        }
    }
    stream.result().await
}

/// Streams audio from `reader` into a transcribe stream while handing every
/// result to `on_result`, then closes the stream.
///
/// The first failure of either path (reading audio, sending it, receiving
/// results or the handler) stops the other path and is returned once both
/// have stopped.
pub async fn read_transcribe_audio<R, F, E>(
    stream: &mut TranscribeStream,
    reader: &mut R,
    buf_size: usize,
    mut on_result: F,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(v2::TranscribeResult) -> std::result::Result<(), E>,
    E: Display,
{
    let errors = FirstError::new();
    {
        let (mut sender, mut receiver) = stream.split();

        let feed = async {
            let mut buf = vec![0u8; buf_size.max(1)];
            loop {
                let read = tokio::select! {
                    biased;
                    _ = errors.stopped() => return,
                    read = reader.read(&mut buf) => read,
                };
                let n = match read {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => return errors.capture("audio input", e.into()),
                };
                let sent = tokio::select! {
                    biased;
                    _ = errors.stopped() => return,
                    sent = sender.send_audio(&buf[..n]) => sent,
                };
                match sent {
                    Ok(true) => {}
                    Ok(false) if errors.is_set() => return,
                    // Server is done listening; its status arrives on the results path.
                    Ok(false) => break,
                    Err(e) => return errors.capture("audio input", e),
                }
            }
            if let Err(e) = sender.send_finished().await {
                errors.capture("audio input", e);
            }
        };

        let drain = async {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = errors.stopped() => return,
                    next = receiver.receive_result() => next,
                };
                match next {
                    Ok(Some(result)) => {
                        if let Err(e) = on_result(result) {
                            return errors.capture("results", Error::Callback(e.to_string()));
                        }
                    }
                    Ok(None) => return,
                    Err(e) => return errors.capture("results", e),
                }
            }
        };

        tokio::join!(feed, drain);
    }

    let closed = stream.close().await;
    match errors.into_error() {
        Some(e) => {
            if let Err(close) = closed {
                tracing::warn!("transcribe stream close failed after an earlier error: {}", close);
            }
            Err(e)
        }
        None => closed,
    }
}

/// Writes synthesized audio to `writer` until the stream ends.
pub async fn write_tts_audio<W>(stream: &mut TtsStream, writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(audio) = stream.receive_audio().await? {
        if let Err(e) = writer.write_all(&audio).await {
            if let Err(close) = stream.close().await {
                tracing::warn!("tts stream close failed after a write error: {}", close);
            }
            return Err(e.into());
        }
    }
    writer.flush().await?;
    Ok(())
}

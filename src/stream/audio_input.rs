use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use diatheke_types::v1;

use super::{Inbound, Outbound};
use crate::error::{Error, Result};
use crate::transport::{CallContext, LegacyTransport};

/// Marks a session as having a live audio input stream until dropped.
pub(crate) struct InputGuard {
    active: Arc<Mutex<HashSet<String>>>,
    session_id: String,
}

impl InputGuard {
    pub(crate) fn acquire(active: Arc<Mutex<HashSet<String>>>, session_id: &str) -> Result<Self> {
        let inserted = active
            .lock()
            .map_err(|_| Error::Misuse("audio input registry poisoned"))?
            .insert(session_id.to_string());
        if !inserted {
            return Err(Error::Misuse("session already has an audio input stream"));
        }
        Ok(Self {
            active,
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.session_id);
        }
    }
}

/// Pushes audio into a legacy session. Recognition results arrive on the
/// session's [`EventStream`](super::EventStream), not here.
pub struct AudioInputStream {
    session_id: String,
    outbound: Outbound<v1::AudioInput>,
    inbound: Inbound<v1::Empty>,
    _guard: InputGuard,
}

impl AudioInputStream {
    pub(crate) async fn open(
        transport: &dyn LegacyTransport,
        session_id: &str,
        guard: InputGuard,
    ) -> Result<Self> {
        let context = CallContext::new();
        let duplex = transport.stream_audio_input(context.clone()).await?;
        let mut stream = Self {
            session_id: session_id.to_string(),
            outbound: Outbound::new("audio input", duplex.writer, context.clone()),
            inbound: Inbound::new("audio input", duplex.reader, context),
            _guard: guard,
        };

        // The server needs to know the session before any audio.
        if !stream.outbound.send(v1::AudioInput::session_id(session_id)).await? {
            tracing::debug!("session {}: audio input refused the session id", session_id);
        }
        Ok(stream)
    }

    /// Writes one chunk of audio. `Ok(false)` means the server stopped
    /// accepting audio; call [`AudioInputStream::finished`] for the reason.
    /// An empty chunk finishes the stream.
    pub async fn push_audio(&mut self, audio: &[u8]) -> Result<bool> {
        if self.outbound.is_half_closed() {
            return Err(Error::Misuse("audio pushed after finished"));
        }
        if audio.is_empty() {
            self.finished().await?;
            return Ok(false);
        }
        self.outbound.send(v1::AudioInput::data(audio)).await
    }

    /// Ends the input and waits for the server to acknowledge it.
    pub async fn finished(&mut self) -> Result<()> {
        if self.outbound.is_half_closed() {
            return Err(Error::Misuse("audio input already finished"));
        }
        self.outbound.half_close().await?;
        tracing::debug!("session {}: audio input finished", self.session_id);

        while self.inbound.recv().await?.is_some() {}
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cancelling the context abandons the stream from another task.
    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingWriter, ScriptedReader};
    use crate::transport::{Duplex, MockLegacyTransport};
    use diatheke_types::v1::audio_input::Request;
    use std::sync::atomic::Ordering;
    use tonic::{Code, Status};

    fn registry() -> Arc<Mutex<HashSet<String>>> {
        Arc::new(Mutex::new(HashSet::new()))
    }

    #[tokio::test]
    async fn test_three_chunks_then_finished() {
        // Arrange
        let writer = RecordingWriter::new();
        let log = writer.log();
        let reader = ScriptedReader::new(vec![v1::Empty {}]);
        let finishes = reader.finishes();
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_audio_input().return_once(move |_| {
            Ok(Duplex {
                writer: Box::new(writer),
                reader: Box::new(reader),
            })
        });
        let guard = InputGuard::acquire(registry(), "s1").unwrap();

        // Act
        let mut stream = AudioInputStream::open(&transport, "s1", guard).await.unwrap();
        for chunk in [&[1u8, 2][..], &[3], &[4, 5, 6]] {
            assert!(stream.push_audio(chunk).await.unwrap());
        }
        stream.finished().await.unwrap();

        // Assert
        let writes = log.writes();
        assert_eq!(writes[0].request, Some(Request::SessionId("s1".to_string())));
        let audio: Vec<_> = writes[1..]
            .iter()
            .filter(|w| matches!(w.request, Some(Request::Data(_))))
            .collect();
        assert_eq!(audio.len(), 3);
        assert_eq!(writes.len(), 4);
        assert_eq!(log.writes_done(), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);

        assert!(matches!(stream.push_audio(&[7]).await, Err(Error::Misuse(_))));
        assert!(matches!(stream.finished().await, Err(Error::Misuse(_))));
        assert_eq!(log.writes().len(), 4);
        assert_eq!(log.writes_done(), 1);
    }

    #[tokio::test]
    async fn test_empty_push_finishes() {
        let writer = RecordingWriter::new();
        let log = writer.log();
        let reader = ScriptedReader::new(vec![v1::Empty {}]);
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_audio_input().return_once(move |_| {
            Ok(Duplex {
                writer: Box::new(writer),
                reader: Box::new(reader),
            })
        });
        let guard = InputGuard::acquire(registry(), "s1").unwrap();

        let mut stream = AudioInputStream::open(&transport, "s1", guard).await.unwrap();

        assert!(!stream.push_audio(&[]).await.unwrap());
        assert_eq!(log.writes_done(), 1);
        assert!(matches!(stream.finished().await, Err(Error::Misuse(_))));
    }

    #[tokio::test]
    async fn test_early_close_surfaces_on_finished() {
        let writer = RecordingWriter::new().accepting(1);
        let reader = ScriptedReader::new(Vec::new()).with_status(Status::invalid_argument("bad audio"));
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_audio_input().return_once(move |_| {
            Ok(Duplex {
                writer: Box::new(writer),
                reader: Box::new(reader),
            })
        });
        let guard = InputGuard::acquire(registry(), "s1").unwrap();

        let mut stream = AudioInputStream::open(&transport, "s1", guard).await.unwrap();

        assert!(!stream.push_audio(&[1, 2, 3]).await.unwrap());
        let err = stream.finished().await.unwrap_err();
        assert_eq!(err.code(), Some(Code::InvalidArgument));
    }

    #[test]
    fn test_one_input_stream_per_session() {
        let active = registry();
        let first = InputGuard::acquire(active.clone(), "s1").unwrap();

        assert!(matches!(InputGuard::acquire(active.clone(), "s1"), Err(Error::Misuse(_))));
        assert!(InputGuard::acquire(active.clone(), "s2").is_ok());

        drop(first);
        assert!(InputGuard::acquire(active, "s1").is_ok());
    }
}

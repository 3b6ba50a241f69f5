//! Recognition and synthesis on the session id API that are not tied to a
//! session.

use diatheke_types::v1;

use super::{Inbound, Outbound};
use crate::error::{Error, Result};
use crate::transport::{CallContext, LegacyTransport};

/// Speech recognition with a named ASR model. Results may arrive while audio
/// is still being pushed and keep coming until the stream ends.
pub struct LegacyAsrStream {
    model: String,
    outbound: Outbound<v1::AsrRequest>,
    inbound: Inbound<v1::AsrResponse>,
}

impl LegacyAsrStream {
    pub(crate) async fn open(transport: &dyn LegacyTransport, model: &str) -> Result<Self> {
        let context = CallContext::new();
        let duplex = transport.stream_asr(context.clone()).await?;
        let mut stream = Self {
            model: model.to_string(),
            outbound: Outbound::new("legacy asr", duplex.writer, context.clone()),
            inbound: Inbound::new("legacy asr", duplex.reader, context),
        };

        if !stream.outbound.send(v1::AsrRequest::model(model)).await? {
            tracing::debug!("asr model {} was refused", model);
        }
        Ok(stream)
    }

    /// `Ok(false)` means the server stopped accepting audio.
    pub async fn push_audio(&mut self, audio: &[u8]) -> Result<bool> {
        if self.outbound.is_half_closed() {
            return Err(Error::Misuse("audio pushed after finished"));
        }
        self.outbound.send(v1::AsrRequest::audio(audio)).await
    }

    /// No more audio follows. Remaining results can still be received.
    pub async fn finished(&mut self) -> Result<()> {
        self.outbound.half_close().await?;
        tracing::debug!("asr stream for model {} finished", self.model);
        Ok(())
    }

    /// Next transcription, `Ok(None)` once the server ended the stream.
    pub async fn receive_result(&mut self) -> Result<Option<v1::AsrResponse>> {
        self.inbound.recv().await
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

/// Speech synthesized for one piece of text with a named TTS model.
pub struct LegacyTtsStream {
    inbound: Inbound<v1::TtsResponse>,
}

impl LegacyTtsStream {
    pub(crate) async fn open(transport: &dyn LegacyTransport, model: &str, text: &str) -> Result<Self> {
        let context = CallContext::new();
        let request = v1::TtsRequest {
            model: model.to_string(),
            text: text.to_string(),
        };
        let reader = transport.stream_tts(request, context.clone()).await?;
        Ok(Self {
            inbound: Inbound::new("legacy tts", reader, context),
        })
    }

    /// Next chunk of audio, `Ok(None)` when synthesis is complete.
    pub async fn receive_audio(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.inbound.recv().await?.map(|response| response.data))
    }

    pub async fn close(&mut self) -> Result<()> {
        self.inbound.close().await
    }

    pub fn context(&self) -> &CallContext {
        self.inbound.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingWriter, ScriptedReader};
    use crate::transport::{Duplex, MockLegacyTransport};
    use diatheke_types::v1::asr_request::AsrData;
    use mockall::predicate::*;
    use std::sync::atomic::Ordering;
    use tonic::{Code, Status};

    fn transcript(text: &str) -> v1::AsrResponse {
        v1::AsrResponse {
            text: text.to_string(),
            confidence_score: 0.9,
        }
    }

    #[tokio::test]
    async fn test_asr_sends_model_then_audio() {
        let writer = RecordingWriter::new();
        let log = writer.log();
        let reader = ScriptedReader::new(vec![transcript("hello"), transcript("hello world")]);
        let finishes = reader.finishes();
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_asr().return_once(move |_| {
            Ok(Duplex {
                writer: Box::new(writer),
                reader: Box::new(reader),
            })
        });

        let mut stream = LegacyAsrStream::open(&transport, "en_US").await.unwrap();
        assert!(stream.push_audio(&[1, 2]).await.unwrap());
        assert!(stream.push_audio(&[3]).await.unwrap());
        stream.finished().await.unwrap();

        let mut texts = Vec::new();
        while let Some(result) = stream.receive_result().await.unwrap() {
            texts.push(result.text);
        }
        stream.close().await.unwrap();

        assert_eq!(texts, vec!["hello", "hello world"]);
        let writes: Vec<_> = log.writes().into_iter().map(|w| w.asr_data).collect();
        assert_eq!(
            writes,
            vec![
                Some(AsrData::Model("en_US".to_string())),
                Some(AsrData::Audio(vec![1, 2])),
                Some(AsrData::Audio(vec![3])),
            ]
        );
        assert_eq!(log.writes_done(), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_asr_push_after_finished_is_misuse() {
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_asr().return_once(|_| {
            Ok(Duplex {
                writer: Box::new(RecordingWriter::new()),
                reader: Box::new(ScriptedReader::new(Vec::<v1::AsrResponse>::new())),
            })
        });

        let mut stream = LegacyAsrStream::open(&transport, "en_US").await.unwrap();
        stream.finished().await.unwrap();

        assert!(matches!(stream.push_audio(&[1]).await, Err(Error::Misuse(_))));
        assert!(matches!(stream.finished().await, Err(Error::Misuse(_))));
        assert_eq!(stream.receive_result().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_asr_unknown_model_surfaces_on_receive() {
        let mut transport = MockLegacyTransport::new();
        transport.expect_stream_asr().return_once(|_| {
            Ok(Duplex {
                writer: Box::new(RecordingWriter::new()),
                reader: Box::new(
                    ScriptedReader::new(Vec::<v1::AsrResponse>::new())
                        .with_status(Status::invalid_argument("unknown model")),
                ),
            })
        });

        let mut stream = LegacyAsrStream::open(&transport, "nope").await.unwrap();
        let err = stream.receive_result().await.unwrap_err();

        assert_eq!(err.code(), Some(Code::InvalidArgument));
        assert_eq!(stream.receive_result().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tts_receives_until_end() {
        let reader = ScriptedReader::new(vec![
            v1::TtsResponse { data: vec![1, 2] },
            v1::TtsResponse { data: vec![3] },
        ]);
        let finishes = reader.finishes();
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_stream_tts()
            .with(
                eq(v1::TtsRequest {
                    model: "luna".to_string(),
                    text: "Hello".to_string(),
                }),
                always(),
            )
            .return_once(move |_, _| Ok(Box::new(reader)));

        let mut stream = LegacyTtsStream::open(&transport, "luna", "Hello").await.unwrap();

        assert_eq!(stream.receive_audio().await.unwrap(), Some(vec![1, 2]));
        assert_eq!(stream.receive_audio().await.unwrap(), Some(vec![3]));
        assert_eq!(stream.receive_audio().await.unwrap(), None);
        stream.close().await.unwrap();
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tts_close_while_open_is_quiet() {
        let reader = ScriptedReader::new(vec![v1::TtsResponse { data: vec![1] }])
            .pending()
            .with_status(Status::cancelled("client cancelled"));
        let mut transport = MockLegacyTransport::new();
        transport
            .expect_stream_tts()
            .return_once(move |_, _| Ok(Box::new(reader)));

        let mut stream = LegacyTtsStream::open(&transport, "luna", "Hello").await.unwrap();
        assert_eq!(stream.receive_audio().await.unwrap(), Some(vec![1]));

        stream.close().await.unwrap();
        assert!(stream.context().is_cancelled());
        assert_eq!(stream.receive_audio().await.unwrap(), None);
    }
}

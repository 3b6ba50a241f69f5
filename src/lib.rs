mod client;
mod command;
mod conversation;
mod error;
mod pump;
mod stream;
#[cfg(test)]
mod testing;
pub mod transport;

pub use diatheke_types as types;
pub use client::config::{Config, ConfigBuilder};
pub use client::{connect, connect_legacy_with_config, connect_with_config, Client, LegacyClient};
pub use command::{CommandStatus, StatusCode};
pub use conversation::{open, Action, Conversation, LegacyConversation, Protocol, TokenConversation};
pub use error::{Error, Result};
pub use pump::{read_asr_audio, read_transcribe_audio, write_tts_audio};
pub use stream::{
    AsrStream, AudioInputStream, AudioReplyStream, Event, EventStream, LegacyAsrStream, LegacyTtsStream, ReplyFrame,
    TranscribeReceiver, TranscribeSender, TranscribeStream, TtsStream,
};

#[cfg(feature = "utils")]
pub use diatheke_utils as utils;

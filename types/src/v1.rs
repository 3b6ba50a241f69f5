//! Session id based API. Results of session input are delivered
//! asynchronously on the session's event and audio reply streams.

use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VersionResponse {
    #[prost(string, tag = "1")]
    pub server: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelsResponse {
    #[prost(string, repeated, tag = "1")]
    pub models: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NewSessionRequest {
    #[prost(string, tag = "1")]
    pub model: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionId {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

impl SessionId {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DiathekeEvent {
    #[prost(oneof = "diatheke_event::Result", tags = "1, 2, 3")]
    pub result: Option<diatheke_event::Result>,
}

pub mod diatheke_event {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Result {
        #[prost(message, tag = "1")]
        Command(super::CommandEvent),
        #[prost(message, tag = "2")]
        Recognize(super::RecognizeEvent),
        #[prost(message, tag = "3")]
        Reply(super::ReplyEvent),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandEvent {
    #[prost(string, tag = "1")]
    pub command_id: String,
    #[prost(map = "string, string", tag = "2")]
    pub parameters: HashMap<String, String>,
    /// Internal server state; must be echoed back unmodified in the
    /// matching [`CommandStatus`].
    #[prost(string, tag = "3")]
    pub command_state_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RecognizeEvent {
    #[prost(string, tag = "1")]
    pub text: String,
    /// Whether the recognized text matched something the model understands.
    #[prost(bool, tag = "2")]
    pub valid_input: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReplyEvent {
    #[prost(string, tag = "1")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandStatus {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub command_id: String,
    #[prost(enumeration = "command_status::StatusCode", tag = "3")]
    pub return_status: i32,
    #[prost(map = "string, string", tag = "4")]
    pub output_parameters: HashMap<String, String>,
    #[prost(string, tag = "5")]
    pub error_message_text: String,
    #[prost(string, tag = "6")]
    pub command_state_id: String,
}

pub mod command_status {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum StatusCode {
        Success = 0,
        Failure = 1,
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AudioInput {
    #[prost(oneof = "audio_input::Request", tags = "1, 2")]
    pub request: Option<audio_input::Request>,
}

pub mod audio_input {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Request {
        /// Must be the first message on the stream.
        #[prost(string, tag = "1")]
        SessionId(String),
        #[prost(bytes = "vec", tag = "2")]
        Data(Vec<u8>),
    }
}

impl AudioInput {
    pub fn session_id(session_id: &str) -> Self {
        Self {
            request: Some(audio_input::Request::SessionId(session_id.to_string())),
        }
    }

    pub fn data(audio: &[u8]) -> Self {
        Self {
            request: Some(audio_input::Request::Data(audio.to_vec())),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AudioReply {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(oneof = "audio_reply::OutputMessage", tags = "2, 3, 4")]
    pub output_message: Option<audio_reply::OutputMessage>,
}

pub mod audio_reply {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum OutputMessage {
        /// Text of the reply; starts a new reply.
        #[prost(string, tag = "2")]
        Text(String),
        #[prost(bytes = "vec", tag = "3")]
        Data(Vec<u8>),
        /// Marks the end of the current reply.
        #[prost(message, tag = "4")]
        End(super::Empty),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PushTextRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub text: String,
}

/// Request on a standalone recognition stream. The first message names the
/// model; audio follows.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AsrRequest {
    #[prost(oneof = "asr_request::AsrData", tags = "1, 2")]
    pub asr_data: Option<asr_request::AsrData>,
}

pub mod asr_request {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum AsrData {
        #[prost(string, tag = "1")]
        Model(String),
        #[prost(bytes = "vec", tag = "2")]
        Audio(Vec<u8>),
    }
}

impl AsrRequest {
    pub fn model(model: &str) -> Self {
        Self {
            asr_data: Some(asr_request::AsrData::Model(model.to_string())),
        }
    }

    pub fn audio(audio: &[u8]) -> Self {
        Self {
            asr_data: Some(asr_request::AsrData::Audio(audio.to_vec())),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AsrResponse {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(double, tag = "2")]
    pub confidence_score: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TtsRequest {
    #[prost(string, tag = "1")]
    pub model: String,
    #[prost(string, tag = "2")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TtsResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

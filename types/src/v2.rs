//! Token based API. A session is represented by [`TokenData`], which the
//! server replaces on every call that changes the session state.

use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VersionResponse {
    /// Diatheke engine version.
    #[prost(string, tag = "1")]
    pub diatheke: String,
    /// Chosun (NLU) version.
    #[prost(string, tag = "2")]
    pub chosun: String,
    /// Cubic (ASR) version.
    #[prost(string, tag = "3")]
    pub cubic: String,
    /// Luna (TTS) version.
    #[prost(string, tag = "4")]
    pub luna: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListModelsResponse {
    #[prost(message, repeated, tag = "1")]
    pub models: Vec<ModelInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelInfo {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub language: String,
    #[prost(uint32, tag = "4")]
    pub asr_sample_rate: u32,
    #[prost(uint32, tag = "5")]
    pub tts_sample_rate: u32,
}

/// Opaque session state. Always resubmit the most recent token returned by
/// the server; older tokens describe a stale conversation.
///
/// Tokens serialize with serde so a conversation can be stored and resumed
/// by a later process.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct TokenData {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub id: String,
    #[prost(string, tag = "3")]
    pub metadata: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionStart {
    #[prost(string, tag = "1")]
    pub model_id: String,
    /// Optional wakeword override; empty uses the model default.
    #[prost(string, tag = "2")]
    pub wakeword: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionInput {
    #[prost(message, optional, tag = "1")]
    pub token: Option<TokenData>,
    #[prost(oneof = "session_input::Input", tags = "2, 3, 4, 5")]
    pub input: Option<session_input::Input>,
}

pub mod session_input {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Input {
        #[prost(message, tag = "2")]
        Text(super::TextInput),
        #[prost(message, tag = "3")]
        Asr(super::AsrResult),
        #[prost(message, tag = "4")]
        Cmd(super::CommandResult),
        #[prost(message, tag = "5")]
        Story(super::SetStory),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TextInput {
    #[prost(string, tag = "1")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandResult {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(map = "string, string", tag = "2")]
    pub out_parameters: HashMap<String, String>,
    /// Non-empty when the command failed.
    #[prost(string, tag = "3")]
    pub error: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetStory {
    #[prost(string, tag = "1")]
    pub story_id: String,
    #[prost(map = "string, string", tag = "2")]
    pub parameters: HashMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionOutput {
    #[prost(message, optional, tag = "1")]
    pub token: Option<TokenData>,
    #[prost(message, repeated, tag = "2")]
    pub action_list: Vec<ActionData>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ActionData {
    #[prost(oneof = "action_data::Action", tags = "1, 2, 3, 4")]
    pub action: Option<action_data::Action>,
}

pub mod action_data {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Action {
        #[prost(message, tag = "1")]
        Input(super::WaitForUserAction),
        #[prost(message, tag = "2")]
        Command(super::CommandAction),
        #[prost(message, tag = "3")]
        Reply(super::ReplyAction),
        #[prost(message, tag = "4")]
        Transcribe(super::TranscribeAction),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WaitForUserAction {
    #[prost(bool, tag = "1")]
    pub requires_wake_word: bool,
    #[prost(bool, tag = "2")]
    pub immediate: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandAction {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(map = "string, string", tag = "2")]
    pub input_parameters: HashMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReplyAction {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(string, tag = "2")]
    pub luna_model: String,
}

impl ReplyAction {
    pub fn new(text: &str, luna_model: &str) -> Self {
        Self {
            text: text.to_string(),
            luna_model: luna_model.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TranscribeAction {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub cubic_model_id: String,
    #[prost(string, tag = "3")]
    pub diatheke_model_id: String,
}

impl TranscribeAction {
    /// Action for transcription that is not tied to a session.
    pub fn with_cubic_model(cubic_model_id: &str) -> Self {
        Self {
            cubic_model_id: cubic_model_id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AsrInput {
    #[prost(oneof = "asr_input::Data", tags = "1, 2")]
    pub data: Option<asr_input::Data>,
}

pub mod asr_input {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "1")]
        Token(super::TokenData),
        #[prost(bytes = "vec", tag = "2")]
        Audio(Vec<u8>),
    }
}

impl AsrInput {
    pub fn audio(audio: &[u8]) -> Self {
        Self {
            data: Some(asr_input::Data::Audio(audio.to_vec())),
        }
    }

    pub fn token(token: TokenData) -> Self {
        Self {
            data: Some(asr_input::Data::Token(token)),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AsrResult {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(double, tag = "2")]
    pub confidence: f64,
    /// True when recognition stopped because no speech was heard in time.
    #[prost(bool, tag = "3")]
    pub timed_out: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TtsAudio {
    #[prost(bytes = "vec", tag = "1")]
    pub audio: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TranscribeInput {
    #[prost(oneof = "transcribe_input::Data", tags = "1, 2")]
    pub data: Option<transcribe_input::Data>,
}

pub mod transcribe_input {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "1")]
        Action(super::TranscribeAction),
        #[prost(bytes = "vec", tag = "2")]
        Audio(Vec<u8>),
    }
}

impl TranscribeInput {
    pub fn audio(audio: &[u8]) -> Self {
        Self {
            data: Some(transcribe_input::Data::Audio(audio.to_vec())),
        }
    }

    pub fn action(action: TranscribeAction) -> Self {
        Self {
            data: Some(transcribe_input::Data::Action(action)),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TranscribeResult {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(double, tag = "2")]
    pub confidence: f64,
    #[prost(bool, tag = "3")]
    pub is_partial: bool,
}

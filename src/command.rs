//! Completion status of commands the dialogue asks the client to run.

use std::collections::HashMap;

use diatheke_types::{v1, v2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    Success,
    #[default]
    Failure,
}

/// Outcome of one command, reported back to the session exactly once.
///
/// Output parameters start out as the command's input parameters, so a
/// handler only has to overwrite what it changed. The status stays
/// [`StatusCode::Failure`] until the handler says otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStatus {
    command_id: String,
    state_id: String,
    code: StatusCode,
    error_message: String,
    params: HashMap<String, String>,
}

impl CommandStatus {
    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    /// Opaque server state, echoed back unmodified.
    pub fn state_id(&self) -> &str {
        &self.state_id
    }

    pub fn status_code(&self) -> StatusCode {
        self.code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn set_status_code(&mut self, code: StatusCode) {
        self.code = code;
    }

    pub fn set_error(&mut self, message: &str) {
        self.error_message = message.to_string();
    }

    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn set_string_param(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    pub fn set_int_param(&mut self, key: &str, value: i64) {
        self.params.insert(key.to_string(), value.to_string());
    }

    pub fn set_double_param(&mut self, key: &str, value: f64) {
        self.params.insert(key.to_string(), value.to_string());
    }

    pub(crate) fn to_legacy(&self, session_id: &str) -> v1::CommandStatus {
        let return_status = match self.code {
            StatusCode::Success => v1::command_status::StatusCode::Success,
            StatusCode::Failure => v1::command_status::StatusCode::Failure,
        };
        v1::CommandStatus {
            session_id: session_id.to_string(),
            command_id: self.command_id.clone(),
            return_status: return_status as i32,
            output_parameters: self.params.clone(),
            error_message_text: self.error_message.clone(),
            command_state_id: self.state_id.clone(),
        }
    }

    /// The token API has no status code; a failure is a non-empty error.
    pub(crate) fn to_result(&self) -> v2::CommandResult {
        let error = match (self.code, self.error_message.is_empty()) {
            (StatusCode::Failure, true) => "command failed".to_string(),
            _ => self.error_message.clone(),
        };
        v2::CommandResult {
            id: self.command_id.clone(),
            out_parameters: self.params.clone(),
            error,
        }
    }
}

impl From<&v1::CommandEvent> for CommandStatus {
    fn from(event: &v1::CommandEvent) -> Self {
        Self {
            command_id: event.command_id.clone(),
            state_id: event.command_state_id.clone(),
            params: event.parameters.clone(),
            ..Default::default()
        }
    }
}

impl From<&v2::CommandAction> for CommandStatus {
    fn from(action: &v2::CommandAction) -> Self {
        Self {
            command_id: action.id.clone(),
            params: action.input_parameters.clone(),
            ..Default::default()
        }
    }
}

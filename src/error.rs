use tonic::{Code, Status};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The call or stream ended with a non-ok status.
    #[error("transport error ({code:?}): {message}")]
    Transport { code: Code, message: String },
    /// The server sent something the client could not make sense of.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The caller broke a stream contract, e.g. wrote after half-close.
    #[error("stream misuse: {0}")]
    Misuse(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("audio i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid session token: {0}")]
    Token(#[from] serde_json::Error),
    /// A caller supplied result handler failed.
    #[error("result handler failed: {0}")]
    Callback(String),
}

impl Error {
    pub(crate) fn cancelled() -> Self {
        Self::Transport {
            code: Code::Cancelled,
            message: "call cancelled by the client".to_string(),
        }
    }

    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.code() == Some(Code::Cancelled)
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Transport {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(e: tonic::transport::Error) -> Self {
        Self::Transport {
            code: Code::Unavailable,
            message: e.to_string(),
        }
    }
}

/// Converts a terminal status into a result.
pub(crate) fn check(status: Status) -> Result<()> {
    match status.code() {
        Code::Ok => Ok(()),
        _ => Err(status.into()),
    }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing server address")]
    MissingAddress,
    #[error("{section} config error: {reason}")]
    Application { section: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, rename = "ModelID")]
    pub model_id: String,
    /// `token` or `legacy`; empty picks the library default.
    #[serde(default)]
    pub protocol: String,
    /// Unary call timeout, zero for none.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// External program used for recording or playback.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AudioConfig {
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub args: String,
}

impl AudioConfig {
    pub fn is_set(&self) -> bool {
        !self.application.is_empty()
    }

    pub fn arg_list(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }
}

/// Settings shared by the demo applications, read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DemoConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub recording: AudioConfig,
    #[serde(default)]
    pub playback: AudioConfig,
}

impl DemoConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = toml::from_str(text)?;

        if config.server.address.is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if config.recording.is_set() {
            check_application("recording", &config.recording.application)?;
        }
        if config.playback.is_set() {
            check_application("playback", &config.playback.application)?;
        }

        Ok(config)
    }
}

/// The application must be a file on disk or be found on the `PATH`.
fn check_application(section: &'static str, app: &str) -> Result<(), ConfigError> {
    let path = Path::new(app);
    if path.is_dir() {
        return Err(ConfigError::Application {
            section,
            reason: format!("{} is a directory, not an executable", app),
        });
    }
    if path.is_file() {
        return Ok(());
    }

    let on_path = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(app).is_file()))
        .unwrap_or(false);
    if on_path {
        Ok(())
    } else {
        Err(ConfigError::Application {
            section,
            reason: format!("could not find application {}", app),
        })
    }
}

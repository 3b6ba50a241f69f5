use secrecy::SecretString;

use crate::client::consts::{DEFAULT_ADDRESS, DEFAULT_REQUEST_TIMEOUT_MS, DIATHEKE_ADDRESS};
use crate::conversation::Protocol;

/// Connection settings for a Diatheke server.
#[derive(Debug, Clone)]
pub struct Config {
    address: String,
    insecure: bool,
    server_cert: Option<String>,
    client_cert: Option<(String, SecretString)>,
    request_timeout_ms: u64,
    protocol: Protocol,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.config.address = address.to_string();
        self
    }

    /// Use a plaintext connection instead of TLS.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.config.insecure = insecure;
        self
    }

    /// PEM encoded CA used to verify the server instead of the system roots.
    pub fn with_server_cert(mut self, pem: &str) -> Self {
        self.config.server_cert = Some(pem.to_string());
        self
    }

    /// PEM encoded certificate and key for mutual TLS.
    pub fn with_client_cert(mut self, cert_pem: &str, key_pem: &str) -> Self {
        self.config.client_cert = Some((
            cert_pem.to_string(),
            SecretString::from(key_pem.to_string()),
        ));
        self
    }

    /// Timeout for unary calls. Zero disables it.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            address: std::env::var(DIATHEKE_ADDRESS).unwrap_or_else(|_| DEFAULT_ADDRESS.to_string()),
            insecure: false,
            server_cert: None,
            client_cert: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            protocol: Protocol::default(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub fn server_cert(&self) -> Option<&str> {
        self.server_cert.as_deref()
    }

    pub fn client_cert(&self) -> Option<(&str, &SecretString)> {
        self.client_cert
            .as_ref()
            .map(|(cert, key)| (cert.as_str(), key))
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

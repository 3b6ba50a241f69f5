pub const DIATHEKE_ADDRESS: &str = "DIATHEKE_ADDRESS";

pub const DEFAULT_ADDRESS: &str = "localhost:9002";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Requests buffered between a stream writer and the call task.
pub const STREAM_BUFFER: usize = 16;

//! Message types for the Diatheke service (`cobaltspeech.diatheke`).
//!
//! Two generations of the API exist side by side. [`v2`] is the token based
//! API where every call returns a fresh session token. [`v1`] is the older
//! API where a session is a plain string id and results arrive on side
//! streams.

pub mod v1;
pub mod v2;

/// Fully qualified gRPC service name shared by both generations.
pub const SERVICE_NAME: &str = "cobaltspeech.diatheke.Diatheke";

//! Streamed looking-glass command execution.

pub mod config;
pub mod controller;
pub mod decode;
pub mod error;
pub mod location;
pub mod registry;
pub mod transport;

pub use config::{parse_locations, ClientConfig, API_URL_ENV, DEFAULT_API_URL, LOCATIONS_ENV};
pub use controller::{
    ExecutionController, ExecutionPhase, ExecutionState, RunEvent, RunEventKind, RunId, RunToken,
    StartOutcome, CANCELLED_NOTE, ERROR_PREFIX,
};
pub use decode::ChunkDecoder;
pub use error::{ConfigError, FailureKind, TransportError};
pub use location::LocationContext;
pub use registry::{resolve, speedtest_url, Endpoint, Invocation};
pub use transport::{send, ByteStream, HttpSettings, HttpTransport, StreamOutcome, Transport};

//! Services used by the HTTP handlers

pub mod inference;
pub mod interpreter;
pub mod password;
pub mod rate_limit;
pub mod sessions;
pub mod totp;

pub use inference::{InferenceBackend, InferenceError, InferenceRequest, MockInference, Payload, RemoteInference};
pub use rate_limit::RateLimiters;
pub use sessions::{SessionInfo, SessionRegistry};

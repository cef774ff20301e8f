//! # Iris Common Library
//!
//! Shared code for the Iris deepfake-detection server and client:
//! - API request/response types for every `/api` endpoint
//! - Content types, verdicts and the analysis result union
//! - Model catalog
//! - Configuration loading
//! - Event bus used by the client state machines
//! - Form checks shared by server and client

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod validation;

pub use analysis::{AnalysisResult, ContentType, TextFields, Verdict};
pub use error::{Error, Result};

//! API module for the shared HTTP contract
//!
//! Request and response bodies for every `/api` endpoint, used by the
//! `iris-api` server to answer and by `iris-client` to decode.
//!
//! # Design Principle
//!
//! This module contains ONLY serde types and small pure helpers.
//! No HTTP framework dependencies (axum, reqwest) - those live in the
//! server and client crates.

pub mod types;

pub use types::{
    ArticleDetail, ArticleSummary, ErrorResponse, HealthResponse, HistoryEntry, InterpretRequest,
    InterpretResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    RegisterResponse, UserResponse, VerifyOtpRequest,
};

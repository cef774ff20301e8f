//! # Iris Client
//!
//! Front-end core for the Iris deepfake-detection app, independent of any
//! UI toolkit:
//! - Session store and the login / OTP / lockout state machine
//! - Registration with password strength and authenticator setup
//! - Upload / analyze pipeline and the pure result renderer
//! - Route table with the protected-route guard
//! - Typewriter reveal and the Guide learning module
//! - reqwest backend for the `/api` endpoints
//!
//! Every component talks to the server through the traits in [`backend`],
//! so the state machines can be driven against a scripted backend in tests.

pub mod analyze;
pub mod auth_flow;
pub mod backend;
pub mod config;
pub mod error;
pub mod guide;
pub mod http;
pub mod lockout;
pub mod navigation;
pub mod otp_input;
pub mod register;
pub mod render;
pub mod session;
pub mod typewriter;

pub use analyze::{AnalyzePipeline, Progress};
pub use auth_flow::{AuthFlow, AuthState, Lockout, OtpChallenge};
pub use backend::{
    AnalysisBackend, AnalysisSubmission, AuthBackend, ContentBackend, SubmissionPayload, UploadFile,
};
pub use config::{ApiUrls, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use lockout::{LockoutHandle, LockoutTimer};
pub use navigation::{Location, NavigationGuard, Navigator, Route};
pub use render::ResultView;
pub use session::{Session, SessionStore, User};

//! Skyport OAuth authorization library
//!
//! Turns user consent or a stored refresh token into a usable
//! [`Credential`], and owns everything around that credential: the shared
//! session holder operations read from, and the on-disk persistence that
//! lets later sessions re-authorize silently.
//!
//! Credential flow:
//! 1. An operation finds no usable credential and starts an [`AuthFlow`]
//! 2. The flow either presents consent (via the [`ConsentUi`] seam) and
//!    exchanges the returned authorization code, or silently exchanges a
//!    stored refresh token; one token-endpoint call either way
//! 3. The issued [`Credential`] is published through [`SessionHolder`]
//!    and optionally persisted via [`CredentialFile`]
//!
//! The flow itself is a pure state machine (`flow::handle_event`) with a
//! thin async driver; all I/O goes through the transport and consent
//! seams, so the whole sequence is testable with scripted collaborators.

pub mod authorize;
pub mod config;
pub mod consent;
pub mod credential;
pub mod error;
pub mod flow;
pub mod session;
pub mod store;
pub mod token;

pub use authorize::{build_authorization_url, generate_state_token};
pub use config::AuthConfig;
pub use consent::{ConsentOutcome, ConsentRequest, ConsentUi};
pub use credential::{Credential, now_millis};
pub use error::{AuthError, Result};
pub use flow::AuthFlow;
pub use session::SessionHolder;
pub use store::CredentialFile;
pub use token::{Grant, TokenResponse};

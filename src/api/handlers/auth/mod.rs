//! Auth handlers and supporting modules.
//!
//! Registration derives a salted credential entry; login verifies it and
//! establishes a server-side session whose token travels in the
//! `photoshare_session` cookie (or a bearer header). The session gate in
//! [`gate`] decides, per request, whether a session is required.
//!
//! Login failures never reveal whether the login name exists: unknown names
//! and wrong passwords produce the same 401 body.

pub mod gate;
pub mod login;
pub mod principal;
pub mod register;
pub(crate) mod session;
mod state;
pub mod types;

pub use gate::{GateDecision, GateState, SessionGate};
pub use principal::Principal;
pub use state::{AuthConfig, AuthState};

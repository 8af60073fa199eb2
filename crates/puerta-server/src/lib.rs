//! HTTP service for puerta.
//!
//! | Route | Caller | Does |
//! |-------|--------|------|
//! | `POST /api/login` | anyone | password login, sets the `_puerta` cookie |
//! | `POST /api/logout` | logged in | ends the session, clears the cookie |
//! | `POST /api/rex` | logged in | policy, second factor, opens the door |
//! | `POST /api/webauthn/register` | logged in, 2FA | stores a new authenticator |
//! | `GET /api/log` | admin | recent entry attempts |
//!
//! Pending WebAuthn challenges live in a short-lived `tower-sessions`
//! session (cookie `_rex`) stored in its own table of the main database and
//! swept when it expires.

pub mod app;
pub mod browser_session;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use app::{router, serve};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

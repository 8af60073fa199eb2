//! HTTP handlers, one module per API area.

pub mod auth;
pub mod log;
pub mod rex;
pub mod webauthn;

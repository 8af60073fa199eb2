//! Shared constants for the puerta door-access service.
//!
//! Values here are part of the externally observable contract (cookie and
//! header names, ephemeral storage keys) or the default timing budget of the
//! door adapters. Changing them breaks clients that already speak to a
//! running instance.
//!
//! # Usage
//!
//! ```
//! use puerta_core::constants::*;
//!
//! assert_eq!(SESSION_COOKIE, "_puerta");
//! assert_eq!(SESSION_TOKEN_LENGTH, 32);
//!
//! use std::time::Duration;
//! let hold = Duration::from_millis(DEFAULT_HOLD_MS);
//! assert_eq!(hold.as_secs(), 4);
//! ```

// ============================================================================
// Login sessions
// ============================================================================

/// Name of the cookie carrying the login session token.
pub const SESSION_COOKIE: &str = "_puerta";

/// Number of characters in a login session token.
pub const SESSION_TOKEN_LENGTH: usize = 32;

/// Alphabet tokens are drawn from.
///
/// 62 symbols, so a 6-bit draw is rejected when it lands on 62 or 63.
pub const SESSION_TOKEN_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Session TTL granted to users that do not configure their own.
pub const DEFAULT_SESSION_TTL: &str = "30d";

// ============================================================================
// Second factor
// ============================================================================

/// Lifetime of a pending WebAuthn challenge, in seconds.
pub const CHALLENGE_TTL_SECS: u64 = 5 * 60;

/// Ephemeral storage key for a pending registration challenge.
pub const REGISTER_CHALLENGE_KEY: &str = "wan-register";

/// Ephemeral storage key for a pending step-up login challenge.
pub const LOGIN_CHALLENGE_KEY: &str = "wan-auth";

/// Request/response header carrying WebAuthn payloads.
pub const WEBAUTHN_HEADER: &str = "webauthn";

// ============================================================================
// Door timing
// ============================================================================

/// Per-call network timeout for door adapters, in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// How long a door stays open before it is re-closed, in milliseconds.
pub const DEFAULT_HOLD_MS: u64 = 4_000;

/// Upper bound for a full open, hold and relock cycle, in milliseconds.
///
/// Two adapter calls plus the hold, with a margin. The door controller
/// stops waiting for the relock signal after this long.
pub const DEFAULT_MAX_CYCLE_MS: u64 = 2 * DEFAULT_CALL_TIMEOUT_MS + DEFAULT_HOLD_MS + 1_000;

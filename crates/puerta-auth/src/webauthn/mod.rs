//! WebAuthn second factor.
//!
//! Users flagged with `require_2fa` must confirm each entry request with an
//! enrolled authenticator. The exchange spans two HTTP requests, and the
//! server side of it is a small state machine per flow:
//!
//! ```text
//! (none) --begin--> AwaitingResponse --finish--> (consumed)
//! ```
//!
//! The `AwaitingResponse` state is serialized into the caller's
//! [`EphemeralStore`](crate::ephemeral::EphemeralStore) under a per-flow key
//! and popped on finish, so a challenge can be answered once at most.
//!
//! - [`RelyingParty`]: the cryptographic side, implemented over `webauthn-rs`
//! - [`SecondFactor`]: the flows and the [`SecondFactor::enforce`] gate

mod flow;
mod relying_party;
mod second_factor;

pub use flow::{ChallengeIssued, FlowKind, FlowState, GateOutcome};
pub use relying_party::{NewCredential, PendingChallenge, RelyingParty, WebauthnRelyingParty};
pub use second_factor::SecondFactor;

//! Domain primitives shared by every puerta crate.
//!
//! - [`Ttl`]: session lifetimes with `d`, `w` and `M` shorthand
//! - [`Schedule`]: day-of-week and hour-of-day windows
//! - [`AccessWindow`] and [`AccessPolicy`]: the expiry and schedule check
//!   run before any door is opened

pub mod constants;
pub mod error;
pub mod policy;
pub mod schedule;
pub mod ttl;

pub use error::{Error, Result};
pub use policy::{AccessPolicy, AccessWindow, Denial};
pub use schedule::{DayRange, HourRange, Schedule};
pub use ttl::Ttl;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

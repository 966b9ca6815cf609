//! Notekeep token module
//!
//! Stateless HS256 bearer tokens shared by the auth and notes services.
//! A `TokenManager` is a pure function of its secret and its clock: it never
//! performs I/O and holds no per-token state.

pub mod claims;
pub mod clock;
pub mod error;
pub mod manager;

pub use claims::{TokenKind, TokenPair};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TokenError;
pub use manager::{TokenConfig, TokenManager};

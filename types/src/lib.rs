//! Fundamental types for the Agora governance protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account identifiers, proposal ids, timestamps and the clock abstraction, and the
//! governable protocol parameters.

pub mod address;
pub mod error;
pub mod id;
pub mod params;
pub mod time;

pub use address::AccountId;
pub use error::{ErrorKind, TypeError};
pub use id::ProposalId;
pub use params::{apply_bps, ProtocolParams, BPS_DENOMINATOR};
pub use time::{Clock, SystemClock, Timestamp};

//! `ori-core`: shared primitives for the ORI admin client.
//!
//! This crate contains **pure** building blocks (no network, no disk).

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use id::{AgreementCode, InstitutionCode, UserId};

//! Core types for specdeck
//!
//! This crate contains the domain types shared across all other crates:
//! spec configuration, the host registry, extracted operations, and the
//! portal-wide error enum.

mod config;
mod error;
mod ops;
mod registry;

pub use config::*;
pub use error::*;
pub use ops::*;
pub use registry::*;

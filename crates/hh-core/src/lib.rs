//! # hh-core
//!
//! Shared building blocks for hh-yields: the error taxonomy used by every crate
//! and [`PhysicalValue`], the value-with-uncertainty type that all yield and
//! transfer-factor arithmetic goes through.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::PhysicalValue;

/// hh-yields version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! alicat-core: Core traits, types, and error definitions for alicat.
//!
//! This crate defines the instrument-agnostic abstractions shared by the
//! line-protocol engine, the transports, and the instrument driver.
//! Applications can depend on these types without pulling in a serial port
//! implementation.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`UnitId`] -- address of one device on a shared serial line
//! - [`InstrumentKind`] -- flow or pressure command dialect
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use alicat_core::*`.
pub use error::{Error, Result};
pub use transport::Transport;
pub use types::*;

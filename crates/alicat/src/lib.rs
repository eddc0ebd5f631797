//! Driver for Alicat-style gas flow and pressure instruments.
//!
//! Instruments speak a carriage-return terminated ASCII protocol on a shared
//! serial line, each addressed by a short unit id. This crate provides:
//!
//! - **Command builders** ([`commands`]) -- the exact bytes for every
//!   operation, with the flow/pressure differences captured in a
//!   [`CommandSet`](commands::CommandSet).
//! - **Model definitions** ([`models`]) -- flow and pressure instrument
//!   families and their factory serial settings.
//! - **Session** ([`instrument`]) -- request/response, polling, and
//!   streaming over one transport, driven by the `alicat-text-io` engine.
//! - **Builder** ([`builder`]) -- fluent construction with defaults.
//!
//! # Example
//!
//! ```
//! use alicat::commands::{cmd_change_gas, FLOW_COMMANDS};
//! use alicat_core::UnitId;
//!
//! let unit = UnitId::new("A").unwrap();
//! assert_eq!(cmd_change_gas(&unit, 8), b"AG 8\r");
//! assert_eq!(FLOW_COMMANDS.stop_stream(&unit), b"@@ A\r");
//! ```

pub mod builder;
pub mod commands;
pub mod instrument;
pub mod models;

// Re-export the primary types for ergonomic `use alicat::*`.
pub use builder::InstrumentBuilder;
pub use commands::{Command, CommandSet, UnitSetting};
pub use instrument::Instrument;
pub use models::InstrumentModel;

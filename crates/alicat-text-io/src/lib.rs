//! Shared line-protocol engine for carriage-return terminated instruments.
//!
//! One [`Engine`] owns the transport of a session exclusively and runs at
//! most one exchange at a time: either a single request awaiting its
//! response, or a streaming session forwarding every line. Both take
//! `&mut Engine`, so the borrow checker keeps them from overlapping on the
//! same byte stream.
//!
//! # Architecture
//!
//! - [`reader`] -- accumulates raw bytes into `\r`-terminated lines
//! - [`matcher`] -- decides whether a line answers the pending request
//! - [`engine`] -- send → wait → match → resend-or-give-up state machine
//! - [`stream`] -- long-lived forwarding of unsolicited lines

pub mod engine;
pub mod matcher;
pub mod reader;
pub mod stream;

pub use engine::{Engine, EngineConfig, EngineState, Outcome, PendingRequest, RetryPolicy};
pub use matcher::{Expectation, matches};
pub use reader::LineReader;
pub use stream::LineStream;

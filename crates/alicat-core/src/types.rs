//! Core types used throughout alicat.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Address of one device on a shared (multidrop) serial line.
///
/// Usually a single letter (`"A"` through `"Z"`), but any non-empty run of
/// printable, non-whitespace ASCII is accepted. Whitespace and control
/// characters are rejected because they would split or terminate the
/// command line on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitId(String);

impl UnitId {
    /// Validate and wrap a unit identifier.
    ///
    /// # Example
    ///
    /// ```
    /// use alicat_core::UnitId;
    ///
    /// let unit = UnitId::new("A").unwrap();
    /// assert_eq!(unit.as_str(), "A");
    /// assert!(UnitId::new("").is_err());
    /// assert!(UnitId::new("A\r").is_err());
    /// ```
    pub fn new(id: &str) -> Result<Self, Error> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidUnitId(id.to_string()));
        }
        Ok(UnitId(id.to_string()))
    }

    /// The identifier as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UnitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitId::new(s)
    }
}

impl TryFrom<&str> for UnitId {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        UnitId::new(s)
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which command dialect an instrument speaks.
///
/// Flow and pressure instruments share most of the ASCII grammar; they
/// differ in the streaming and tare commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Mass or volumetric flow meter/controller.
    Flow,
    /// Pressure gauge/controller.
    Pressure,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstrumentKind::Flow => "flow",
            InstrumentKind::Pressure => "pressure",
        };
        write!(f, "{s}")
    }
}

impl FromStr for InstrumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flow" => Ok(InstrumentKind::Flow),
            "pressure" => Ok(InstrumentKind::Pressure),
            _ => Err(Error::InvalidParameter(format!(
                "unknown instrument kind: {s}"
            ))),
        }
    }
}

/// Static information about a connected instrument session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    /// Command dialect.
    pub kind: InstrumentKind,
    /// Human-readable model name.
    pub model_name: String,
    /// Baud rate the session was opened at (recorded, never renegotiated).
    pub baud_rate: u32,
}

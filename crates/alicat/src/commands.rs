//! Alicat ASCII command builders.
//!
//! Every command is a single line: the unit identifier, a command body and
//! a `\r` terminator. Flow and pressure instruments share most commands;
//! the few that differ (streaming, tare) are captured in a [`CommandSet`].
//!
//! All functions are pure -- they produce byte vectors without performing
//! any I/O. A validated [`UnitId`] cannot contain whitespace or control
//! characters, so encoding never fails.
//!
//! # Command reference
//!
//! | Command            | Flow           | Pressure        |
//! |--------------------|----------------|-----------------|
//! | start streaming    | `A@ @`         | `A@=@`          |
//! | stop streaming     | `@@ A`         | `@@=A`          |
//! | poll               | `A`            | `A`             |
//! | tare               | `AV`           | `APC`           |
//! | list gases         | `A??G*`        | `A??G*`         |
//! | change gas         | `AG 8`         | `AG 8`          |
//! | lock / unlock      | `AL` / `AU`    | `AL` / `AU`     |
//! | set units          | `ADCU 5 1 7 0` | `ADCU 5 1 7 0`  |
//! | static unit value  | `ADCU 69`      | `ADCU 69`       |
//! | baud rate          | `ANCB 19200`   | `ANCB 19200`    |
//! | change unit id     | `A@ B`         | `A@ B`          |

use std::fmt;

use bytes::{BufMut, BytesMut};

use alicat_core::{InstrumentKind, UnitId};

/// Command terminator byte.
pub const TERMINATOR: u8 = b'\r';

/// Statistic queried by [`cmd_query_static_unit_value`].
pub const STATIC_UNIT_STATISTIC: u32 = 69;

/// Encode a command line: `prefix`, `body`, then the terminator.
///
/// # Example
///
/// ```
/// use alicat::commands::encode_command;
///
/// assert_eq!(encode_command("A", ""), b"A\r");
/// assert_eq!(encode_command("A", "G 8"), b"AG 8\r");
/// ```
pub fn encode_command(prefix: &str, body: &str) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(prefix.len() + body.len() + 1);
    buf.put_slice(prefix.as_bytes());
    buf.put_slice(body.as_bytes());
    buf.put_u8(TERMINATOR);
    buf.to_vec()
}

// ---------------------------------------------------------------
// Per-instrument command table
// ---------------------------------------------------------------

/// The command bodies that differ between flow and pressure instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSet {
    /// Body appended to the unit id to start streaming.
    pub start_stream: &'static str,
    /// Prefix placed before the unit id to stop streaming.
    pub stop_stream: &'static str,
    /// Body appended to the unit id to tare.
    pub tare: &'static str,
}

/// Commands understood by mass flow meters and controllers.
pub const FLOW_COMMANDS: CommandSet = CommandSet {
    start_stream: "@ @",
    stop_stream: "@@ ",
    tare: "V",
};

/// Commands understood by pressure gauges and controllers.
pub const PRESSURE_COMMANDS: CommandSet = CommandSet {
    start_stream: "@=@",
    stop_stream: "@@=",
    tare: "PC",
};

impl CommandSet {
    /// The command table for an instrument kind.
    pub fn for_kind(kind: InstrumentKind) -> CommandSet {
        match kind {
            InstrumentKind::Flow => FLOW_COMMANDS,
            InstrumentKind::Pressure => PRESSURE_COMMANDS,
        }
    }

    /// Build a "start streaming" command (`A@ @` or `A@=@`).
    pub fn start_stream(&self, unit: &UnitId) -> Vec<u8> {
        encode_command(unit.as_str(), self.start_stream)
    }

    /// Build a "stop streaming" command (`@@ A` or `@@=A`).
    ///
    /// Unlike every other command the unit id comes last: the instrument
    /// is addressed while it is talking over the line.
    pub fn stop_stream(&self, unit: &UnitId) -> Vec<u8> {
        encode_command(self.stop_stream, unit.as_str())
    }

    /// Build a "tare" command (`AV` or `APC`).
    pub fn tare(&self, unit: &UnitId) -> Vec<u8> {
        encode_command(unit.as_str(), self.tare)
    }

    /// Encode any [`Command`] for this instrument kind.
    ///
    /// # Example
    ///
    /// ```
    /// use alicat::commands::{Command, FLOW_COMMANDS, PRESSURE_COMMANDS};
    /// use alicat_core::UnitId;
    ///
    /// let unit = UnitId::new("A").unwrap();
    /// assert_eq!(FLOW_COMMANDS.encode(&unit, &Command::Tare), b"AV\r");
    /// assert_eq!(PRESSURE_COMMANDS.encode(&unit, &Command::Tare), b"APC\r");
    /// ```
    pub fn encode(&self, unit: &UnitId, command: &Command) -> Vec<u8> {
        match command {
            Command::StartStream => self.start_stream(unit),
            Command::StopStream => self.stop_stream(unit),
            Command::Poll => cmd_poll(unit),
            Command::Tare => self.tare(unit),
            Command::AvailableGases => cmd_available_gases(unit),
            Command::ChangeGas(gas) => cmd_change_gas(unit, *gas),
            Command::LockDisplay => cmd_lock_display(unit),
            Command::UnlockDisplay => cmd_unlock_display(unit),
            Command::SetUnits(setting) => cmd_set_units(unit, setting),
            Command::QueryStaticUnitValue => cmd_query_static_unit_value(unit),
            Command::SetBaudRate(baud) => cmd_set_baud_rate(unit, *baud),
            Command::ChangeUnitId(new_unit) => cmd_change_unit_id(unit, new_unit),
        }
    }
}

/// Every operation an instrument accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartStream,
    StopStream,
    Poll,
    Tare,
    AvailableGases,
    ChangeGas(u32),
    LockDisplay,
    UnlockDisplay,
    SetUnits(UnitSetting),
    QueryStaticUnitValue,
    SetBaudRate(u32),
    ChangeUnitId(UnitId),
}

impl Command {
    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartStream => "start_stream",
            Command::StopStream => "stop_stream",
            Command::Poll => "poll",
            Command::Tare => "tare",
            Command::AvailableGases => "available_gases",
            Command::ChangeGas(_) => "change_gas",
            Command::LockDisplay => "lock_display",
            Command::UnlockDisplay => "unlock_display",
            Command::SetUnits(_) => "set_units",
            Command::QueryStaticUnitValue => "query_static_unit_value",
            Command::SetBaudRate(_) => "set_baud_rate",
            Command::ChangeUnitId(_) => "change_unit_id",
        }
    }
}

// ---------------------------------------------------------------
// Engineering units
// ---------------------------------------------------------------

/// Payload of the `DCU` set-units command.
///
/// `group` and `override_flag` default to `1` and `0`, which apply the
/// unit to the statistic's whole group without overriding per-statistic
/// settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSetting {
    /// Statistic whose engineering unit is changed.
    pub static_value: u32,
    /// Engineering unit code.
    pub unit_value: u32,
    pub group: u8,
    pub override_flag: u8,
}

impl UnitSetting {
    pub fn new(static_value: u32, unit_value: u32) -> Self {
        UnitSetting {
            static_value,
            unit_value,
            group: 1,
            override_flag: 0,
        }
    }

    pub fn group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    pub fn override_flag(mut self, flag: u8) -> Self {
        self.override_flag = flag;
        self
    }
}

impl fmt::Display for UnitSetting {
    /// Wire order: statistic, group, unit, override.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.static_value, self.group, self.unit_value, self.override_flag
        )
    }
}

// ---------------------------------------------------------------
// Shared command builders
// ---------------------------------------------------------------

/// Build a "poll" command (`A`).
///
/// ```
/// use alicat::commands::cmd_poll;
/// use alicat_core::UnitId;
///
/// assert_eq!(cmd_poll(&UnitId::new("A").unwrap()), b"A\r");
/// ```
pub fn cmd_poll(unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), "")
}

/// Build a "list available gases" command (`A??G*`).
pub fn cmd_available_gases(unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), "??G*")
}

/// Build a "change gas" command (`AG {gas}`).
pub fn cmd_change_gas(unit: &UnitId, gas: u32) -> Vec<u8> {
    encode_command(unit.as_str(), &format!("G {gas}"))
}

/// Build a "lock front panel" command (`AL`).
pub fn cmd_lock_display(unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), "L")
}

/// Build an "unlock front panel" command (`AU`).
pub fn cmd_unlock_display(unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), "U")
}

/// Build a "set engineering units" command (`ADCU {static} {group} {unit} {override}`).
///
/// ```
/// use alicat::commands::{cmd_set_units, UnitSetting};
/// use alicat_core::UnitId;
///
/// let unit = UnitId::new("A").unwrap();
/// assert_eq!(cmd_set_units(&unit, &UnitSetting::new(5, 7)), b"ADCU 5 1 7 0\r");
/// ```
pub fn cmd_set_units(unit: &UnitId, setting: &UnitSetting) -> Vec<u8> {
    encode_command(unit.as_str(), &format!("DCU {setting}"))
}

/// Build a "query static unit value" command (`ADCU 69`).
pub fn cmd_query_static_unit_value(unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), &format!("DCU {STATIC_UNIT_STATISTIC}"))
}

/// Build a "set baud rate" command (`ANCB {baud}`).
///
/// Takes effect on the instrument only; the host port keeps its rate.
pub fn cmd_set_baud_rate(unit: &UnitId, baud: u32) -> Vec<u8> {
    encode_command(unit.as_str(), &format!("NCB {baud}"))
}

/// Build a "change unit id" command (`A@ {new}`).
pub fn cmd_change_unit_id(unit: &UnitId, new_unit: &UnitId) -> Vec<u8> {
    encode_command(unit.as_str(), &format!("@ {new_unit}"))
}

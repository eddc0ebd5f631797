//! Alicat instrument model definitions.
//!
//! The command dialect is the only thing that differs between instrument
//! families, so a model is little more than a name, a kind and its
//! [`CommandSet`]. Baud rate is configurable on the instrument; the default
//! here is the factory setting.
//!
//! | Model          | Kind     | Baud  |
//! |----------------|----------|-------|
//! | Flow meter     | Flow     | 19200 |
//! | Pressure meter | Pressure | 19200 |

use alicat_core::InstrumentKind;

use crate::commands::{CommandSet, FLOW_COMMANDS, PRESSURE_COMMANDS};

/// Static description of an instrument family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentModel {
    /// Human-readable model name.
    pub name: &'static str,
    pub kind: InstrumentKind,
    /// Factory serial baud rate.
    pub default_baud_rate: u32,
    pub commands: CommandSet,
}

/// Mass flow meters and controllers.
pub fn flow_meter() -> InstrumentModel {
    InstrumentModel {
        name: "Flow meter",
        kind: InstrumentKind::Flow,
        default_baud_rate: 19200,
        commands: FLOW_COMMANDS,
    }
}

/// Pressure gauges and controllers.
pub fn pressure_meter() -> InstrumentModel {
    InstrumentModel {
        name: "Pressure meter",
        kind: InstrumentKind::Pressure,
        default_baud_rate: 19200,
        commands: PRESSURE_COMMANDS,
    }
}

/// The model for an instrument kind.
pub fn model_for(kind: InstrumentKind) -> InstrumentModel {
    match kind {
        InstrumentKind::Flow => flow_meter(),
        InstrumentKind::Pressure => pressure_meter(),
    }
}

/// All supported models.
pub fn all_models() -> Vec<InstrumentModel> {
    vec![flow_meter(), pressure_meter()]
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable door position, used both as a target and as a classification label.
///
/// Wire codes follow the automation framework's target characteristic:
/// `0` is open, `1` is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorPosition {
    Open,
    Closed,
}

impl DoorPosition {
    pub fn code(self) -> u8 {
        match self {
            DoorPosition::Open => 0,
            DoorPosition::Closed => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DoorPosition::Open),
            1 => Some(DoorPosition::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoorPosition::Open => "open",
            DoorPosition::Closed => "closed",
        }
    }
}

impl fmt::Display for DoorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current door state as reported to the automation framework (codes 0–4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
    Stopped,
}

impl DoorState {
    pub fn code(self) -> u8 {
        match self {
            DoorState::Open => 0,
            DoorState::Closed => 1,
            DoorState::Opening => 2,
            DoorState::Closing => 3,
            DoorState::Stopped => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DoorState::Open),
            1 => Some(DoorState::Closed),
            2 => Some(DoorState::Opening),
            3 => Some(DoorState::Closing),
            4 => Some(DoorState::Stopped),
            _ => None,
        }
    }

    /// The stable position this state represents, if it is not in motion or stopped
    pub fn stable_position(self) -> Option<DoorPosition> {
        match self {
            DoorState::Open => Some(DoorPosition::Open),
            DoorState::Closed => Some(DoorPosition::Closed),
            DoorState::Opening | DoorState::Closing | DoorState::Stopped => None,
        }
    }

    /// Transitional state used while moving toward `target`
    pub fn moving_toward(target: DoorPosition) -> Self {
        match target {
            DoorPosition::Open => DoorState::Opening,
            DoorPosition::Closed => DoorState::Closing,
        }
    }

    pub fn is_transitional(self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }

    /// Whether this state already satisfies or is converging on `target`
    pub fn settles_on(self, target: DoorPosition) -> bool {
        self == DoorState::from(target) || self == DoorState::moving_toward(target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
            DoorState::Stopped => "stopped",
        }
    }
}

impl From<DoorPosition> for DoorState {
    fn from(position: DoorPosition) -> Self {
        match position {
            DoorPosition::Open => DoorState::Open,
            DoorPosition::Closed => DoorState::Closed,
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::error::EncodingError;

/// A relay board on the I2C bus.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Board {
    Board1,
    Board2,
}

impl Board {
    pub const ALL: [Board; 2] = [Board::Board1, Board::Board2];

    pub fn address(&self) -> u8 {
        match self {
            Board::Board1 => 0x10,
            Board::Board2 => 0x11,
        }
    }

    /// Resolves the 1-based board number used by the control API.
    pub fn from_number(number: u8) -> Result<Board, EncodingError> {
        match number {
            1 => Ok(Board::Board1),
            2 => Ok(Board::Board2),
            unknown => Err(EncodingError::BoardNumber(unknown)),
        }
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Board::Board1 => write!(f, "BOARD_1"),
            Board::Board2 => write!(f, "BOARD_2"),
        }
    }
}

/// A relay channel, identical on every board.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relay {
    Relay1,
    Relay2,
    Relay3,
    Relay4,
}

impl Relay {
    pub const ALL: [Relay; 4] = [Relay::Relay1, Relay::Relay2, Relay::Relay3, Relay::Relay4];

    pub fn channel(&self) -> u8 {
        match self {
            Relay::Relay1 => 0x01,
            Relay::Relay2 => 0x02,
            Relay::Relay3 => 0x03,
            Relay::Relay4 => 0x04,
        }
    }

    pub fn from_number(number: u8) -> Result<Relay, EncodingError> {
        match number {
            1 => Ok(Relay::Relay1),
            2 => Ok(Relay::Relay2),
            3 => Ok(Relay::Relay3),
            4 => Ok(Relay::Relay4),
            unknown => Err(EncodingError::RelayNumber(unknown)),
        }
    }
}

impl Display for Relay {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Relay::Relay1 => write!(f, "RELAY_1"),
            Relay::Relay2 => write!(f, "RELAY_2"),
            Relay::Relay3 => write!(f, "RELAY_3"),
            Relay::Relay4 => write!(f, "RELAY_4"),
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn value(&self) -> u8 {
        match self {
            RelayState::On => 0xFF,
            RelayState::Off => 0x00,
        }
    }

    pub fn from_name(name: &str) -> Result<RelayState, EncodingError> {
        match name.to_ascii_lowercase().as_str() {
            "on" | "1" => Ok(RelayState::On),
            "off" | "0" => Ok(RelayState::Off),
            _ => Err(EncodingError::StateName(name.to_string())),
        }
    }
}

impl Display for RelayState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RelayState::On => write!(f, "STATE_ON"),
            RelayState::Off => write!(f, "STATE_OFF"),
        }
    }
}

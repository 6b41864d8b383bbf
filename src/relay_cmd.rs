use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::hw_types::Board;
use crate::hw_types::Relay;
use crate::hw_types::RelayState;

/// One relay write, ready to be put on the bus.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct RelayCommand {
    pub board: Board,
    pub relay: Relay,
    pub state: RelayState,
}

impl RelayCommand {
    pub fn bytes(&self) -> [u8; 3] {
        [
            self.board.address(),
            self.relay.channel(),
            self.state.value(),
        ]
    }

    /// The three `0xHH` tokens passed to the bus-write program.
    pub fn args(&self) -> [String; 3] {
        self.bytes().map(to_hex)
    }

    /// Human readable target used in logs and error reports.
    pub fn target(&self) -> String {
        format!("{} on {} to {}", self.relay, self.board, self.state)
    }
}

impl Display for RelayCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.args().join(" "))
    }
}

pub fn encode(board: Board, relay: Relay, state: RelayState) -> RelayCommand {
    RelayCommand {
        board,
        relay,
        state,
    }
}

fn to_hex(value: u8) -> String {
    format!("0x{:02X}", value)
}

use std::collections::BTreeMap;
use std::time::Duration;

use log::error;
use log::info;
use log::warn;

use crate::channel::Channel;
use crate::error::DriverError;
use crate::error::EventError;
use crate::hw_types::Board;
use crate::hw_types::Relay;
use crate::hw_types::RelayState;
use crate::led_cmd::LedCommand;
use crate::relay_bus::RelayBus;
use crate::relay_cmd::encode;
use crate::relay_cmd::RelayCommand;
use crate::serial::SerialLink;

struct RelayChannel {
    bus: Box<dyn RelayBus>,
    // None until the first successful write, or after a failed one.
    commanded: BTreeMap<(Board, Relay), Option<RelayState>>,
}

impl RelayChannel {
    fn write(&mut self, command: &RelayCommand) -> Result<(), DriverError> {
        let result = self.bus.apply(command);
        let key = (command.board, command.relay);
        match &result {
            Ok(()) => {
                self.commanded.insert(key, Some(command.state));
                info!("{} with command: {}", command.target(), command);
            }
            Err(e) => {
                self.commanded.insert(key, None);
                error!("Error while setting {}: {}", command.target(), e);
            }
        }
        result
    }
}

struct LedChannel {
    link: Option<Box<dyn SerialLink>>,
    last_sent: Option<LedCommand>,
}

/// Single entry point for everything that drives the booth hardware.
///
/// Relay writes and LED writes go through separate channels, so they never
/// wait on each other, but two writes on the same channel are always applied
/// one after the other in the order the calls arrived.
pub struct EventManager {
    relays: Channel<RelayChannel>,
    leds: Channel<LedChannel>,
}

impl EventManager {
    /// `serial` is `None` when the LED controller could not be opened; LED
    /// commands then fail while relays keep working.
    pub fn new(
        bus: Box<dyn RelayBus>,
        serial: Option<Box<dyn SerialLink>>,
        channel_wait: Duration,
    ) -> EventManager {
        if serial.is_none() {
            warn!("No serial link to the LED controller, LED commands will fail");
        }
        let commanded = Board::ALL
            .into_iter()
            .flat_map(|b| Relay::ALL.into_iter().map(move |r| ((b, r), None)))
            .collect();
        EventManager {
            relays: Channel::new("relay", RelayChannel { bus, commanded }, channel_wait),
            leds: Channel::new(
                "serial",
                LedChannel {
                    link: serial,
                    last_sent: None,
                },
                channel_wait,
            ),
        }
    }

    pub fn set_all_off(&self) -> Result<(), EventError> {
        self.set_relays(&Board::ALL, &Relay::ALL, RelayState::Off)
    }

    pub fn set_relay(&self, board: Board, relay: Relay, state: RelayState) -> Result<(), EventError> {
        let command = encode(board, relay, state);
        let mut channel = self.relays.acquire()?;
        channel
            .write(&command)
            .map_err(|source| EventError::Driver {
                target: command.target(),
                source,
            })
    }

    /// Applies `state` to every board/relay pair, board by board.
    ///
    /// The bus stays reserved for the whole sweep. A failing write does not
    /// stop the sweep; all failures are collected into one error.
    pub fn set_relays(
        &self,
        boards: &[Board],
        relays: &[Relay],
        state: RelayState,
    ) -> Result<(), EventError> {
        let mut channel = self.relays.acquire()?;
        let mut failures = Vec::new();
        let mut attempted = 0;

        for &board in boards {
            for &relay in relays {
                let command = encode(board, relay, state);
                attempted += 1;
                if let Err(e) = channel.write(&command) {
                    failures.push((command.target(), e));
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        error!(
            "{} of {} relay writes failed while setting {}",
            failures.len(),
            attempted,
            state
        );
        Err(EventError::Sweep {
            attempted,
            failures,
        })
    }

    pub fn send_serial_command(&self, command: &LedCommand) -> Result<(), EventError> {
        let mut channel = self.leds.acquire()?;
        let result = match channel.link.as_mut() {
            Some(link) => link.send(&command.encode()),
            None => Err(DriverError::NotConnected),
        };

        match result {
            Ok(()) => {
                info!("LED command sent: {}", command);
                channel.last_sent = Some(*command);
                Ok(())
            }
            Err(e) => {
                error!("Error while sending LED command {}: {}", command, e);
                Err(EventError::Driver {
                    target: format!("LED command {}", command),
                    source: e,
                })
            }
        }
    }

    #[cfg(test)]
    fn commanded(&self, board: Board, relay: Relay) -> Option<RelayState> {
        self.relays
            .acquire()
            .ok()
            .and_then(|c| c.commanded.get(&(board, relay)).copied().flatten())
    }

    #[cfg(test)]
    fn last_led_command(&self) -> Option<LedCommand> {
        self.leds.acquire().ok().and_then(|c| c.last_sent)
    }
}

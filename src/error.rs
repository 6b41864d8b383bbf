use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Invalid board number '{0}'")]
    BoardNumber(u8),

    #[error("Invalid relay number '{0}'")]
    RelayNumber(u8),

    #[error("Invalid relay state '{0}'")]
    StateName(String),

    #[error("Invalid {kind} number '{value}'")]
    NotANumber { kind: &'static str, value: String },

    #[error("At least one {0} is required")]
    EmptyList(&'static str),

    #[error("Unknown LED preset '{0}'")]
    LedPreset(String),

    #[error("Unknown LED effect '{0}'")]
    LedEffect(String),

    #[error("Invalid color '{0}', expected RRGGBB")]
    Color(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Write did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Failed to open serial device '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Only {written} of {expected} bytes were written")]
    PartialWrite { written: usize, expected: usize },

    #[error("Serial link is not connected")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Outcome of one Event Manager operation that did not fully succeed.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("{target}: {source}")]
    Driver {
        target: String,
        #[source]
        source: DriverError,
    },

    #[error("{channel} channel still busy after {waited:?}")]
    ChannelUnavailable {
        channel: &'static str,
        waited: Duration,
    },

    #[error("Relay sweep of {attempted} writes incomplete: {}", describe(.failures))]
    Sweep {
        attempted: usize,
        failures: Vec<(String, DriverError)>,
    },
}

fn describe(failures: &[(String, DriverError)]) -> String {
    failures
        .iter()
        .map(|(target, e)| format!("{} failed ({})", target, e))
        .collect::<Vec<_>>()
        .join("; ")
}

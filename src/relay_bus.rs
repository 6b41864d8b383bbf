use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use log::error;
use log::info;
use log::warn;

use crate::error::DriverError;
use crate::relay_cmd::RelayCommand;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

// How long to wait for the output pipes to close once the writer has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

enum Output {
    Stdout,
    Stderr(String),
}

/// Backend that performs a single relay write on the I2C bus.
pub trait RelayBus: Send {
    fn apply(&mut self, command: &RelayCommand) -> Result<(), DriverError>;
}

/// Writes relay commands by invoking `i2cset -y <bus> <address> <channel> <value>`.
pub struct I2cSetBus {
    program: String,
    bus: u8,
    timeout: Duration,
    last_command: Option<String>,
}

impl I2cSetBus {
    pub fn new<S: Into<String>>(program: S, bus: u8, timeout: Duration) -> I2cSetBus {
        I2cSetBus {
            program: program.into(),
            bus,
            timeout,
            last_command: None,
        }
    }

    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    fn command_line(&self, command: &RelayCommand) -> String {
        format!("{} -y {} {}", self.program, self.bus, command)
    }
}

impl RelayBus for I2cSetBus {
    fn apply(&mut self, command: &RelayCommand) -> Result<(), DriverError> {
        let line = self.command_line(command);
        info!("Executing: {}", line);
        self.last_command = Some(line.clone());

        let mut child = Command::new(&self.program)
            .arg("-y")
            .arg(self.bus.to_string())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = 0;
        if let Some(out) = child.stdout.take() {
            let tx = tx.clone();
            readers += 1;
            thread::spawn(move || {
                for line in BufReader::new(out).split(b'\n').map_while(Result::ok) {
                    info!("CMD info: {}", String::from_utf8_lossy(&line));
                }
                let _ = tx.send(Output::Stdout);
            });
        }
        if let Some(mut err) = child.stderr.take() {
            let tx = tx.clone();
            readers += 1;
            thread::spawn(move || {
                let mut buf = Vec::new();
                if let Err(e) = err.read_to_end(&mut buf) {
                    error!("Failed to read error output of bus write: {}", e);
                }
                let _ = tx.send(Output::Stderr(String::from_utf8_lossy(&buf).into_owned()));
            });
        }
        drop(tx);

        let status = wait_with_timeout(&mut child, self.timeout);

        let stderr = collect_output(&rx, readers, &line);
        for line in stderr.lines() {
            error!("CMD error: {}", line);
        }

        let status = status?;
        if !status.success() {
            return Err(DriverError::ExitStatus {
                command: line,
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Waits a short grace period for the reader threads. A process that handed
/// its pipes to a still running descendant would otherwise hold the bus for
/// as long as that descendant lives; its readers are left to finish on their own.
fn collect_output(rx: &Receiver<Output>, readers: usize, line: &str) -> String {
    let deadline = Instant::now() + OUTPUT_GRACE;
    let mut stderr = String::new();
    let mut pending = readers;
    while pending > 0 {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Output::Stdout) => pending -= 1,
            Ok(Output::Stderr(text)) => {
                stderr = text;
                pending -= 1;
            }
            Err(_) => {
                warn!("Output of '{}' is still open, not waiting for it", line);
                break;
            }
        }
    }
    stderr
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, DriverError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DriverError::Io(e));
            }
        }
        if Instant::now() >= deadline {
            warn!("Bus write still running after {:?}, killing it", timeout);
            let _ = child.kill();
            let _ = child.wait();
            return Err(DriverError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

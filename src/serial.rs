use std::io;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;
use serialport::SerialPort;

use crate::error::DriverError;

/// The single connection to the LED controller.
pub trait SerialLink: Send {
    /// Writes the whole payload or fails; a partial write is an error.
    fn send(&mut self, payload: &[u8]) -> Result<(), DriverError>;
}

/// Whole-payload writes on top of any byte sink, bounded by `write_timeout`.
pub struct PortLink<P> {
    port: P,
    name: String,
    write_timeout: Duration,
}

/// The LED controller's USB serial device.
pub type TtySerialLink = PortLink<Box<dyn SerialPort>>;

impl TtySerialLink {
    pub fn open<P: AsRef<Path>>(
        path: P,
        baud: u32,
        write_timeout: Duration,
    ) -> Result<TtySerialLink, DriverError> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let port = serialport::new(name.as_str(), baud)
            .timeout(write_timeout)
            .open()
            .map_err(|source| DriverError::Open {
                path: name.clone(),
                source,
            })?;
        info!("Opened serial device {} at {} baud", name, baud);
        Ok(PortLink::new(port, name, write_timeout))
    }
}

impl<P: Write + Send> PortLink<P> {
    pub fn new<S: Into<String>>(port: P, name: S, write_timeout: Duration) -> PortLink<P> {
        PortLink {
            port,
            name: name.into(),
            write_timeout,
        }
    }

    fn partial_or_timeout(&self, written: usize, expected: usize) -> DriverError {
        if written == 0 {
            DriverError::Timeout(self.write_timeout)
        } else {
            warn!(
                "Serial write to {} stopped after {} of {} bytes",
                self.name, written, expected
            );
            DriverError::PartialWrite { written, expected }
        }
    }
}

impl<P: Write + Send> SerialLink for PortLink<P> {
    fn send(&mut self, payload: &[u8]) -> Result<(), DriverError> {
        let deadline = Instant::now() + self.write_timeout;
        let mut written = 0;

        while written < payload.len() {
            if Instant::now() >= deadline {
                return Err(self.partial_or_timeout(written, payload.len()));
            }
            match self.port.write(&payload[written..]) {
                Ok(0) => return Err(self.partial_or_timeout(written, payload.len())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(self.partial_or_timeout(written, payload.len()))
                }
                Err(_) if written > 0 => return Err(self.partial_or_timeout(written, payload.len())),
                Err(e) => return Err(DriverError::Io(e)),
            }
        }

        match self.port.flush() {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(DriverError::Timeout(self.write_timeout))
            }
            other => other?,
        }
        debug!("Wrote {} bytes to {}", written, self.name);
        Ok(())
    }
}

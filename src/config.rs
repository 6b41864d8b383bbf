use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about = "Relay and LED control for the drum booth")]
pub struct Options {
    /// Serial device of the LED strip controller
    #[arg(long, default_value = "/dev/ttyACM0")]
    pub serial_device: PathBuf,

    /// Baud rate of the LED strip controller
    #[arg(long, default_value_t = 115200)]
    pub baud: u32,

    /// I2C bus number the relay boards are attached to
    #[arg(long, default_value_t = 1)]
    pub i2c_bus: u8,

    /// Program used to write to the I2C bus
    #[arg(long, default_value = "i2cset")]
    pub i2cset: String,

    /// Address the HTTP control API listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Upper bound for a single hardware write, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub write_timeout_ms: u64,

    /// Upper bound for waiting on a busy relay or serial channel, in milliseconds
    #[arg(long, default_value_t = 10000)]
    pub channel_wait_ms: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence all log output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Options {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn channel_wait(&self) -> Duration {
        Duration::from_millis(self.channel_wait_ms)
    }

    /// stderrlog verbosity; warnings and errors are always shown, `-v` adds info.
    pub fn log_level(&self) -> usize {
        1 + self.verbose as usize
    }
}

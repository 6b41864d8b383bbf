use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use drumbooth_ctl::error::DriverError;
use drumbooth_ctl::error::EventError;
use drumbooth_ctl::hw_types::Board;
use drumbooth_ctl::hw_types::Relay;
use drumbooth_ctl::hw_types::RelayState;
use drumbooth_ctl::led_cmd::LedCommand;
use drumbooth_ctl::relay_bus::RelayBus;
use drumbooth_ctl::relay_cmd::RelayCommand;
use drumbooth_ctl::serial::SerialLink;
use drumbooth_ctl::serial::TtySerialLink;
use drumbooth_ctl::EventManager;

type Log = Arc<Mutex<Vec<String>>>;

struct Bus(Log);

impl RelayBus for Bus {
    fn apply(&mut self, command: &RelayCommand) -> Result<(), DriverError> {
        self.0.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

struct Serial(Log);

impl SerialLink for Serial {
    fn send(&mut self, payload: &[u8]) -> Result<(), DriverError> {
        self.0
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).trim_end().to_string());
        Ok(())
    }
}

#[test]
fn startup_with_missing_serial_device_keeps_relays_working() {
    let serial = TtySerialLink::open(
        "/nonexistent/ttyACM0",
        115200,
        Duration::from_millis(100),
    )
    .ok()
    .map(|link| Box::new(link) as Box<dyn SerialLink>);
    assert!(serial.is_none());

    let bus = Log::default();
    let manager = EventManager::new(Box::new(Bus(bus.clone())), serial, Duration::from_secs(1));

    manager.set_all_off().expect("relay reset");
    let err = manager
        .send_serial_command(&LedCommand::initial())
        .expect_err("no serial link");
    assert!(matches!(
        err,
        EventError::Driver {
            source: DriverError::NotConnected,
            ..
        }
    ));

    manager
        .set_relay(Board::Board1, Relay::Relay3, RelayState::On)
        .expect("relay still works");
    let bus = bus.lock().unwrap();
    assert_eq!(bus.len(), 9);
    assert_eq!(bus[8], "0x10 0x03 0xFF");
}

#[test]
fn initial_led_command_is_the_first_serial_write() {
    let bus = Log::default();
    let serial = Log::default();
    let manager = Arc::new(EventManager::new(
        Box::new(Bus(bus.clone())),
        Some(Box::new(Serial(serial.clone()))),
        Duration::from_secs(1),
    ));

    manager.set_all_off().unwrap();
    manager.send_serial_command(&LedCommand::initial()).unwrap();
    assert_eq!(*serial.lock().unwrap(), vec!["5:20:255:0:0:0:0:255"]);

    // A drum pad and the control API trigger at the same time.
    let pad = {
        let manager = manager.clone();
        thread::spawn(move || {
            manager
                .set_relays(&Board::ALL, &[Relay::Relay1], RelayState::On)
                .unwrap();
            manager
                .send_serial_command(&LedCommand::preset("blink").unwrap())
                .unwrap();
        })
    };
    manager
        .send_serial_command(&LedCommand::preset("off").unwrap())
        .unwrap();
    pad.join().unwrap();

    let serial = serial.lock().unwrap();
    assert_eq!(serial.len(), 3);
    assert_eq!(serial[0], "5:20:255:0:0:0:0:255");
    assert_eq!(bus.lock().unwrap().len(), 10);
}

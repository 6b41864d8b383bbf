pub mod channel;
pub mod config;
pub mod error;
pub mod event_manager;
pub mod hw_types;
pub mod led_cmd;
pub mod relay_bus;
pub mod relay_cmd;
pub mod serial;
pub mod web;

pub use event_manager::EventManager;

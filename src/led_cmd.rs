//! Serial commands understood by the LED strip controller.
//!
//! A command is one line of eight colon separated decimal fields:
//! `<effect>:<speed>:<r1>:<g1>:<b1>:<r2>:<g2>:<b2>`, terminated by `\n`.

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::error::EncodingError;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum LedEffect {
    AllOff,
    Static,
    Blink,
    Running,
    Fade,
    Rainbow,
}

impl LedEffect {
    pub fn id(&self) -> u8 {
        match self {
            LedEffect::AllOff => 1,
            LedEffect::Static => 2,
            LedEffect::Blink => 3,
            LedEffect::Running => 4,
            LedEffect::Fade => 5,
            LedEffect::Rainbow => 6,
        }
    }

    pub fn from_name(name: &str) -> Result<LedEffect, EncodingError> {
        match name.to_ascii_lowercase().as_str() {
            "off" | "all_off" => Ok(LedEffect::AllOff),
            "static" => Ok(LedEffect::Static),
            "blink" => Ok(LedEffect::Blink),
            "running" => Ok(LedEffect::Running),
            "fade" => Ok(LedEffect::Fade),
            "rainbow" => Ok(LedEffect::Rainbow),
            _ => Err(EncodingError::LedEffect(name.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    /// Parses `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Rgb, EncodingError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(EncodingError::Color(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| EncodingError::Color(hex.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct LedCommand {
    pub effect: LedEffect,
    pub speed: u8,
    pub color1: Rgb,
    pub color2: Rgb,
}

impl LedCommand {
    pub const PRESETS: [&'static str; 10] = [
        "initial", "off", "white", "red", "green", "blue", "blink", "running", "fade", "rainbow",
    ];

    pub fn new(effect: LedEffect, speed: u8, color1: Rgb, color2: Rgb) -> LedCommand {
        LedCommand {
            effect,
            speed,
            color1,
            color2,
        }
    }

    /// Pattern shown once the booth has started.
    pub fn initial() -> LedCommand {
        LedCommand::new(LedEffect::Fade, 20, Rgb::RED, Rgb::BLUE)
    }

    pub fn preset(name: &str) -> Result<LedCommand, EncodingError> {
        let cmd = match name.to_ascii_lowercase().as_str() {
            "initial" => LedCommand::initial(),
            "off" => LedCommand::new(LedEffect::AllOff, 0, Rgb::BLACK, Rgb::BLACK),
            "white" => LedCommand::new(LedEffect::Static, 0, Rgb::WHITE, Rgb::BLACK),
            "red" => LedCommand::new(LedEffect::Static, 0, Rgb::RED, Rgb::BLACK),
            "green" => LedCommand::new(LedEffect::Static, 0, Rgb::GREEN, Rgb::BLACK),
            "blue" => LedCommand::new(LedEffect::Static, 0, Rgb::BLUE, Rgb::BLACK),
            "blink" => LedCommand::new(LedEffect::Blink, 50, Rgb::WHITE, Rgb::BLACK),
            "running" => LedCommand::new(LedEffect::Running, 30, Rgb::BLUE, Rgb::WHITE),
            "fade" => LedCommand::new(LedEffect::Fade, 40, Rgb::GREEN, Rgb::RED),
            "rainbow" => LedCommand::new(LedEffect::Rainbow, 10, Rgb::BLACK, Rgb::BLACK),
            _ => return Err(EncodingError::LedPreset(name.to_string())),
        };
        Ok(cmd)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = self.to_string().into_bytes();
        payload.push(b'\n');
        payload
    }
}

impl Display for LedCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}:{}",
            self.effect.id(),
            self.speed,
            self.color1.r,
            self.color1.g,
            self.color1.b,
            self.color2.r,
            self.color2.g,
            self.color2.b
        )
    }
}

//! Status pins of the word clock board.

use tracing::trace;

/// Portal status LED: access point mode and WiFi progress
pub const STATUS_PIN: u8 = 2;

/// Push button sampled at boot. Pressed resets the access point password.
pub const CONFIG_PIN: u8 = 4;

/// NTP status LED: off while waiting, blinking while connecting, on once
/// time is synchronized
pub const NTP_STATUS_PIN: u8 = 16;

pub trait OutputPin {
    fn set_level(&mut self, high: bool);
}

pub trait InputPin {
    /// Buttons pull the pin low when pressed
    fn is_low(&self) -> bool;
}

/// Output pin that only records and traces its level
#[derive(Debug, Clone)]
pub struct LoggedPin {
    pub number: u8,
    high: bool,
    /// Number of level changes
    pub transitions: usize,
    /// Number of times the pin was driven
    pub writes: usize,
}

impl LoggedPin {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            high: false,
            transitions: 0,
            writes: 0,
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl OutputPin for LoggedPin {
    fn set_level(&mut self, high: bool) {
        self.writes += 1;
        if high != self.high {
            trace!("Pin {} -> {}", self.number, if high { "HIGH" } else { "LOW" });
            self.high = high;
            self.transitions += 1;
        }
    }
}

/// Input pin stuck at one level
#[derive(Debug, Clone, Copy)]
pub struct FixedPin {
    pub low: bool,
}

impl InputPin for FixedPin {
    fn is_low(&self) -> bool {
        self.low
    }
}

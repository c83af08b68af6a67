/*!
 # Word Clock Configuration Library

 Settings validation and network time synchronization for a WiFi word clock.
 The clock exposes a captive-portal web UI; this library turns the raw text
 the portal collects into typed clock settings and keeps a status LED in step
 with NTP time acquisition.

 ## Features

 * Forgiving parsers for dates, times, `#RRGGBB` colors and bounded integers
 * Fixed registry of portal fields with persistent and transient values
 * Three-state NTP synchronizer with a non-blocking status LED
 * POSIX timezone rules and a one-shot SNTP client
 * A single-threaded controller owning the whole loop

 ## Example

 ```no_run
 use std::time::Instant;
 use word_clock_config::*;

 fn main() -> Result<()> {
     let clock = SimulatedClock::new();
     let portal = MemoryPortal::new(THING_NAME);
     let synchronizer = NtpSynchronizer::new(
         SntpTimeSource::new(),
         LoggedPin::new(NTP_STATUS_PIN),
         NtpConfig::default(),
     );

     let mut controller = Controller::new(clock, portal, synchronizer);
     controller.setup()?;

     loop {
         controller.tick(Instant::now());
     }
 }
 ```
*/

use thiserror::Error;

/// Custom error types for the word clock configuration library
#[derive(Error, Debug)]
pub enum Error {
    /// Field name not present in the registry
    #[error("Unknown configuration field: {0}")]
    UnknownField(String),

    /// Value does not fit into the field buffer
    #[error("Value for field {field} is longer than {max} bytes")]
    ValueTooLong { field: &'static str, max: usize },

    /// Malformed POSIX timezone string
    #[error("Invalid timezone rule: {0}")]
    InvalidTimezone(String),

    /// Malformed or unusable SNTP reply
    #[error("Invalid NTP response: {0}")]
    InvalidNtpResponse(String),

    /// Socket and resolver errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// General error
    #[error("Error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod clock;
pub mod config;
pub mod controller;
pub mod field;
pub mod ntp;
pub mod parse;
pub mod pins;
pub mod portal;
pub mod sntp;
pub mod tz;

// Re-export key types
pub use clock::{ClockMode, SimulatedClock, WordClock, PALETTE_COUNT};
pub use config::{AppliedSettings, ConfigCoordinator};
pub use controller::Controller;
pub use field::{FieldId, FieldKind, FieldSpec, FieldStore, Persistence, FIELDS};
pub use ntp::{NtpConfig, NtpSynchronizer, StatusLed, SyncState, TimeSource};
pub use parse::{ClockTime, RgbColor};
pub use pins::{FixedPin, InputPin, LoggedPin, OutputPin, NTP_STATUS_PIN};
pub use portal::{
    ConfigOutcome, MemoryPortal, Method, Portal, PortalEvent, Request, Response, THING_NAME,
};
pub use sntp::SntpTimeSource;
pub use tz::PosixTz;

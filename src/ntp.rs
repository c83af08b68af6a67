/*!
 # NTP synchronization state machine

 Time acquisition runs in three states:

 * `Waiting` - no WiFi yet, LED off
 * `Connecting` - WiFi is up and a request went out, LED blinking
 * `Connected` - local time is available, LED on

 Everything is driven from [`NtpSynchronizer::tick`], which never blocks for
 longer than the probe timeout. A failed request is not retried; the
 synchronizer stays in `Connecting` until a later probe succeeds.
*/

use crate::pins::OutputPin;
use crate::tz::PosixTz;
use chrono::NaiveDateTime;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default NTP server
pub const NTP_SERVER: &str = "pool.ntp.org";

/// Default timezone rule (America/New_York)
pub const TIMEZONE: &str = "EST5EDT,M3.2.0,M11.1.0";

/// Half period of the LED blink while connecting
pub const BLINK_PERIOD: Duration = Duration::from_millis(300);

/// Longest wait for local time within one tick
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(10);

/// Network time provider
pub trait TimeSource {
    /// Resets to plain UTC and issues a time request to `server`
    fn start(&mut self, server: &str);
    /// Installs the rule used to derive local time
    fn set_timezone(&mut self, timezone: &PosixTz);
    /// Local time, or `None` if time has not been obtained within `timeout`
    fn local_time(&mut self, timeout: Duration) -> Option<NaiveDateTime>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Waiting,
    Connecting,
    Connected,
}

/// Synchronizer settings
#[derive(Debug, Clone)]
pub struct NtpConfig {
    pub server: String,
    pub timezone: PosixTz,
    pub blink_period: Duration,
    pub probe_timeout: Duration,
}

impl Default for NtpConfig {
    fn default() -> Self {
        Self {
            server: NTP_SERVER.to_string(),
            timezone: TIMEZONE.parse().unwrap_or_default(),
            blink_period: BLINK_PERIOD,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

/// Drives a status pin from the sync state
#[derive(Debug)]
pub struct StatusLed<P> {
    pin: P,
    high: bool,
    last_toggle: Option<Instant>,
    blink_period: Duration,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P, blink_period: Duration) -> Self {
        Self {
            pin,
            high: false,
            last_toggle: None,
            blink_period,
        }
    }

    /// Off while waiting, toggling every blink period while connecting,
    /// steady on when connected
    pub fn update(&mut self, state: SyncState, now: Instant) {
        match state {
            SyncState::Waiting => self.high = false,
            SyncState::Connecting => {
                let due = match self.last_toggle {
                    Some(last) => now.saturating_duration_since(last) > self.blink_period,
                    None => true,
                };
                if due {
                    self.high = !self.high;
                    self.last_toggle = Some(now);
                }
            }
            SyncState::Connected => self.high = true,
        }
        self.pin.set_level(self.high);
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/// Three-state NTP acquisition with LED feedback
#[derive(Debug)]
pub struct NtpSynchronizer<S, P> {
    state: SyncState,
    connect_requested: bool,
    source: S,
    led: StatusLed<P>,
    config: NtpConfig,
}

impl<S: TimeSource, P: OutputPin> NtpSynchronizer<S, P> {
    pub fn new(source: S, pin: P, config: NtpConfig) -> Self {
        Self {
            state: SyncState::Waiting,
            connect_requested: false,
            source,
            led: StatusLed::new(pin, config.blink_period),
            config,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn led(&self) -> &StatusLed<P> {
        &self.led
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &NtpConfig {
        &self.config
    }

    /// WiFi came up: start connecting on the next tick
    pub fn on_wifi_connected(&mut self) {
        if self.state != SyncState::Waiting {
            debug!("WiFi connected while {:?}, ignoring", self.state);
            return;
        }
        info!("WiFi was connected, initiating NTP process");
        self.state = SyncState::Connecting;
        self.connect_requested = true;
    }

    /// Drives the status pin from the current state without advancing it
    pub fn refresh_led(&mut self, now: Instant) {
        self.led.update(self.state, now);
    }

    /// One loop iteration. The LED reflects the state at the start of the
    /// tick; transitions made here show up on the next one.
    pub fn tick(&mut self, now: Instant) {
        self.led.update(self.state, now);

        if self.connect_requested {
            self.connect_requested = false;
            self.connect();
        }

        if self.state == SyncState::Connecting
            && self.source.local_time(self.config.probe_timeout).is_some()
        {
            info!("NTP connection successful");
            self.state = SyncState::Connected;
        }
    }

    #[instrument(skip(self), fields(server = %self.config.server))]
    fn connect(&mut self) {
        info!("Connecting to NTP server");
        self.source.start(&self.config.server);
        self.source.set_timezone(&self.config.timezone);

        match self.source.local_time(self.config.probe_timeout) {
            Some(time) => info!("NTP local time {}", time.format("%A, %B %d %Y %H:%M:%S")),
            None => warn!("NTP local time not available yet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::LoggedPin;

    fn led() -> StatusLed<LoggedPin> {
        StatusLed::new(LoggedPin::new(16), BLINK_PERIOD)
    }

    #[test]
    fn blink_toggles_after_period() {
        let mut led = led();
        let start = Instant::now();

        led.update(SyncState::Connecting, start);
        assert!(led.is_high());

        led.update(SyncState::Connecting, start + Duration::from_millis(300));
        assert!(led.is_high(), "period must be exceeded, not reached");

        led.update(SyncState::Connecting, start + Duration::from_millis(301));
        assert!(!led.is_high());
    }

    #[test]
    fn waiting_forces_off_and_connected_forces_on() {
        let mut led = led();
        let now = Instant::now();
        led.update(SyncState::Connected, now);
        assert!(led.pin().is_high());
        led.update(SyncState::Waiting, now);
        assert!(!led.pin().is_high());
    }

    #[test]
    fn default_timezone_parses() {
        assert_eq!(NtpConfig::default().timezone.to_string(), TIMEZONE);
    }
}

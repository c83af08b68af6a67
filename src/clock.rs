/*!
 # Clock subsystem interface

 The word clock's rendering engine is consumed only through [`WordClock`].
 [`SimulatedClock`] is an in-process implementation used by the binaries:
 it keeps the applied settings and runs a time base that can be re-based and
 sped up for the debug clock modes.
*/

use crate::parse::{ClockTime, RgbColor};
use chrono::{Duration, Local, NaiveDateTime};
use std::time::Instant;
use tracing::{debug, info};

/// Number of builtin color palettes. Palette id 0 selects the custom colors.
pub const PALETTE_COUNT: u8 = 7;

/// Clock display mode. Mode 0 shows real time, the others are debug modes
/// that run a simulated time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockMode(u8);

impl ClockMode {
    pub const REAL_TIME: ClockMode = ClockMode(0);
    pub const MAX_VALUE: ClockMode = ClockMode(6);

    /// Returns `None` above [`ClockMode::MAX_VALUE`]
    pub fn new(mode: u8) -> Option<Self> {
        (mode <= Self::MAX_VALUE.0).then_some(ClockMode(mode))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_real_time(self) -> bool {
        self == Self::REAL_TIME
    }
}

/// Setters and time source of the clock subsystem
pub trait WordClock {
    fn current_time(&self) -> ClockTime;
    /// Makes `time` the clock's authoritative time
    fn adjust_time(&mut self, time: ClockTime);
    fn set_clock_mode(&mut self, mode: ClockMode);
    fn set_dst(&mut self, dst: bool);
    fn set_fast_time_factor(&mut self, factor: u32);
    fn set_palette_id(&mut self, palette_id: u8);
    fn set_period(&mut self, show_period: bool);
    fn set_custom_color_1(&mut self, color: RgbColor);
    fn set_custom_color_2(&mut self, color: RgbColor);
    fn set_custom_color_3(&mut self, color: RgbColor);
}

/// Word clock without LEDs
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    base_time: NaiveDateTime,
    base_instant: Instant,
    pub clock_mode: ClockMode,
    pub dst: bool,
    pub fast_time_factor: u32,
    pub palette_id: u8,
    pub show_period: bool,
    pub custom_colors: [RgbColor; 3],
    /// Number of setter calls received
    pub updates: usize,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedClock {
    /// Creates a clock starting at the host's local time
    pub fn new() -> Self {
        Self::starting_at(Local::now().naive_local())
    }

    pub fn starting_at(time: NaiveDateTime) -> Self {
        Self {
            base_time: time,
            base_instant: Instant::now(),
            clock_mode: ClockMode::REAL_TIME,
            dst: false,
            fast_time_factor: 1,
            palette_id: 1,
            show_period: false,
            custom_colors: [RgbColor::default(); 3],
            updates: 0,
        }
    }

    /// Simulated time at `now`
    pub fn time_at(&self, now: Instant) -> NaiveDateTime {
        let elapsed = now.saturating_duration_since(self.base_instant);
        let speed = if self.clock_mode.is_real_time() {
            1
        } else {
            self.fast_time_factor.max(1)
        };
        let elapsed = Duration::from_std(elapsed * speed).unwrap_or_else(|_| Duration::zero());
        let mut time = self.base_time + elapsed;
        if self.dst {
            time += Duration::hours(1);
        }
        time
    }

    /// Restarts the time base at the current simulated time so speed changes
    /// do not make time jump.
    fn rebase(&mut self) {
        let now = Instant::now();
        let mut time = self.time_at(now);
        if self.dst {
            time -= Duration::hours(1);
        }
        self.base_time = time;
        self.base_instant = now;
    }
}

impl WordClock for SimulatedClock {
    fn current_time(&self) -> ClockTime {
        self.time_at(Instant::now()).into()
    }

    fn adjust_time(&mut self, time: ClockTime) {
        match time.to_naive() {
            Some(time) => {
                info!("Adjusting clock to {}", time);
                self.base_time = time;
                self.base_instant = Instant::now();
                if self.dst {
                    self.base_time -= Duration::hours(1);
                }
            }
            None => debug!("Ignoring adjustment to non-calendar date {}", time),
        }
        self.updates += 1;
    }

    fn set_clock_mode(&mut self, mode: ClockMode) {
        self.rebase();
        self.clock_mode = mode;
        self.updates += 1;
    }

    fn set_dst(&mut self, dst: bool) {
        self.dst = dst;
        self.updates += 1;
    }

    fn set_fast_time_factor(&mut self, factor: u32) {
        self.rebase();
        self.fast_time_factor = factor;
        self.updates += 1;
    }

    fn set_palette_id(&mut self, palette_id: u8) {
        self.palette_id = palette_id;
        self.updates += 1;
    }

    fn set_period(&mut self, show_period: bool) {
        self.show_period = show_period;
        self.updates += 1;
    }

    fn set_custom_color_1(&mut self, color: RgbColor) {
        self.custom_colors[0] = color;
        self.updates += 1;
    }

    fn set_custom_color_2(&mut self, color: RgbColor) {
        self.custom_colors[1] = color;
        self.updates += 1;
    }

    fn set_custom_color_3(&mut self, color: RgbColor) {
        self.custom_colors[2] = color;
        self.updates += 1;
    }
}

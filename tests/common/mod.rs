//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use std::time::Duration;
use word_clock_config::*;

/// One call received by [`RecordingClock`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockCall {
    Adjust(ClockTime),
    Mode(u8),
    Dst(bool),
    FastTimeFactor(u32),
    Palette(u8),
    Period(bool),
    Color1(RgbColor),
    Color2(RgbColor),
    Color3(RgbColor),
}

/// Clock frozen at a fixed time that records every setter call
#[derive(Debug, Clone)]
pub struct RecordingClock {
    pub now: ClockTime,
    pub calls: Vec<ClockCall>,
}

impl RecordingClock {
    pub fn at(now: ClockTime) -> Self {
        Self {
            now,
            calls: Vec::new(),
        }
    }

    pub fn new() -> Self {
        Self::at(ClockTime::new(2024, 5, 17, 8, 30, 15))
    }
}

impl WordClock for RecordingClock {
    fn current_time(&self) -> ClockTime {
        self.now
    }

    fn adjust_time(&mut self, time: ClockTime) {
        self.calls.push(ClockCall::Adjust(time));
    }

    fn set_clock_mode(&mut self, mode: ClockMode) {
        self.calls.push(ClockCall::Mode(mode.value()));
    }

    fn set_dst(&mut self, dst: bool) {
        self.calls.push(ClockCall::Dst(dst));
    }

    fn set_fast_time_factor(&mut self, factor: u32) {
        self.calls.push(ClockCall::FastTimeFactor(factor));
    }

    fn set_palette_id(&mut self, palette_id: u8) {
        self.calls.push(ClockCall::Palette(palette_id));
    }

    fn set_period(&mut self, show_period: bool) {
        self.calls.push(ClockCall::Period(show_period));
    }

    fn set_custom_color_1(&mut self, color: RgbColor) {
        self.calls.push(ClockCall::Color1(color));
    }

    fn set_custom_color_2(&mut self, color: RgbColor) {
        self.calls.push(ClockCall::Color2(color));
    }

    fn set_custom_color_3(&mut self, color: RgbColor) {
        self.calls.push(ClockCall::Color3(color));
    }
}

/// Time source answering probes from a script; `true` means time is
/// available. Once the script runs out the last answer repeats.
#[derive(Debug, Default)]
pub struct ScriptedTimeSource {
    pub answers: Vec<bool>,
    pub probes: usize,
    pub starts: Vec<String>,
    pub timezones: Vec<String>,
    pub timeouts: Vec<Duration>,
}

impl ScriptedTimeSource {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.to_vec(),
            ..Self::default()
        }
    }
}

impl TimeSource for ScriptedTimeSource {
    fn start(&mut self, server: &str) {
        self.starts.push(server.to_string());
    }

    fn set_timezone(&mut self, timezone: &PosixTz) {
        self.timezones.push(timezone.to_string());
    }

    fn local_time(&mut self, timeout: Duration) -> Option<NaiveDateTime> {
        self.timeouts.push(timeout);
        let answer = self
            .answers
            .get(self.probes)
            .or(self.answers.last())
            .copied()
            .unwrap_or(false);
        self.probes += 1;
        answer.then(|| {
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        })
    }
}

/// Every value of the default field set as the clock sees it
pub fn default_calls() -> Vec<ClockCall> {
    vec![
        ClockCall::Mode(0),
        ClockCall::Dst(false),
        ClockCall::FastTimeFactor(30),
        ClockCall::Palette(1),
        ClockCall::Period(false),
        ClockCall::Color1(RgbColor::new(190, 9, 0)),
        ClockCall::Color2(RgbColor::new(203, 91, 10)),
        ClockCall::Color3(RgbColor::new(254, 204, 92)),
    ]
}

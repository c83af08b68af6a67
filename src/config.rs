/*!
 # Configuration coordinator

 Owns the portal field buffers and turns them into clock settings. Every
 field is parsed and applied on its own with its own default, so one bad
 value never keeps the others from taking effect.

 Booleans are entered as `0`/`1` numbers because the portal has no working
 checkbox input.
*/

use crate::clock::{ClockMode, WordClock, PALETTE_COUNT};
use crate::field::{FieldId, FieldStore};
use crate::parse::{parse_bounded_int, parse_color, parse_date_time_overlay, RgbColor};
use tracing::{debug, instrument};

/// Fallbacks for the three custom colors
pub const DEFAULT_CUSTOM_COLORS: [RgbColor; 3] = [
    RgbColor::new(190, 9, 0),
    RgbColor::new(203, 91, 10),
    RgbColor::new(254, 204, 92),
];

pub const DEFAULT_FAST_TIME_FACTOR: i32 = 30;
pub const MAX_FAST_TIME_FACTOR: i32 = 3600;
pub const DEFAULT_PALETTE_ID: i32 = 1;

/// Settings last pushed to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedSettings {
    pub clock_mode: ClockMode,
    pub dst: bool,
    pub fast_time_factor: u32,
    pub palette_id: u8,
    pub show_period: bool,
    pub custom_colors: [RgbColor; 3],
}

impl AppliedSettings {
    /// Parses the persistent fields of `fields`
    pub fn from_fields(fields: &FieldStore) -> Self {
        let clock_mode = parse_bounded_int(
            fields.get(FieldId::ClockMode),
            0,
            ClockMode::MAX_VALUE.value().into(),
            ClockMode::REAL_TIME.value().into(),
        );
        let color =
            |id: FieldId, index: usize| parse_color(fields.get(id), DEFAULT_CUSTOM_COLORS[index]);

        Self {
            clock_mode: ClockMode::new(clock_mode as u8).unwrap_or(ClockMode::REAL_TIME),
            dst: parse_bounded_int(fields.get(FieldId::Dst), 0, 1, 0) == 1,
            fast_time_factor: parse_bounded_int(
                fields.get(FieldId::FastTimeFactor),
                1,
                MAX_FAST_TIME_FACTOR,
                DEFAULT_FAST_TIME_FACTOR,
            ) as u32,
            palette_id: parse_bounded_int(
                fields.get(FieldId::PaletteId),
                0,
                PALETTE_COUNT.into(),
                DEFAULT_PALETTE_ID,
            ) as u8,
            show_period: parse_bounded_int(fields.get(FieldId::Period), 0, 1, 0) == 1,
            custom_colors: [
                color(FieldId::Color1, 0),
                color(FieldId::Color2, 1),
                color(FieldId::Color3, 2),
            ],
        }
    }
}

/// Bridges portal field text and the clock's typed setters
#[derive(Debug)]
pub struct ConfigCoordinator<C> {
    clock: C,
    fields: FieldStore,
    applied: Option<AppliedSettings>,
}

impl<C: WordClock> ConfigCoordinator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            fields: FieldStore::new(),
            applied: None,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldStore {
        &mut self.fields
    }

    /// Settings pushed by the last [`ConfigCoordinator::apply_all_fields_to_clock`]
    pub fn applied(&self) -> Option<&AppliedSettings> {
        self.applied.as_ref()
    }

    /// Empties date and time; called whenever the config page is shown
    pub fn reset_transient_fields(&mut self) {
        debug!("Clearing transient fields");
        self.fields.clear_transient();
    }

    /// Validates every field and pushes the result to the clock
    #[instrument(skip(self))]
    pub fn apply_all_fields_to_clock(&mut self) -> AppliedSettings {
        let current = self.clock.current_time();
        if let Some(time) = parse_date_time_overlay(
            current,
            self.fields.get(FieldId::Date),
            self.fields.get(FieldId::Time),
        ) {
            self.clock.adjust_time(time);
        }

        let settings = AppliedSettings::from_fields(&self.fields);
        debug!("Applying {:?}", settings);

        self.clock.set_clock_mode(settings.clock_mode);
        self.clock.set_dst(settings.dst);
        self.clock.set_fast_time_factor(settings.fast_time_factor);
        self.clock.set_palette_id(settings.palette_id);
        self.clock.set_period(settings.show_period);
        self.clock.set_custom_color_1(settings.custom_colors[0]);
        self.clock.set_custom_color_2(settings.custom_colors[1]);
        self.clock.set_custom_color_3(settings.custom_colors[2]);

        self.applied = Some(settings);
        settings
    }
}

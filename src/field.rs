/*!
 # Portal field registry

 The configuration portal shows a fixed set of fields. Each one is described
 by a static [`FieldSpec`] and backed by a bounded text buffer in a
 [`FieldStore`]. Transient fields (date and time) are cleared every time the
 config page is shown, so they only take effect when entered explicitly.
*/

use crate::{Error, Result};
use tracing::debug;

/// Buffer size of a single field value, terminator included
pub const VALUE_LENGTH: usize = 16;

/// Longest text a field buffer accepts
pub const MAX_VALUE_LEN: usize = VALUE_LENGTH - 1;

/// Number of registered fields
pub const FIELD_COUNT: usize = 10;

/// Semantic type of a field's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `yyyy-mm-dd`
    Date,
    /// `hh:mm:ss`
    Time,
    /// `0` or `1`
    Flag,
    /// Palette number, `0` selects the custom colors
    Palette,
    /// `#RRGGBB`
    Color,
    /// Bounded integer
    Number,
}

impl FieldKind {
    /// Expected shape of the text, for help output
    pub fn format_hint(self) -> &'static str {
        match self {
            FieldKind::Date => "yyyy-mm-dd",
            FieldKind::Time => "hh:mm:ss",
            FieldKind::Flag => "0|1",
            FieldKind::Palette => "palette number",
            FieldKind::Color => "#RRGGBB",
            FieldKind::Number => "integer",
        }
    }
}

/// Whether a field keeps its value between portal views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Persistent,
    Transient,
}

/// Identifies one registered field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Date,
    Time,
    Dst,
    PaletteId,
    Color1,
    Color2,
    Color3,
    Period,
    ClockMode,
    FastTimeFactor,
}

impl FieldId {
    /// All fields in portal display order
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::Date,
        FieldId::Time,
        FieldId::Dst,
        FieldId::PaletteId,
        FieldId::Color1,
        FieldId::Color2,
        FieldId::Color3,
        FieldId::Period,
        FieldId::ClockMode,
        FieldId::FastTimeFactor,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &FIELDS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Looks up a field by its machine name
    pub fn from_name(name: &str) -> Option<FieldId> {
        FieldId::ALL.into_iter().find(|id| id.name() == name)
    }
}

/// Static description of a portal field
#[derive(Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    /// Section heading shown above the field's group
    pub group: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Machine name used in form submissions
    pub name: &'static str,
    /// HTML input type hint
    pub input_type: &'static str,
    pub placeholder: &'static str,
    /// Initial text, `None` for an empty buffer
    pub default: Option<&'static str>,
    /// Client-side validation attributes. Only a hint for the browser; the
    /// value parsers validate independently.
    pub custom_html: &'static str,
    pub kind: FieldKind,
    pub persistence: Persistence,
}

const FLAG_HTML: &str = "pattern='[01]' min='0' max='1' style='max-width: 2em; display: block;'";
const COLOR_HTML: &str = "pattern='#[0-9a-fA-F]{6}' style='border-width: 1px; padding: 1px;'";

/// Field registry, indexed by `FieldId as usize`
pub static FIELDS: [FieldSpec; FIELD_COUNT] = [
    FieldSpec {
        id: FieldId::Date,
        group: "Date and time",
        label: "Date",
        name: "date",
        input_type: "date",
        placeholder: "yyyy-mm-dd",
        default: None,
        custom_html: "pattern='\\d{4}-\\d{1,2}-\\d{1,2}'",
        kind: FieldKind::Date,
        persistence: Persistence::Transient,
    },
    FieldSpec {
        id: FieldId::Time,
        group: "Date and time",
        label: "Time",
        name: "time",
        input_type: "time",
        placeholder: "hh:mm:ss",
        default: None,
        custom_html: "pattern='\\d{1,2}:\\d{1,2}:\\d{1,2}' step='1'",
        kind: FieldKind::Time,
        persistence: Persistence::Transient,
    },
    FieldSpec {
        id: FieldId::Dst,
        group: "Date and time",
        label: "Daylight saving time? (0=false, 1=true)",
        name: "dst",
        input_type: "number",
        placeholder: "0",
        default: Some("0"),
        custom_html: FLAG_HTML,
        kind: FieldKind::Flag,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::PaletteId,
        group: "Appearance",
        label: "Color palette number (0=custom)",
        name: "palette_id",
        input_type: "number",
        placeholder: "1",
        default: Some("1"),
        custom_html: "pattern='\\d+' min='0' max='7' style='max-width: 2em; display: block;'",
        kind: FieldKind::Palette,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::Color1,
        group: "Appearance",
        label: "Custom color 1",
        name: "color_1",
        input_type: "color",
        placeholder: "#RRGGBB",
        default: Some("#BE0900"),
        custom_html: COLOR_HTML,
        kind: FieldKind::Color,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::Color2,
        group: "Appearance",
        label: "Custom color 2",
        name: "color_2",
        input_type: "color",
        placeholder: "#RRGGBB",
        default: Some("#CB5B0A"),
        custom_html: COLOR_HTML,
        kind: FieldKind::Color,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::Color3,
        group: "Appearance",
        label: "Custom color 3",
        name: "color_3",
        input_type: "color",
        placeholder: "#RRGGBB",
        default: Some("#FECC5C"),
        custom_html: COLOR_HTML,
        kind: FieldKind::Color,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::Period,
        group: "Appearance",
        label: "Show period? (0=false, 1=true)",
        name: "period",
        input_type: "number",
        placeholder: "0",
        default: Some("0"),
        custom_html: FLAG_HTML,
        kind: FieldKind::Flag,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::ClockMode,
        group: "Debug",
        label: "Clock mode (0=real clock)",
        name: "clock_mode",
        input_type: "number",
        placeholder: "0",
        default: Some("0"),
        custom_html: "pattern='\\d+' min='0' max='6' style='max-width: 2em; display: block;'",
        kind: FieldKind::Number,
        persistence: Persistence::Persistent,
    },
    FieldSpec {
        id: FieldId::FastTimeFactor,
        group: "Debug",
        label: "Fast time factor",
        name: "fast_time_factor",
        input_type: "number",
        placeholder: "30",
        default: Some("30"),
        custom_html: "pattern='\\d+' min='1' max='3600' style='max-width: 4em; display: block;'",
        kind: FieldKind::Number,
        persistence: Persistence::Persistent,
    },
];

/// Text buffers backing every registered field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStore {
    values: [String; FIELD_COUNT],
}

impl Default for FieldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldStore {
    /// Creates a store holding every field's default text
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|index| {
                FIELDS[index].default.unwrap_or_default().to_string()
            }),
        }
    }

    pub fn get(&self, id: FieldId) -> &str {
        &self.values[id as usize]
    }

    /// Replaces a field's text. Over-long values are rejected and leave the
    /// buffer untouched.
    pub fn set(&mut self, id: FieldId, text: &str) -> Result<()> {
        if text.len() > MAX_VALUE_LEN {
            return Err(Error::ValueTooLong {
                field: id.name(),
                max: MAX_VALUE_LEN,
            });
        }
        debug!("Field {} set to {:?}", id.name(), text);
        let buffer = &mut self.values[id as usize];
        buffer.clear();
        buffer.push_str(text);
        Ok(())
    }

    /// Like [`FieldStore::set`], addressed by machine name
    pub fn set_by_name(&mut self, name: &str, text: &str) -> Result<()> {
        let id = FieldId::from_name(name).ok_or_else(|| Error::UnknownField(name.to_string()))?;
        self.set(id, text)
    }

    /// Empties every transient field
    pub fn clear_transient(&mut self) {
        for spec in FIELDS.iter() {
            if spec.persistence == Persistence::Transient {
                self.values[spec.id as usize].clear();
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        FieldId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

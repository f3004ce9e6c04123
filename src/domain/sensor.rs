// Sensor field catalogue and per-reading value record
use std::fmt;
use thiserror::Error;

/// One sensor channel type reported by an air quality device.
///
/// The set is closed: readings carrying any other key are ignored.
/// Declaration order is the order fields appear in query output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorField {
    Rco2,
    Pm01,
    Pm02,
    Pm10,
    PCnt,
    Tvoc,
    Nox,
    Atmp,
    Rhum,
}

impl SensorField {
    pub const COUNT: usize = 9;

    pub const ALL: [SensorField; Self::COUNT] = [
        SensorField::Rco2,
        SensorField::Pm01,
        SensorField::Pm02,
        SensorField::Pm10,
        SensorField::PCnt,
        SensorField::Tvoc,
        SensorField::Nox,
        SensorField::Atmp,
        SensorField::Rhum,
    ];

    /// Key used for this field in storage columns and JSON output
    pub fn key(self) -> &'static str {
        match self {
            SensorField::Rco2 => "rco2",
            SensorField::Pm01 => "pm01",
            SensorField::Pm02 => "pm02",
            SensorField::Pm10 => "pm10",
            SensorField::PCnt => "pCnt",
            SensorField::Tvoc => "tvoc",
            SensorField::Nox => "nox",
            SensorField::Atmp => "atmp",
            SensorField::Rhum => "rhum",
        }
    }

    pub fn from_key(key: &str) -> Option<SensorField> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Optional reading for every sensor field.
///
/// An unset slot means the device did not report that field, which is
/// different from a reported zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorValues {
    slots: [Option<f64>; SensorField::COUNT],
}

impl SensorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: SensorField) -> Option<f64> {
        self.slots[field.index()]
    }

    pub fn set(&mut self, field: SensorField, value: Option<f64>) {
        self.slots[field.index()] = value;
    }

    /// Builder-style setter, handy when constructing readings inline
    pub fn with(mut self, field: SensorField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldSelectionError {
    #[error("found no suitable sensors matching query: {0}")]
    NoMatchingSensors(String),
}

/// Subset of sensor fields a query wants tracked, in canonical order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    fields: Vec<SensorField>,
}

impl FieldSelection {
    pub fn all() -> Self {
        Self {
            fields: SensorField::ALL.to_vec(),
        }
    }

    /// Parse `sensor` arguments, each of which may hold a comma-separated list.
    /// No arguments selects every field.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, FieldSelectionError> {
        if args.is_empty() {
            return Ok(Self::all());
        }

        let mut wanted = [false; SensorField::COUNT];
        for arg in args {
            for key in arg.as_ref().split(',') {
                if let Some(field) = SensorField::from_key(key.trim()) {
                    wanted[field.index()] = true;
                }
            }
        }

        let fields: Vec<SensorField> = SensorField::ALL
            .into_iter()
            .filter(|field| wanted[field.index()])
            .collect();

        if fields.is_empty() {
            let raw: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
            return Err(FieldSelectionError::NoMatchingSensors(raw.join(",")));
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SensorField] {
        &self.fields
    }
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self::all()
    }
}

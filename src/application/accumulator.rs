// Per-field value buffers between window flushes
use super::median::median;
use crate::domain::sensor::{FieldSelection, SensorField, SensorValues};

/// Buffer of raw values for one field since the last flush
#[derive(Debug, Default)]
pub struct FieldAccumulator {
    values: Vec<f64>,
}

impl FieldAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.values.push(value);
        }
    }

    /// Median of everything accumulated since the last flush. Always clears.
    pub fn flush(&mut self) -> Option<f64> {
        let result = median(&self.values);
        self.values.clear();
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One accumulator per tracked field, created fresh for every downsample call
#[derive(Debug)]
pub struct FieldAccumulators {
    tracked: Vec<(SensorField, FieldAccumulator)>,
}

impl FieldAccumulators {
    pub fn new(selection: &FieldSelection) -> Self {
        Self {
            tracked: selection
                .fields()
                .iter()
                .map(|&field| (field, FieldAccumulator::new()))
                .collect(),
        }
    }

    pub fn accumulate(&mut self, values: &SensorValues) {
        for (field, accumulator) in &mut self.tracked {
            accumulator.accumulate(values.get(*field));
        }
    }

    /// Flush every field; `None` when no field produced a value
    pub fn flush(&mut self) -> Option<SensorValues> {
        let mut flushed = SensorValues::new();
        for (field, accumulator) in &mut self.tracked {
            flushed.set(*field, accumulator.flush());
        }
        if flushed.is_empty() { None } else { Some(flushed) }
    }
}

// Reading series domain models
use super::device::DeviceChannelId;
use super::sensor::{SensorField, SensorValues};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use std::collections::BTreeMap;

/// A single timestamped multi-field reading.
///
/// `time_ms` is milliseconds since the Unix epoch; fractional values are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingPoint {
    pub time_ms: f64,
    pub values: SensorValues,
}

impl ReadingPoint {
    pub fn new(time_ms: f64, values: SensorValues) -> Self {
        Self { time_ms, values }
    }
}

/// A raw row as returned by storage, before grouping by identity
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub id: String,
    pub time_ms: f64,
    pub values: SensorValues,
}

impl ReadingRow {
    pub fn new(id: String, time_ms: f64, values: SensorValues) -> Self {
        Self { id, time_ms, values }
    }
}

/// A reading as submitted by a device: its aggregate values plus, for
/// multi-channel devices, one value record per channel in channel order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReading {
    pub values: SensorValues,
    pub channels: Vec<SensorValues>,
}

/// Columnar downsampled output.
///
/// Every column in `fields` has the same length as `time`. A field with no
/// value anywhere in the input has no column at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedSeries {
    pub time: Vec<f64>,
    pub fields: BTreeMap<SensorField, Vec<Option<f64>>>,
}

impl ReducedSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, field: SensorField) -> Option<&[Option<f64>]> {
        self.fields.get(&field).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn to_points(&self) -> Vec<ReadingPoint> {
        self.time
            .iter()
            .enumerate()
            .map(|(i, &time_ms)| {
                let mut values = SensorValues::new();
                for (&field, column) in &self.fields {
                    values.set(field, column[i]);
                }
                ReadingPoint::new(time_ms, values)
            })
            .collect()
    }
}

impl Serialize for ReducedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.fields.len()))?;
        map.serialize_entry("time", &self.time)?;
        for (field, column) in &self.fields {
            map.serialize_entry(field.key(), column)?;
        }
        map.end()
    }
}

/// Query result for one device or device channel
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTimeSeries {
    pub id: String,
    pub channel: Option<u32>,
    pub series: ReducedSeries,
}

impl DeviceTimeSeries {
    pub fn new(identity: DeviceChannelId, series: ReducedSeries) -> Self {
        Self {
            id: identity.id,
            channel: identity.channel,
            series,
        }
    }
}

impl Serialize for DeviceTimeSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.channel.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("DeviceTimeSeries", len)?;
        state.serialize_field("id", &self.id)?;
        if let Some(channel) = self.channel {
            state.serialize_field("channel", &channel)?;
        } else {
            state.skip_field("channel")?;
        }
        state.serialize_field("series", &self.series)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reduced_series_json_omits_missing_fields() {
        let mut series = ReducedSeries::default();
        series.time = vec![1000.0, 2000.0];
        series
            .fields
            .insert(SensorField::Rhum, vec![Some(40.0), None]);
        series
            .fields
            .insert(SensorField::Rco2, vec![Some(600.0), Some(610.0)]);

        let value = serde_json::to_value(&series).unwrap();
        assert_eq!(
            value,
            json!({ "time": [1000.0, 2000.0], "rco2": [600.0, 610.0], "rhum": [40.0, null] })
        );
    }

    #[test]
    fn test_device_series_json_channel_is_optional() {
        let plain = DeviceTimeSeries::new(DeviceChannelId::parse("abc"), ReducedSeries::default());
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({ "id": "abc", "series": { "time": [] } })
        );

        let channel =
            DeviceTimeSeries::new(DeviceChannelId::parse("abc/1"), ReducedSeries::default());
        assert_eq!(
            serde_json::to_value(&channel).unwrap(),
            json!({ "id": "abc", "channel": 1, "series": { "time": [] } })
        );
    }

    #[test]
    fn test_to_points_restores_columns() {
        let mut series = ReducedSeries::default();
        series.time = vec![5.0];
        series.fields.insert(SensorField::Atmp, vec![Some(20.0)]);
        let points = series.to_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time_ms, 5.0);
        assert_eq!(points[0].values.get(SensorField::Atmp), Some(20.0));
        assert_eq!(points[0].values.get(SensorField::Rhum), None);
    }
}

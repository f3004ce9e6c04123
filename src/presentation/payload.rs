// JSON body accepted by the submit endpoint
use crate::domain::readings::DeviceReading;
use crate::domain::sensor::{SensorField, SensorValues};
use serde::Deserialize;

/// Sensor values keyed by their wire names; unknown keys are ignored
#[derive(Debug, Default, Deserialize)]
pub struct SubmittedValues {
    rco2: Option<f64>,
    pm01: Option<f64>,
    pm02: Option<f64>,
    pm10: Option<f64>,
    #[serde(rename = "pCnt")]
    p_cnt: Option<f64>,
    tvoc: Option<f64>,
    nox: Option<f64>,
    atmp: Option<f64>,
    rhum: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    #[serde(flatten)]
    values: SubmittedValues,
    #[serde(default)]
    channels: Vec<SubmittedValues>,
}

impl From<SubmittedValues> for SensorValues {
    fn from(submitted: SubmittedValues) -> Self {
        let mut values = SensorValues::new();
        values.set(SensorField::Rco2, submitted.rco2);
        values.set(SensorField::Pm01, submitted.pm01);
        values.set(SensorField::Pm02, submitted.pm02);
        values.set(SensorField::Pm10, submitted.pm10);
        values.set(SensorField::PCnt, submitted.p_cnt);
        values.set(SensorField::Tvoc, submitted.tvoc);
        values.set(SensorField::Nox, submitted.nox);
        values.set(SensorField::Atmp, submitted.atmp);
        values.set(SensorField::Rhum, submitted.rhum);
        values
    }
}

impl From<SubmitPayload> for DeviceReading {
    fn from(payload: SubmitPayload) -> Self {
        DeviceReading {
            values: payload.values.into(),
            channels: payload.channels.into_iter().map(SensorValues::from).collect(),
        }
    }
}

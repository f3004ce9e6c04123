// Ingest service - Use case for storing submitted device readings
use crate::application::readings_repository::ReadingsRepository;
use crate::domain::device::is_valid_device_id;
use crate::domain::readings::{DeviceReading, ReadingRow};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid device id: '{0}'")]
    InvalidDeviceId(String),
    #[error("missing air quality data")]
    MissingData,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SubmitError {
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, SubmitError::Storage(_))
    }
}

#[derive(Clone)]
pub struct IngestService {
    repository: Arc<dyn ReadingsRepository>,
}

impl IngestService {
    pub fn new(repository: Arc<dyn ReadingsRepository>) -> Self {
        Self { repository }
    }

    /// Store a reading stamped with the current time; returns the number of rows written
    pub async fn submit(&self, device: &str, reading: DeviceReading) -> Result<usize, SubmitError> {
        self.submit_at(device, reading, Utc::now()).await
    }

    async fn submit_at(
        &self,
        device: &str,
        reading: DeviceReading,
        now: DateTime<Utc>,
    ) -> Result<usize, SubmitError> {
        // Channel suffixes are assigned here, never accepted from the caller
        if !is_valid_device_id(device) || device.contains('/') {
            return Err(SubmitError::InvalidDeviceId(device.to_string()));
        }
        if reading.values.is_empty() {
            return Err(SubmitError::MissingData);
        }

        let id = device.to_lowercase();
        let rows = reading_rows(&id, now.timestamp_millis() as f64, reading);
        self.repository.write_readings(&rows).await?;

        tracing::debug!(%id, rows = rows.len(), "stored reading");
        Ok(rows.len())
    }
}

/// The device row, followed by one `"<id>/<index>"` row per channel when the
/// device reports more than one channel
fn reading_rows(id: &str, time_ms: f64, reading: DeviceReading) -> Vec<ReadingRow> {
    let mut rows = vec![ReadingRow::new(id.to_string(), time_ms, reading.values)];
    if reading.channels.len() > 1 {
        rows.extend(
            reading
                .channels
                .into_iter()
                .enumerate()
                .map(|(index, values)| ReadingRow::new(format!("{id}/{index}"), time_ms, values)),
        );
    }
    rows
}

// Readings service - Use case for time-range queries with downsampling
use crate::application::downsampler::DownsampleError;
use crate::application::query_resolver::{InvalidQueryMode, QueryMode, QueryResolver};
use crate::application::readings_repository::{ReadingsRepository, RowFilter};
use crate::domain::device::is_valid_device_id;
use crate::domain::readings::DeviceTimeSeries;
use crate::domain::sensor::{FieldSelection, FieldSelectionError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Raw query parameters as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub devices: Vec<String>,
    pub sensors: Vec<String>,
    pub mode: Option<String>,
    pub points: Option<String>,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid timestamp: '{0}'")]
    InvalidTimestamp(String),
    #[error("query start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("invalid point budget: '{0}'")]
    InvalidPointBudget(String),
    #[error("invalid device id: '{0}'")]
    InvalidDeviceId(String),
    #[error(transparent)]
    Sensors(#[from] FieldSelectionError),
    #[error(transparent)]
    Mode(#[from] InvalidQueryMode),
    #[error(transparent)]
    Downsample(#[from] DownsampleError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl QueryError {
    /// Whether the caller is at fault, as opposed to storage
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, QueryError::Storage(_))
    }
}

#[derive(Clone)]
pub struct ReadingsService {
    repository: Arc<dyn ReadingsRepository>,
    default_points: usize,
}

impl ReadingsService {
    pub fn new(repository: Arc<dyn ReadingsRepository>, default_points: usize) -> Self {
        Self {
            repository,
            default_points,
        }
    }

    pub async fn query(&self, query: &ReadingsQuery) -> Result<Vec<DeviceTimeSeries>, QueryError> {
        self.query_at(query, Utc::now()).await
    }

    async fn query_at(
        &self,
        query: &ReadingsQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeviceTimeSeries>, QueryError> {
        let (start, end) = resolve_time_range(query.start.as_deref(), query.end.as_deref(), now)?;
        let selection = FieldSelection::parse(query.sensors.as_slice())?;
        let mode = match query.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => QueryMode::default(),
        };
        let num_points = parse_point_budget(query.points.as_deref(), self.default_points)?;
        let devices = parse_devices(&query.devices)?;

        let filter = RowFilter {
            start,
            end,
            ids: devices.clone(),
        };
        let rows = self.repository.fetch_rows(&filter).await?;

        tracing::debug!(
            rows = rows.len(),
            devices = devices.len(),
            %start,
            %end,
            num_points,
            "fetched readings"
        );

        let resolver = QueryResolver::new(devices, mode, selection, num_points);
        Ok(resolver.resolve(rows)?)
    }
}

/// Fill in a missing bound: the default window is the day before `end` (or `now`)
fn resolve_time_range(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), QueryError> {
    let day = Duration::days(1);
    let (start, end) = match (start, end) {
        (None, None) => (now - day, now),
        (None, Some(end)) => {
            let end = parse_timestamp(end)?;
            (end - day, end)
        }
        (Some(start), None) => (parse_timestamp(start)?, now),
        (Some(start), Some(end)) => (parse_timestamp(start)?, parse_timestamp(end)?),
    };

    if start > end {
        return Err(QueryError::InvalidRange { start, end });
    }
    Ok((start, end))
}

/// RFC 3339, or a bare `YYYY-MM-DD` date taken as midnight UTC
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, QueryError> {
    let trimmed = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| QueryError::InvalidTimestamp(raw.to_string()))
}

/// A value that is not an integer counts as absent; a non-positive one is rejected
fn parse_point_budget(raw: Option<&str>, default_points: usize) -> Result<usize, QueryError> {
    let Some(points) = raw.and_then(|raw| raw.trim().parse::<i64>().ok()) else {
        return Ok(default_points);
    };
    usize::try_from(points)
        .ok()
        .filter(|&points| points > 0)
        .ok_or_else(|| QueryError::InvalidPointBudget(points.to_string()))
}

/// Split comma-separated device arguments and validate each id
fn parse_devices(args: &[String]) -> Result<Vec<String>, QueryError> {
    let mut devices: Vec<String> = Vec::new();
    for id in args.iter().flat_map(|arg| arg.split(',')) {
        let id = id.trim();
        if !is_valid_device_id(id) {
            return Err(QueryError::InvalidDeviceId(id.to_string()));
        }
        if !devices.iter().any(|existing| existing == id) {
            devices.push(id.to_string());
        }
    }
    Ok(devices)
}

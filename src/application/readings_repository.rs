// Repository trait for raw reading storage
use crate::domain::readings::ReadingRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage-side filter for a readings query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Restrict to these identities; empty means every identity
    pub ids: Vec<String>,
}

#[async_trait]
pub trait ReadingsRepository: Send + Sync {
    /// Raw rows inside `[start, end]`, sorted by time
    async fn fetch_rows(&self, filter: &RowFilter) -> anyhow::Result<Vec<ReadingRow>>;

    /// Append rows as written at their own timestamps
    async fn write_readings(&self, rows: &[ReadingRow]) -> anyhow::Result<()>;
}

// In-memory repository used by handler tests
use crate::application::readings_repository::{ReadingsRepository, RowFilter};
use crate::domain::readings::ReadingRow;
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    rows: RwLock<Vec<ReadingRow>>,
}

impl MemoryRepository {
    pub fn new(mut rows: Vec<ReadingRow>) -> Self {
        rows.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl ReadingsRepository for MemoryRepository {
    async fn fetch_rows(&self, filter: &RowFilter) -> anyhow::Result<Vec<ReadingRow>> {
        let start_ms = filter.start.timestamp_millis() as f64;
        let end_ms = filter.end.timestamp_millis() as f64;
        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("memory repository lock poisoned"))?;
        Ok(rows
            .iter()
            .filter(|row| row.time_ms >= start_ms && row.time_ms <= end_ms)
            .filter(|row| filter.ids.is_empty() || filter.ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn write_readings(&self, new_rows: &[ReadingRow]) -> anyhow::Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow::anyhow!("memory repository lock poisoned"))?;
        rows.extend_from_slice(new_rows);
        rows.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Ok(())
    }
}

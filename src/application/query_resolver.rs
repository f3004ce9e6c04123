// Query resolver - groups storage rows per identity and downsamples each series
use super::downsampler::{downsample, DownsampleError};
use crate::domain::device::DeviceChannelId;
use crate::domain::readings::{DeviceTimeSeries, ReadingPoint, ReadingRow};
use crate::domain::sensor::FieldSelection;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Which identities a query without an explicit device list returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// Whole devices only
    #[default]
    None,
    /// Individual channels of multi-channel devices only
    Only,
    /// Both devices and their channels
    All,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid query mode: '{0}'")]
pub struct InvalidQueryMode(pub String);

impl FromStr for QueryMode {
    type Err = InvalidQueryMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            Ok(QueryMode::None)
        } else if s.eq_ignore_ascii_case("only") {
            Ok(QueryMode::Only)
        } else if s.eq_ignore_ascii_case("all") {
            Ok(QueryMode::All)
        } else {
            Err(InvalidQueryMode(s.to_string()))
        }
    }
}

impl QueryMode {
    fn admits(self, identity: &DeviceChannelId) -> bool {
        match self {
            QueryMode::None => !identity.is_channel(),
            QueryMode::Only => identity.is_channel(),
            QueryMode::All => true,
        }
    }
}

/// Per-query grouping and reduction settings
#[derive(Debug, Clone)]
pub struct QueryResolver {
    requested: Vec<String>,
    mode: QueryMode,
    selection: FieldSelection,
    num_points: usize,
}

impl QueryResolver {
    pub fn new(
        requested: Vec<String>,
        mode: QueryMode,
        selection: FieldSelection,
        num_points: usize,
    ) -> Self {
        Self {
            requested,
            mode,
            selection,
            num_points,
        }
    }

    /// Group `rows` (already in storage order) by identity and downsample each group.
    ///
    /// Every requested identity appears in the result, with an empty series if
    /// storage returned nothing for it.
    pub fn resolve(&self, rows: Vec<ReadingRow>) -> Result<Vec<DeviceTimeSeries>, DownsampleError> {
        let groups = self.group(rows);

        tracing::debug!(
            identities = groups.len(),
            num_points = self.num_points,
            "downsampling grouped series"
        );

        groups
            .into_iter()
            .map(|(id, points)| {
                let series = downsample(&points, self.num_points, &self.selection)?;
                Ok(DeviceTimeSeries::new(DeviceChannelId::parse(&id), series))
            })
            .collect()
    }

    fn group(&self, rows: Vec<ReadingRow>) -> Vec<(String, Vec<ReadingPoint>)> {
        let mut groups: Vec<(String, Vec<ReadingPoint>)> = Vec::new();
        let mut index_by_id: HashMap<String, usize> = HashMap::new();

        for id in &self.requested {
            if !index_by_id.contains_key(id) {
                index_by_id.insert(id.clone(), groups.len());
                groups.push((id.clone(), Vec::new()));
            }
        }
        let explicit = !self.requested.is_empty();

        for row in rows {
            let index = match index_by_id.get(&row.id) {
                Some(&index) => index,
                None if explicit => continue,
                None => {
                    if !self.mode.admits(&DeviceChannelId::parse(&row.id)) {
                        continue;
                    }
                    index_by_id.insert(row.id.clone(), groups.len());
                    groups.push((row.id, Vec::new()));
                    groups.len() - 1
                }
            };
            groups[index]
                .1
                .push(ReadingPoint::new(row.time_ms, row.values));
        }

        groups
    }
}

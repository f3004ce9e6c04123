// InfluxDB repository implementation
use crate::application::readings_repository::{ReadingsRepository, RowFilter};
use crate::domain::readings::ReadingRow;
use crate::domain::sensor::{SensorField, SensorValues};
use crate::infrastructure::config::{prepare_query, InfluxSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::HashMap;

const ROWS_QUERY: &str = "SELECT * FROM \"${measurement}\" WHERE time >= '${start}' AND time <= '${end}'${ids} ORDER BY time ASC";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl InfluxRepository {
    pub fn new(settings: InfluxSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token,
            database: settings.database,
            retention_policy: settings.retention_policy,
            measurement: settings.measurement,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=ms",
            self.host, self.database, self.retention_policy
        )
    }

    /// One line-protocol line per row, tagged by `id`. Rows without any
    /// finite value have no fields to write and are skipped.
    fn build_write_body(&self, rows: &[ReadingRow]) -> String {
        let measurement = escape_measurement(&self.measurement);
        let lines: Vec<String> = rows
            .iter()
            .filter_map(|row| {
                let fields: Vec<String> = SensorField::ALL
                    .into_iter()
                    .filter_map(|field| {
                        let value = row.values.get(field).filter(|value| value.is_finite())?;
                        Some(format!("{}={}", field.key(), value))
                    })
                    .collect();
                if fields.is_empty() {
                    return None;
                }
                Some(format!(
                    "{},id={} {} {}",
                    measurement,
                    escape_tag(&row.id),
                    fields.join(","),
                    row.time_ms.round() as i64
                ))
            })
            .collect();
        lines.join("\n")
    }

    fn build_rows_query(&self, filter: &RowFilter) -> String {
        let ids = if filter.ids.is_empty() {
            String::new()
        } else {
            let clauses: Vec<String> = filter
                .ids
                .iter()
                .map(|id| format!("\"id\" = '{}'", escape_literal(id)))
                .collect();
            format!(" AND ({})", clauses.join(" OR "))
        };

        let mut vars = HashMap::new();
        vars.insert("measurement".to_string(), self.measurement.replace('"', ""));
        vars.insert(
            "start".to_string(),
            filter.start.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        vars.insert(
            "end".to_string(),
            filter.end.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        vars.insert("ids".to_string(), ids);
        prepare_query(ROWS_QUERY, &vars)
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        check_response_error(&data)?;
        Ok(data)
    }
}

#[async_trait]
impl ReadingsRepository for InfluxRepository {
    async fn fetch_rows(&self, filter: &RowFilter) -> Result<Vec<ReadingRow>> {
        let query = self.build_rows_query(filter);
        tracing::debug!("Executing readings query: {}", query);

        let response = self.execute_query(&query).await?;
        let rows = rows_from_response(response);

        tracing::debug!(rows = rows.len(), "decoded readings rows");
        Ok(rows)
    }

    async fn write_readings(&self, rows: &[ReadingRow]) -> Result<()> {
        let body = self.build_write_body(rows);
        if body.is_empty() {
            tracing::debug!(rows = rows.len(), "no field values to write");
            return Ok(());
        }

        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed with status {}: {}", status, body);
        }

        tracing::debug!(rows = rows.len(), "wrote readings rows");
        Ok(())
    }
}

fn check_response_error(data: &InfluxQLResponse) -> Result<()> {
    if let Some(error) = data.results.iter().find_map(|r| r.error.as_ref()) {
        anyhow::bail!("InfluxDB query error: {}", error);
    }
    Ok(())
}

/// Escape a value for use inside a single-quoted InfluxQL string literal
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Decode every series in the first result into rows, dropping rows without a
/// usable time or id. Non-numeric field values are treated as unreported.
fn rows_from_response(response: InfluxQLResponse) -> Vec<ReadingRow> {
    let mut rows = Vec::new();
    let Some(series_list) = response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.series)
    else {
        return rows;
    };

    for series in series_list {
        let column = |name: &str| series.columns.iter().position(|c| c == name);
        let time_idx = column("time").unwrap_or(0);
        let id_idx = column("id");
        let tag_id = series
            .tags
            .as_ref()
            .and_then(|tags| tags.get("id"))
            .cloned();
        let field_columns: Vec<(SensorField, usize)> = series
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| SensorField::from_key(name).map(|field| (field, idx)))
            .collect();

        for value_row in &series.values {
            let Some(time_ms) = value_row.get(time_idx).and_then(parse_time_ms) else {
                continue;
            };
            let id = id_idx
                .and_then(|idx| value_row.get(idx))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .or_else(|| tag_id.clone());
            let Some(id) = id else {
                continue;
            };

            let mut values = SensorValues::new();
            for &(field, idx) in &field_columns {
                values.set(field, value_row.get(idx).and_then(serde_json::Value::as_f64));
            }
            rows.push(ReadingRow::new(id, time_ms, values));
        }
    }

    rows
}

/// RFC 3339 string, or a number already in epoch milliseconds
fn parse_time_ms(value: &serde_json::Value) -> Option<f64> {
    if let Some(ms) = value.as_f64() {
        return Some(ms);
    }
    let time = chrono::DateTime::parse_from_rfc3339(value.as_str()?).ok()?;
    Some(time.timestamp_micros() as f64 / 1000.0)
}

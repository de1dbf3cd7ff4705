//! Mobility loading: fetches yearly regional mobility extracts and
//! concatenates them into one observation table.

use bytes::Bytes;
use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::fetch::{HttpClient, fetch_source};

/// Suffix shared by every percent-change metric column.
pub const METRIC_SUFFIX: &str = "_percent_change_from_baseline";

const DATE_COLUMN: &str = "date";

/// One region on one reporting date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub row_id: usize,
    pub region: String,
    pub date: Option<NaiveDate>,
    /// Values aligned with [`ObservationTable::metric_columns`].
    pub metrics: Vec<Option<f64>>,
}

/// Concatenated observations from every source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    metric_columns: Vec<String>,
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(metric_columns: Vec<String>) -> Self {
        Self {
            metric_columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, assigning the next sequential row id. `metrics` shorter
    /// than the column list is padded with missing values.
    pub fn push(&mut self, region: impl Into<String>, date: Option<NaiveDate>, mut metrics: Vec<Option<f64>>) {
        metrics.resize(self.metric_columns.len(), None);
        self.rows.push(Observation {
            row_id: self.rows.len(),
            region: region.into(),
            date,
            metrics,
        });
    }

    /// Concatenates `other` below this table. Metric columns are unioned by
    /// name; a column one side lacks is missing for that side's rows. Row ids
    /// are reassigned.
    pub fn append(&mut self, other: ObservationTable) {
        let mut mapping = Vec::with_capacity(other.metric_columns.len());
        for column in other.metric_columns {
            let idx = match self.metric_index(&column) {
                Some(idx) => idx,
                None => {
                    self.metric_columns.push(column);
                    for row in &mut self.rows {
                        row.metrics.push(None);
                    }
                    self.metric_columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.metric_columns.len();
        for row in other.rows {
            let mut metrics = vec![None; width];
            for (j, value) in row.metrics.into_iter().enumerate() {
                metrics[mapping[j]] = value;
            }
            self.push(row.region, row.date, metrics);
        }
    }

    pub fn metric_columns(&self) -> &[String] {
        &self.metric_columns
    }

    pub fn metric_index(&self, column: &str) -> Option<usize> {
        self.metric_columns.iter().position(|c| c == column)
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest reporting dates, if any row is dated.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

/// Fetches every source in order and concatenates them.
///
/// Any single failure aborts the whole load; there is no partial result.
#[tracing::instrument(skip(client, sources), fields(sources = sources.len()))]
pub async fn load_mobility<C: HttpClient>(
    client: &C,
    sources: &[String],
    region_column: &str,
) -> Result<ObservationTable, LoadError> {
    let mut table = ObservationTable::empty();

    for source in sources {
        let bytes = fetch_source(client, source).await?;
        let part = parse_csv(source, &bytes, region_column)?;
        info!(source = %source, rows = part.len(), "Mobility source loaded");
        table.append(part);
    }

    info!(
        rows = table.len(),
        metric_columns = table.metric_columns().len(),
        "Mobility sources concatenated"
    );
    Ok(table)
}

/// Fixed fields of one row, projected out of the full record.
#[derive(Debug, Deserialize)]
struct RowKey {
    region: String,
    date: Option<NaiveDate>,
}

/// Parses one CSV extract. `label` names the source in errors.
///
/// The region column is required. Columns ending in
/// `_percent_change_from_baseline` become metrics, with empty cells treated
/// as missing. A `date` column is parsed when present.
pub fn parse_csv(label: &str, bytes: &Bytes, region_column: &str) -> Result<ObservationTable, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: label.to_string(),
        source,
    };
    let mut rdr = csv::Reader::from_reader(&bytes[..]);
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let region_idx = headers
        .iter()
        .position(|h| h == region_column)
        .ok_or_else(|| LoadError::MissingColumn {
            column: region_column.to_string(),
            context: label.to_string(),
        })?;
    let date_idx = headers.iter().position(|h| h == DATE_COLUMN);
    let metric_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.ends_with(METRIC_SUFFIX))
        .map(|(i, _)| i)
        .collect();

    let key_headers = StringRecord::from(vec!["region", DATE_COLUMN]);
    let key_columns = [region_column, DATE_COLUMN];
    let metric_columns: Vec<&str> = metric_idx.iter().map(|&i| &headers[i]).collect();

    let mut table = ObservationTable::new(metric_columns.iter().map(|c| c.to_string()).collect());

    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let cell = |i: Option<usize>| i.and_then(|i| record.get(i)).unwrap_or("");

        let key_cells = StringRecord::from(vec![cell(Some(region_idx)), cell(date_idx).trim()]);
        // Region is a plain string, so only the date can fail here.
        let key: RowKey = key_cells
            .deserialize(Some(&key_headers))
            .map_err(|e| invalid_cell(e, label, row, &key_columns, &key_cells, 1))?;

        let metric_cells: StringRecord = metric_idx.iter().map(|&i| cell(Some(i)).trim()).collect();
        let metrics: Vec<Option<f64>> = metric_cells
            .deserialize(None)
            .map_err(|e| invalid_cell(e, label, row, &metric_columns, &metric_cells, 0))?;

        table.push(key.region, key.date, metrics);
    }

    debug!(source = label, rows = table.len(), "CSV parsed");
    Ok(table)
}

/// Turns a row deserialization failure into [`LoadError::InvalidValue`] naming
/// the offending column. `fallback` is used when csv cannot tell which field
/// failed.
fn invalid_cell(
    err: csv::Error,
    label: &str,
    row: usize,
    columns: &[&str],
    cells: &StringRecord,
    fallback: usize,
) -> LoadError {
    let field = match err.kind() {
        csv::ErrorKind::Deserialize { err: de, .. } => de.field().map_or(fallback, |f| f as usize),
        _ => {
            return LoadError::Csv {
                path: label.to_string(),
                source: err,
            };
        }
    };
    LoadError::InvalidValue {
        path: label.to_string(),
        column: columns.get(field).copied().unwrap_or_default().to_string(),
        row,
        value: cells.get(field).unwrap_or_default().to_string(),
    }
}

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::mobility::ObservationTable;
use crate::stats::MeanAccumulator;

/// Time-averaged metric for one region-name value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    /// Region name exactly as it appeared in the observations.
    pub region: String,
    pub mean: Option<f64>,
    /// Non-missing observations behind `mean`.
    pub observations: usize,
}

impl AggregateRecord {
    /// Join key: the region name with surrounding whitespace removed.
    pub fn key(&self) -> &str {
        self.region.trim()
    }
}

/// One row per distinct region name, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTable {
    pub metric: String,
    pub rows: Vec<AggregateRecord>,
}

impl AggregateTable {
    pub fn empty(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups `table` by region name and averages `metric` across all dates.
///
/// Missing values are ignored; a region with no non-missing value still gets
/// a row, with a missing mean. An empty input yields an empty output. A
/// metric column the table does not carry is a [`LoadError::MissingColumn`].
pub fn aggregate_by_region(table: &ObservationTable, metric: &str) -> Result<AggregateTable, LoadError> {
    if table.is_empty() {
        debug!("No observations to aggregate");
        return Ok(AggregateTable::empty(metric));
    }

    let idx = table
        .metric_index(metric)
        .ok_or_else(|| LoadError::MissingColumn {
            column: metric.to_string(),
            context: "observation table".to_string(),
        })?;

    let mut groups: BTreeMap<&str, MeanAccumulator> = BTreeMap::new();
    for row in table.rows() {
        groups
            .entry(row.region.as_str())
            .or_default()
            .push(row.metrics[idx]);
    }

    let rows: Vec<AggregateRecord> = groups
        .into_iter()
        .map(|(region, acc)| AggregateRecord {
            region: region.to_string(),
            mean: acc.mean(),
            observations: acc.count(),
        })
        .collect();

    info!(
        metric,
        regions = rows.len(),
        without_data = rows.iter().filter(|r| r.mean.is_none()).count(),
        "Observations aggregated by region"
    );

    Ok(AggregateTable {
        metric: metric.to_string(),
        rows,
    })
}

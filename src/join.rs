//! Left attribute join of boundary geometry with aggregated metrics.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::AggregateTable;
use crate::boundary::BoundaryTable;
use crate::geometry::MultiPolygon;

/// A boundary row with the metric attached, if one matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub name: String,
    pub geometry: MultiPolygon,
    pub metric: Option<f64>,
}

/// Boundary rows plus, when the join ran, the name of the attached column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedTable {
    metric_column: Option<String>,
    rows: Vec<JoinedRecord>,
}

impl JoinedTable {
    /// The boundary rows unchanged, with no metric column.
    pub fn passthrough(boundaries: BoundaryTable) -> Self {
        Self {
            metric_column: None,
            rows: boundaries
                .into_rows()
                .into_iter()
                .map(|b| JoinedRecord {
                    name: b.name,
                    geometry: b.geometry,
                    metric: None,
                })
                .collect(),
        }
    }

    pub fn metric_column(&self) -> Option<&str> {
        self.metric_column.as_deref()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.metric_column() == Some(column)
    }

    pub fn rows(&self) -> &[JoinedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that received a metric value.
    pub fn matched(&self) -> usize {
        self.rows.iter().filter(|r| r.metric.is_some()).count()
    }
}

/// Attaches each aggregate's mean to the boundary whose name equals the
/// aggregate's trimmed region name.
///
/// The result always has exactly one row per boundary. If either side is
/// empty the join is skipped and the boundaries pass through without a metric
/// column. When several aggregates trim to the same key, the first in name
/// order wins.
pub fn left_join(boundaries: BoundaryTable, aggregates: &AggregateTable) -> JoinedTable {
    if boundaries.is_empty() || aggregates.is_empty() {
        info!(
            boundaries = boundaries.len(),
            aggregates = aggregates.len(),
            "Join skipped, an input table is empty"
        );
        return JoinedTable::passthrough(boundaries);
    }

    let mut lookup: HashMap<&str, Option<f64>> = HashMap::with_capacity(aggregates.len());
    for record in &aggregates.rows {
        if lookup.contains_key(record.key()) {
            warn!(key = record.key(), region = %record.region, "Duplicate join key after trimming, keeping first");
            continue;
        }
        lookup.insert(record.key(), record.mean);
    }

    let rows: Vec<JoinedRecord> = boundaries
        .into_rows()
        .into_iter()
        .map(|b| {
            let metric = lookup.get(b.name.as_str()).copied().flatten();
            JoinedRecord {
                name: b.name,
                geometry: b.geometry,
                metric,
            }
        })
        .collect();

    let table = JoinedTable {
        metric_column: Some(aggregates.metric.clone()),
        rows,
    };
    if table.matched() == 0 {
        warn!(
            rows = table.len(),
            metric = %aggregates.metric,
            "No boundary row matched an aggregate region"
        );
    } else {
        info!(
            rows = table.len(),
            matched = table.matched(),
            metric = %aggregates.metric,
            "Boundaries joined with aggregates"
        );
    }
    table
}

//! Status output for intermediate tables.
//!
//! Supports a short preview of the filtered boundary table and JSON dumps of
//! serializable tables at debug level.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::boundary::BoundaryTable;

/// Logs up to `n` rows of the boundary table, or a notice when it is empty.
pub fn print_boundary_preview(table: &BoundaryTable, n: usize) {
    if table.is_empty() {
        warn!("Boundary table is empty. Check the boundary file and filter criteria");
        return;
    }

    info!(rows = table.len(), "Loaded boundary table");
    for row in table.head(n) {
        let bounds = row
            .geometry
            .bounds()
            .map(|b| format!("[{:.2}, {:.2}, {:.2}, {:.2}]", b.min_x, b.min_y, b.max_x, b.max_y))
            .unwrap_or_else(|| "-".to_string());
        info!(
            name = %row.name,
            polygons = row.geometry.polygons().len(),
            bounds = %bounds,
            "Boundary row"
        );
    }
}

/// Logs `value` as pretty-printed JSON at debug level.
pub fn print_json(label: &str, value: &impl Serialize) -> Result<()> {
    debug!("{label}: {}", serde_json::to_string_pretty(value)?);
    Ok(())
}

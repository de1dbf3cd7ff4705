use std::path::PathBuf;

use crate::render::RenderOptions;

pub const DEFAULT_BOUNDARY_PATH: &str = "data/ne_10m_admin_0_countries.shp";
pub const DEFAULT_NAME_FIELD: &str = "ADMIN";
pub const DEFAULT_COUNTRY: &str = "Indonesia";
pub const DEFAULT_REGION_COLUMN: &str = "sub_region_1";
pub const DEFAULT_METRIC: &str = "workplaces_percent_change_from_baseline";
pub const DEFAULT_OUTPUT: &str = "output/workplace_mobility.svg";
pub const DEFAULT_TITLE: &str = "Workplace Mobility Trends Across Provinces";
pub const DEFAULT_LEGEND_LABEL: &str = "Workplace Mobility Change (%)";

/// Yearly regional mobility extracts, one per reporting year.
pub const DEFAULT_SOURCES: [&str; 3] = [
    "data/2020_ID_Region_Mobility_Report.csv",
    "data/2021_ID_Region_Mobility_Report.csv",
    "data/2022_ID_Region_Mobility_Report.csv",
];

/// Every input and presentation constant of a dashboard run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub boundary_path: PathBuf,
    /// Boundary attribute compared against `country`.
    pub name_field: String,
    pub country: String,
    /// Local paths or HTTP(S) URLs, concatenated in order.
    pub sources: Vec<String>,
    pub region_column: String,
    pub metric: String,
    pub render: RenderOptions,
    /// Boundary rows shown in the status preview.
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            boundary_path: PathBuf::from(DEFAULT_BOUNDARY_PATH),
            name_field: DEFAULT_NAME_FIELD.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            region_column: DEFAULT_REGION_COLUMN.to_string(),
            metric: DEFAULT_METRIC.to_string(),
            render: RenderOptions {
                output: PathBuf::from(DEFAULT_OUTPUT),
                title: DEFAULT_TITLE.to_string(),
                legend_label: DEFAULT_LEGEND_LABEL.to_string(),
                width: 1200,
                height: 1000,
            },
            preview_rows: 5,
        }
    }
}

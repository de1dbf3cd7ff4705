//! Error types for the loading and rendering stages.

use std::io;

/// Failure while loading or reshaping a table.
///
/// Every variant is recoverable at the pipeline level: the caller reports it
/// and substitutes an empty table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error fetching '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("unsupported boundary format: '{0}'")]
    UnsupportedFormat(String),

    /// An expected attribute or column is absent.
    #[error("missing column '{column}' in {context}")]
    MissingColumn { column: String, context: String },

    /// A cell could not be parsed into the column's type.
    #[error("invalid value '{value}' for column '{column}' in '{path}' (row {row})")]
    InvalidValue {
        path: String,
        column: String,
        row: usize,
        value: String,
    },
}

/// Failure while drawing the choropleth.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("joined table is empty")]
    EmptyTable,

    #[error("joined table has no '{0}' column")]
    MissingColumn(String),

    #[error("IO error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("drawing failed: {0}")]
    Drawing(String),
}

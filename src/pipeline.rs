//! The five-stage dashboard workflow: load boundaries, load mobility data,
//! aggregate, join, render.
//!
//! Every stage catches its own failure, records it in the [`PipelineReport`]
//! and hands an empty or pass-through value to the next stage. [`run`] itself
//! never fails.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::aggregate::{AggregateTable, aggregate_by_region};
use crate::boundary::{BoundaryTable, load_boundaries};
use crate::config::PipelineConfig;
use crate::error::RenderError;
use crate::fetch::HttpClient;
use crate::join::{JoinedTable, left_join};
use crate::mobility::{ObservationTable, load_mobility};
use crate::output::{print_boundary_preview, print_json};
use crate::render::render_choropleth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Boundary,
    Mobility,
    Aggregate,
    Join,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Boundary => "boundary",
            Stage::Mobility => "mobility",
            Stage::Aggregate => "aggregate",
            Stage::Join => "join",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

/// What happened in one stage, with a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(String),
    /// The stage had nothing to work on.
    Skipped(String),
    /// The stage hit an error; its output was replaced by an empty value.
    Failed(String),
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StageOutcome::Completed(d) | StageOutcome::Skipped(d) | StageOutcome::Failed(d) => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Per-stage outcomes plus the row counts that flowed between stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub boundary_rows: usize,
    pub observation_rows: usize,
    pub aggregate_rows: usize,
    pub joined_rows: usize,
    pub matched_rows: usize,
    pub figure: Option<PathBuf>,
}

impl PipelineReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Records `outcome` and emits it as a status line.
    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        match &outcome {
            StageOutcome::Completed(detail) => info!(%stage, detail = %detail, "Stage completed"),
            StageOutcome::Skipped(detail) => warn!(%stage, detail = %detail, "Stage skipped"),
            StageOutcome::Failed(detail) => error!(%stage, detail = %detail, "Stage failed"),
        }
        self.stages.push(StageReport { stage, outcome });
    }
}

/// Runs the whole workflow described by `config`.
#[tracing::instrument(skip_all, fields(country = %config.country, metric = %config.metric))]
pub async fn run<C: HttpClient>(client: &C, config: &PipelineConfig) -> PipelineReport {
    let mut report = PipelineReport::default();

    let boundaries = boundary_stage(config, &mut report);
    let observations = mobility_stage(client, config, &mut report).await;
    let aggregates = aggregate_stage(&observations, config, &mut report);
    drop(observations);
    let joined = join_stage(boundaries, &aggregates, config, &mut report);
    render_stage(&joined, config, &mut report);

    info!(
        stages_completed = report.stages.iter().filter(|s| s.outcome.is_completed()).count(),
        figure = report.figure.is_some(),
        "Pipeline finished"
    );
    report
}

fn boundary_stage(config: &PipelineConfig, report: &mut PipelineReport) -> BoundaryTable {
    let (table, outcome) = match load_boundaries(&config.boundary_path, &config.name_field, &config.country) {
        Ok(table) => {
            let detail = format!("{} row(s) match {}={}", table.len(), config.name_field, config.country);
            (table, StageOutcome::Completed(detail))
        }
        Err(e) => (
            BoundaryTable::empty(),
            StageOutcome::Failed(format!("error loading boundary file: {e}")),
        ),
    };
    report.record(Stage::Boundary, outcome);
    print_boundary_preview(&table, config.preview_rows);
    report.boundary_rows = table.len();
    table
}

async fn mobility_stage<C: HttpClient>(
    client: &C,
    config: &PipelineConfig,
    report: &mut PipelineReport,
) -> ObservationTable {
    let (table, outcome) = match load_mobility(client, &config.sources, &config.region_column).await {
        Ok(table) => {
            let span = match table.date_range() {
                Some((first, last)) => format!(" from {first} to {last}"),
                None => String::new(),
            };
            let detail = format!(
                "{} observation(s) from {} source(s){span}",
                table.len(),
                config.sources.len()
            );
            (table, StageOutcome::Completed(detail))
        }
        Err(e) => (
            ObservationTable::empty(),
            StageOutcome::Failed(format!("error loading mobility data: {e}")),
        ),
    };
    report.record(Stage::Mobility, outcome);
    report.observation_rows = table.len();
    table
}

fn aggregate_stage(
    observations: &ObservationTable,
    config: &PipelineConfig,
    report: &mut PipelineReport,
) -> AggregateTable {
    let (table, outcome) = if observations.is_empty() {
        (
            AggregateTable::empty(&config.metric),
            StageOutcome::Skipped("observation table is empty".to_string()),
        )
    } else {
        match aggregate_by_region(observations, &config.metric) {
            Ok(table) => {
                let detail = format!("{} region(s) averaged over {}", table.len(), config.metric);
                (table, StageOutcome::Completed(detail))
            }
            Err(e) => (
                AggregateTable::empty(&config.metric),
                StageOutcome::Failed(format!("error aggregating: {e}")),
            ),
        }
    };
    report.record(Stage::Aggregate, outcome);
    if let Err(e) = print_json("aggregates", &table) {
        warn!(error = %e, "Could not serialize aggregate table");
    }
    report.aggregate_rows = table.len();
    table
}

fn join_stage(
    boundaries: BoundaryTable,
    aggregates: &AggregateTable,
    config: &PipelineConfig,
    report: &mut PipelineReport,
) -> JoinedTable {
    let joined = left_join(boundaries, aggregates);
    let outcome = if !joined.has_column(&config.metric) {
        StageOutcome::Skipped(format!(
            "join skipped ({} boundary row(s), {} aggregate row(s))",
            joined.len(),
            aggregates.len()
        ))
    } else if joined.matched() == 0 {
        StageOutcome::Completed(format!(
            "no boundary row matched an aggregate region ({} row(s) kept)",
            joined.len()
        ))
    } else {
        StageOutcome::Completed(format!("{} of {} row(s) matched", joined.matched(), joined.len()))
    };
    report.record(Stage::Join, outcome);
    report.joined_rows = joined.len();
    report.matched_rows = joined.matched();
    joined
}

fn render_stage(joined: &JoinedTable, config: &PipelineConfig, report: &mut PipelineReport) {
    let outcome = match render_choropleth(joined, &config.metric, &config.render) {
        Ok(path) => {
            let detail = format!("figure written to {}", path.display());
            report.figure = Some(path);
            StageOutcome::Completed(detail)
        }
        Err(e @ (RenderError::EmptyTable | RenderError::MissingColumn(_))) => {
            StageOutcome::Skipped(format!("cannot plot: {e}"))
        }
        Err(e) => StageOutcome::Failed(format!("error during plot: {e}")),
    };
    report.record(Stage::Render, outcome);
}

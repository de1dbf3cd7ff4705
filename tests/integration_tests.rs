use mobility_choropleth::aggregate::aggregate_by_region;
use mobility_choropleth::boundary::load_boundaries;
use mobility_choropleth::config::PipelineConfig;
use mobility_choropleth::fetch::BasicClient;
use mobility_choropleth::join::left_join;
use mobility_choropleth::mobility::load_mobility;
use mobility_choropleth::pipeline::{self, Stage, StageOutcome};
use std::env;
use std::fs;
use std::path::PathBuf;

const METRIC: &str = "workplaces_percent_change_from_baseline";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sources() -> Vec<String> {
    ["mobility_2020.csv", "mobility_2021.csv", "mobility_2022.csv"]
        .iter()
        .map(|n| fixture(n).display().to_string())
        .collect()
}

fn config(output: &str) -> PipelineConfig {
    let mut config = PipelineConfig {
        boundary_path: fixture("countries.geojson"),
        sources: sources(),
        ..PipelineConfig::default()
    };
    config.render.output = env::temp_dir()
        .join("mobility_choropleth_it")
        .join(output);
    config
}

#[tokio::test]
async fn test_full_pipeline() {
    let config = config("full.svg");
    let report = pipeline::run(&BasicClient::new(), &config).await;

    assert_eq!(report.stages.len(), 5);
    assert!(report.stages.iter().all(|s| s.outcome.is_completed()));
    assert_eq!(report.boundary_rows, 1);
    assert_eq!(report.observation_rows, 9);
    assert_eq!(report.aggregate_rows, 4);
    assert_eq!(report.joined_rows, 1);
    assert_eq!(report.matched_rows, 1);

    let figure = report.figure.expect("figure should be rendered");
    let svg = fs::read_to_string(&figure).unwrap();
    assert!(svg.contains("Workplace Mobility Trends Across Provinces"));
    fs::remove_file(&figure).unwrap();
}

#[tokio::test]
async fn test_concatenated_rows_equal_sum_of_sources() {
    let client = BasicClient::new();
    let all = load_mobility(&client, &sources(), "sub_region_1").await.unwrap();

    let mut sum = 0;
    for source in sources() {
        sum += load_mobility(&client, &[source], "sub_region_1")
            .await
            .unwrap()
            .len();
    }

    assert_eq!(all.len(), sum);
    assert_eq!(all.rows().last().unwrap().row_id, sum - 1);
}

#[tokio::test]
async fn test_trimmed_region_joins_country_boundary() {
    let boundaries = load_boundaries(&fixture("countries.geojson"), "ADMIN", "Indonesia").unwrap();
    let observations = load_mobility(&BasicClient::new(), &sources(), "sub_region_1")
        .await
        .unwrap();
    let aggregates = aggregate_by_region(&observations, METRIC).unwrap();

    let national = aggregates.rows.iter().find(|r| r.region.is_empty()).unwrap();
    assert_eq!(national.mean, Some(-2.5));

    let joined = left_join(boundaries, &aggregates);
    assert_eq!(joined.len(), 1);
    assert_eq!(joined.rows()[0].name, "Indonesia");
    assert_eq!(joined.rows()[0].metric, Some(-12.5));
}

#[tokio::test]
async fn test_one_failing_source_empties_mobility() {
    let mut config = config("failing_source.svg");
    config.sources[1] = fixture("missing_2021.csv").display().to_string();

    let report = pipeline::run(&BasicClient::new(), &config).await;

    assert!(matches!(report.outcome(Stage::Mobility), Some(StageOutcome::Failed(_))));
    assert_eq!(report.observation_rows, 0);
    assert!(matches!(report.outcome(Stage::Aggregate), Some(StageOutcome::Skipped(_))));
    assert!(matches!(report.outcome(Stage::Join), Some(StageOutcome::Skipped(_))));
    assert_eq!(report.joined_rows, report.boundary_rows);

    let render = report.outcome(Stage::Render).unwrap();
    assert!(matches!(render, StageOutcome::Skipped(_)));
    assert!(render.detail().starts_with("cannot plot"));
    assert!(report.figure.is_none());
}

#[tokio::test]
async fn test_unknown_country_still_completes() {
    let mut config = config("unknown_country.svg");
    config.country = "Atlantis".to_string();

    let report = pipeline::run(&BasicClient::new(), &config).await;

    assert!(report.outcome(Stage::Boundary).unwrap().is_completed());
    assert_eq!(report.boundary_rows, 0);
    assert_eq!(report.joined_rows, 0);
    assert!(matches!(report.outcome(Stage::Render), Some(StageOutcome::Skipped(_))));
}

#[tokio::test]
async fn test_missing_boundary_file_fails_safe() {
    let mut config = config("missing_boundary.svg");
    config.boundary_path = fixture("missing.shp");

    let report = pipeline::run(&BasicClient::new(), &config).await;

    assert!(matches!(report.outcome(Stage::Boundary), Some(StageOutcome::Failed(_))));
    assert!(report.outcome(Stage::Mobility).unwrap().is_completed());
    assert_eq!(report.aggregate_rows, 4);
    assert!(report.figure.is_none());
}

#[tokio::test]
async fn test_unknown_metric_fails_aggregate_only() {
    let mut config = config("unknown_metric.svg");
    config.metric = "parks_percent_change_from_baseline".to_string();

    let report = pipeline::run(&BasicClient::new(), &config).await;

    assert!(report.outcome(Stage::Mobility).unwrap().is_completed());
    assert!(matches!(report.outcome(Stage::Aggregate), Some(StageOutcome::Failed(_))));
    assert_eq!(report.joined_rows, 1);
    assert!(matches!(report.outcome(Stage::Render), Some(StageOutcome::Skipped(_))));
}

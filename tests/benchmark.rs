// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! End to end benchmark behaviour through the public API

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int64Array, RecordBatch, StringArray};
use datafusion::error::{DataFusionError, Result};
use datafusion::prelude::SessionConfig;
use scale_bench::datagen::{self, dim_schema, fact_schema, write_parquet};
use scale_bench::engine::{region_aggregates, RegionAggregate};
use scale_bench::{
    BenchmarkRunner, Engine, EngineSelector, ResultStore, RunPlan, Scenario,
    ScenarioSelector,
};

fn config() -> SessionConfig {
    SessionConfig::new().with_target_partitions(2)
}

/// Writes a small hand-made scenario with a known query result
fn write_scenario(data_dir: &Path, scenario: Scenario) -> Result<()> {
    let files = scenario.files(data_dir);
    let fact = RecordBatch::try_new(
        fact_schema(),
        vec![
            Arc::new(StringArray::from(vec![
                "content_000000",
                "content_000001",
                "content_000002",
                "content_000000",
                "content_000001",
                "content_000009",
                "content_000001",
            ])),
            Arc::new(Date32Array::from(vec![19_723; 7])),
            Arc::new(StringArray::from(vec!["BR", "BR", "BR", "US", "US", "ES", "DE"])),
            Arc::new(Int64Array::from(vec![10, 20, 1_000, 5, 7, 999, 40])),
            Arc::new(Float64Array::from(vec![1.0, 3.0, 9.0, 2.0, 4.0, 5.0, 6.0])),
            Arc::new(StringArray::from(vec![
                "Completed",
                "Processing",
                "Failed",
                "Completed",
                "Failed",
                "Completed",
                "Completed",
            ])),
        ],
    )?;
    let dim = RecordBatch::try_new(
        dim_schema(),
        vec![
            Arc::new(StringArray::from(vec![
                "content_000000",
                "content_000001",
                "content_000002",
            ])),
            Arc::new(StringArray::from(vec!["Rust", "Data", "AI"])),
        ],
    )?;
    write_parquet(&files.fact, &[fact])?;
    write_parquet(&files.dim, &[dim])?;
    Ok(())
}

fn aggregate(region: &str, views: i64, engagement_score: f64) -> RegionAggregate {
    RegionAggregate {
        region_country: Some(region.to_string()),
        views: Some(views),
        engagement_score: Some(engagement_score),
    }
}

fn stored_rows(store: &ResultStore, engine: Engine) -> Result<usize> {
    Ok(store.read(engine)?.iter().map(|b| b.num_rows()).sum())
}

#[tokio::test]
async fn engines_agree_on_the_query_result() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_scenario(dir.path(), Scenario::Small)?;
    let files = Scenario::Small.files(dir.path());

    // failed rows and unmatched content ids are dropped, US keeps its
    // completed row only
    let expected = vec![
        aggregate("DE", 40, 6.0),
        aggregate("BR", 30, 2.0),
        aggregate("US", 5, 2.0),
    ];
    for engine in Engine::ALL {
        let batches = engine.execute(&files.fact, &files.dim, &config()).await?;
        assert_eq!(region_aggregates(&batches)?, expected, "engine {engine}");
    }
    Ok(())
}

#[tokio::test]
async fn matrix_completes_with_missing_scenario() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_scenario(dir.path(), Scenario::Small)?;
    write_scenario(dir.path(), Scenario::Large)?;
    let store = ResultStore::new(dir.path().join("results"));
    let runner = BenchmarkRunner::new(dir.path(), store.clone(), config());

    let plan = RunPlan::new(ScenarioSelector::All, EngineSelector::All);
    let run = runner.run(&plan).await?;

    for engine in Engine::ALL {
        let scenarios: Vec<_> = run
            .engine_results(engine)
            .iter()
            .map(|r| r.scenario())
            .collect();
        assert_eq!(scenarios, vec![Scenario::Small, Scenario::Large]);
        assert_eq!(stored_rows(&store, engine)?, 2);
    }
    Ok(())
}

#[tokio::test]
async fn successive_runs_append() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_scenario(dir.path(), Scenario::Medium)?;
    let store = ResultStore::new(dir.path().join("results"));
    let runner = BenchmarkRunner::new(dir.path(), store.clone(), config());
    let plan = RunPlan::new(ScenarioSelector::One(Scenario::Medium), EngineSelector::All);

    runner.run(&plan.clone().with_run_label("first")).await?;
    let run = runner
        .run(&plan.with_run_label("second").with_runs(NonZeroUsize::MIN))
        .await?;

    for engine in Engine::ALL {
        assert_eq!(stored_rows(&store, engine)?, 2);
        assert_eq!(run.engine_results(engine)[0].run_label(), "second");
    }
    Ok(())
}

#[tokio::test]
async fn generated_small_scenario_on_datafusion() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let data_dir = dir.path().join("data");
    datagen::generate(&data_dir, Scenario::Small)?;

    let store = ResultStore::new(dir.path().join("results"));
    let runner = BenchmarkRunner::new(&data_dir, store.clone(), config());
    let plan = RunPlan::new(
        ScenarioSelector::One(Scenario::Small),
        EngineSelector::One(Engine::DataFusion),
    );
    let run = runner.run(&plan).await?;

    let results = run.engine_results(Engine::DataFusion);
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.scenario(), Scenario::Small);
    assert!(result.time_seconds() > 0.0);
    assert!(result.memory_mb() > 0.0);
    assert!(result.environment().cpu_count >= 1);

    assert_eq!(stored_rows(&store, Engine::DataFusion)?, 1);
    assert!(store.read(Engine::Eager)?.is_empty());
    Ok(())
}

#[test]
fn invalid_selectors_are_rejected() {
    let err = "spark".parse::<EngineSelector>().unwrap_err();
    assert!(matches!(err, DataFusionError::Configuration(_)));

    let err = "tiny".parse::<ScenarioSelector>().unwrap_err();
    assert!(matches!(err, DataFusionError::Configuration(_)));
}

#[tokio::test]
async fn failing_engine_aborts_with_context() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = Scenario::Small.files(dir.path());
    std::fs::write(&files.fact, b"not parquet")?;
    std::fs::write(&files.dim, b"not parquet")?;

    let store = ResultStore::new(dir.path().join("results"));
    let runner = BenchmarkRunner::new(dir.path(), store, config());
    let plan = RunPlan::new(
        ScenarioSelector::One(Scenario::Small),
        EngineSelector::One(Engine::EagerArrow),
    );
    let err = runner.run(&plan).await.unwrap_err();
    assert!(matches!(err, DataFusionError::Context(_, _)));
    assert!(err
        .to_string()
        .contains("eager-arrow benchmark on scenario small failed"));
    assert!(!dir.path().join("results").exists());
    Ok(())
}

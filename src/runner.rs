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

//! Runs every requested (scenario, engine) pair, measures it and stores the
//! results

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::util::pretty;
use datafusion::common::{config_err, Result};
use datafusion::error::DataFusionError;
use datafusion::prelude::SessionConfig;
use serde::Serialize;

use crate::engine::{Engine, EngineSelector};
use crate::result::{to_summary_batch, BenchmarkResult};
use crate::scenario::{Scenario, ScenarioFiles, ScenarioSelector};
use crate::store::ResultStore;
use crate::util::{measure, memory, EnvironmentSnapshot};

/// Which scenarios and engines to run, and how often
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub scenarios: Vec<Scenario>,
    pub engines: Vec<Engine>,
    /// Free text stored with every result, may be empty
    pub run_label: String,
    /// Number of times the whole matrix is executed
    pub runs: NonZeroUsize,
}

impl RunPlan {
    pub fn new(scenarios: ScenarioSelector, engines: EngineSelector) -> Self {
        Self {
            scenarios: scenarios.scenarios(),
            engines: engines.engines(),
            run_label: String::new(),
            runs: NonZeroUsize::MIN,
        }
    }

    pub fn with_run_label(mut self, run_label: impl Into<String>) -> Self {
        self.run_label = run_label.into();
        self
    }

    pub fn with_runs(mut self, runs: NonZeroUsize) -> Self {
        self.runs = runs;
        self
    }
}

/// Results of the final iteration of a run, grouped by engine
#[derive(Debug, Default, Serialize)]
pub struct BenchmarkRun {
    results: BTreeMap<Engine, Vec<BenchmarkResult>>,
}

impl BenchmarkRun {
    pub fn results(&self) -> &BTreeMap<Engine, Vec<BenchmarkResult>> {
        &self.results
    }

    /// Results of `engine`, in scenario order
    pub fn engine_results(&self, engine: Engine) -> &[BenchmarkResult] {
        self.results.get(&engine).map(Vec::as_slice).unwrap_or_default()
    }

    /// Scenario, time and memory of every engine that produced results
    pub fn summary(&self) -> Result<Vec<(Engine, RecordBatch)>> {
        self.results
            .iter()
            .filter(|(_, results)| !results.is_empty())
            .map(|(engine, results)| Ok((*engine, to_summary_batch(results)?)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self).map_err(|e| DataFusionError::External(Box::new(e)))
    }

    /// Write the results as JSON to `maybe_path` if given
    pub fn maybe_write_json(&self, maybe_path: Option<impl AsRef<Path>>) -> Result<()> {
        if let Some(path) = maybe_path {
            std::fs::write(path, self.to_json()?)?;
        };
        Ok(())
    }
}

/// Executes a [`RunPlan`] against the generated data in `data_dir`
#[derive(Debug)]
pub struct BenchmarkRunner {
    data_dir: PathBuf,
    store: ResultStore,
    config: SessionConfig,
    debug: bool,
}

impl BenchmarkRunner {
    pub fn new(data_dir: impl Into<PathBuf>, store: ResultStore, config: SessionConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            store,
            config,
            debug: false,
        }
    }

    /// Print every query result after it has been measured
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run the whole matrix `plan.runs` times, scenarios outermost.
    ///
    /// Each iteration takes one environment snapshot shared by all of its
    /// results and appends them to the store before the next iteration
    /// starts. Scenarios with missing input files are skipped. The first
    /// failing engine aborts the run; iterations already stored are kept.
    pub async fn run(&self, plan: &RunPlan) -> Result<BenchmarkRun> {
        if !self.data_dir.is_dir() {
            return config_err!("Data directory not found. Run 'generate' command first.");
        }

        let mut run = BenchmarkRun::default();
        for iteration in 1..=plan.runs.get() {
            log::info!("Benchmark iteration {iteration}/{}", plan.runs);
            let environment = Arc::new(EnvironmentSnapshot::capture());
            let mut results: BTreeMap<Engine, Vec<BenchmarkResult>> =
                plan.engines.iter().map(|engine| (*engine, vec![])).collect();

            for scenario in &plan.scenarios {
                let files = scenario.files(&self.data_dir);
                for engine in &plan.engines {
                    if let Some(missing) = files.missing() {
                        log::warn!(
                            "Skipping {engine} on scenario {scenario}: {} not found",
                            missing.display()
                        );
                        continue;
                    }
                    let result = self
                        .run_case(*engine, *scenario, &files, &environment, &plan.run_label)
                        .await
                        .map_err(|e| {
                            DataFusionError::Context(
                                format!("{engine} benchmark on scenario {scenario} failed"),
                                Box::new(e),
                            )
                        })?;
                    results.entry(*engine).or_default().push(result);
                }
            }

            self.store.append(&results)?;
            run.results = results;
        }
        Ok(run)
    }

    async fn run_case(
        &self,
        engine: Engine,
        scenario: Scenario,
        files: &ScenarioFiles,
        environment: &Arc<EnvironmentSnapshot>,
        run_label: &str,
    ) -> Result<BenchmarkResult> {
        log::info!("Running {engine} on scenario {scenario}");
        log::debug!("{} bytes allocated before measuring", memory::allocated_bytes());

        let measurement =
            measure(|| engine.execute(&files.fact, &files.dim, &self.config)).await?;
        let result = BenchmarkResult::new(
            engine,
            scenario,
            &measurement,
            Arc::clone(environment),
            run_label,
        );
        log::info!(
            "{engine} on scenario {scenario} took {:.4} s, peak memory {:.2} MB",
            result.time_seconds(),
            result.memory_mb()
        );

        if self.debug {
            let batches = engine.execute(&files.fact, &files.dim, &self.config).await?;
            pretty::print_batches(&batches)?;
        }
        Ok(result)
    }
}

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

//! Command line entry point: generate data, run benchmarks, clean up

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process;

use datafusion::arrow::util::pretty;
use datafusion::error::{DataFusionError, Result};
use log::info;
use scale_bench::datagen;
use scale_bench::util::CommonOpt;
use scale_bench::{
    BenchmarkRunner, EngineSelector, ResultStore, RunPlan, ScenarioSelector,
};
use structopt::StructOpt;

#[cfg(feature = "mimalloc")]
const ALLOCATOR: &str = "mimalloc";
#[cfg(not(feature = "mimalloc"))]
const ALLOCATOR: &str = "system";

#[derive(Debug, StructOpt)]
struct GenerateOpt {
    /// Scenario to generate: all, small, medium, large or xlarge
    #[structopt(short = "s", long = "size", default_value = "all")]
    size: String,

    /// Directory the parquet files are written to
    #[structopt(parse(from_os_str), short = "p", long = "path", default_value = "data")]
    path: PathBuf,
}

#[derive(Debug, StructOpt)]
struct BenchmarkOpt {
    #[structopt(flatten)]
    common: CommonOpt,

    /// Scenario to run: all, small, medium, large or xlarge
    #[structopt(long = "scenario", default_value = "all")]
    scenario: String,

    /// Engine to run: all, eager, eager-arrow or datafusion
    #[structopt(short = "e", long = "engine", default_value = "all")]
    engine: String,

    /// Label stored with every result of this run
    #[structopt(short = "l", long = "run-label", default_value = "")]
    run_label: String,

    /// Number of times the whole benchmark matrix is executed
    #[structopt(short = "i", long = "runs", default_value = "1")]
    runs: usize,

    /// Path to machine readable output file
    #[structopt(parse(from_os_str), short = "o", long = "output")]
    output_path: Option<PathBuf>,

    /// Activate debug mode to see query results
    #[structopt(short, long)]
    debug: bool,
}

#[derive(Debug, StructOpt)]
struct CleanupOpt {
    /// Generated data directory to remove
    #[structopt(parse(from_os_str), short = "p", long = "path", default_value = "data")]
    path: PathBuf,

    /// Results directory to remove
    #[structopt(
        parse(from_os_str),
        short = "r",
        long = "results-dir",
        default_value = "results"
    )]
    results_dir: PathBuf,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "scale-bench",
    about = "Eager vs lazy query engine benchmarks over synthetic content data."
)]
enum ScaleBenchOpt {
    /// Generate synthetic parquet data
    Generate(GenerateOpt),
    /// Run benchmarks and append the results
    Benchmark(BenchmarkOpt),
    /// Remove generated data and stored results
    Cleanup(CleanupOpt),
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run(ScaleBenchOpt::from_args()).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(opt: ScaleBenchOpt) -> Result<()> {
    match opt {
        ScaleBenchOpt::Generate(opt) => generate(&opt),
        ScaleBenchOpt::Benchmark(opt) => benchmark(opt).await,
        ScaleBenchOpt::Cleanup(opt) => cleanup(&opt),
    }
}

fn generate(opt: &GenerateOpt) -> Result<()> {
    let selector: ScenarioSelector = opt.size.parse()?;
    for scenario in selector.scenarios() {
        datagen::generate(&opt.path, scenario)?;
    }
    println!("Data written to {}", opt.path.display());
    Ok(())
}

async fn benchmark(opt: BenchmarkOpt) -> Result<()> {
    // reject bad selectors before touching any data
    let scenarios: ScenarioSelector = opt.scenario.parse()?;
    let engines: EngineSelector = opt.engine.parse()?;
    let runs = NonZeroUsize::new(opt.runs).ok_or_else(|| {
        DataFusionError::Configuration("--runs must be at least 1".to_string())
    })?;
    info!("Running benchmarks with the following options: {opt:?}");
    info!("Measuring allocations through the {ALLOCATOR} allocator");

    let plan = RunPlan::new(scenarios, engines)
        .with_run_label(opt.run_label.as_str())
        .with_runs(runs);
    let runner = BenchmarkRunner::new(
        &opt.common.path,
        ResultStore::new(&opt.common.results_dir),
        opt.common.config()?,
    )
    .with_debug(opt.debug);

    let run = runner.run(&plan).await?;
    for (engine, batch) in run.summary()? {
        println!("\nResults: {engine}");
        pretty::print_batches(&[batch])?;
    }
    run.maybe_write_json(opt.output_path.as_ref())?;
    Ok(())
}

fn cleanup(opt: &CleanupOpt) -> Result<()> {
    for dir in [&opt.path, &opt.results_dir] {
        remove_dir(dir)?;
    }
    println!("Cleanup complete");
    Ok(())
}

fn remove_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
        info!("Removed {}", dir.display());
    } else {
        info!("Nothing to remove at {}", dir.display());
    }
    Ok(())
}

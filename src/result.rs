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

use std::sync::Arc;

use arrow::array::{Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::common::Result;
use serde::Serialize;

use crate::engine::Engine;
use crate::scenario::Scenario;
use crate::util::{round_to, EnvironmentSnapshot, Measurement};

/// Outcome of one successful (scenario, engine) invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    engine: Engine,
    scenario: Scenario,
    time_seconds: f64,
    memory_mb: f64,
    #[serde(flatten)]
    environment: Arc<EnvironmentSnapshot>,
    run_label: String,
}

impl BenchmarkResult {
    /// Time is rounded to 4 and memory to 2 decimal places
    pub fn new(
        engine: Engine,
        scenario: Scenario,
        measurement: &Measurement,
        environment: Arc<EnvironmentSnapshot>,
        run_label: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            scenario,
            time_seconds: round_to(measurement.elapsed_seconds(), 4),
            memory_mb: round_to(measurement.peak_memory_mb(), 2),
            environment,
            run_label: run_label.into(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    pub fn memory_mb(&self) -> f64 {
        self.memory_mb
    }

    pub fn environment(&self) -> &Arc<EnvironmentSnapshot> {
        &self.environment
    }

    pub fn run_label(&self) -> &str {
        &self.run_label
    }
}

/// Schema of a persisted result table, one row per [`BenchmarkResult`]
pub fn table_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("run_label", DataType::Utf8, true),
        Field::new("engine", DataType::Utf8, false),
        Field::new("scenario", DataType::Utf8, false),
        Field::new("time_seconds", DataType::Float64, false),
        Field::new("memory_mb", DataType::Float64, false),
        Field::new("cpu_count", DataType::UInt64, false),
        Field::new("cpu_count_logical", DataType::UInt64, false),
        Field::new("cpu_name", DataType::Utf8, false),
        Field::new("cpu_freq_mhz", DataType::UInt64, true),
        Field::new("memory_total_gb", DataType::Float64, false),
        Field::new("memory_available_gb", DataType::Float64, false),
    ]))
}

/// Flatten results into rows of [`table_schema`]
pub fn to_record_batch(results: &[BenchmarkResult]) -> Result<RecordBatch> {
    let env = |f: fn(&EnvironmentSnapshot) -> u64| -> UInt64Array {
        results.iter().map(|r| f(r.environment.as_ref())).collect::<Vec<_>>().into()
    };

    Ok(RecordBatch::try_new(
        table_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.environment.timestamp.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.run_label.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.engine.name()),
            )),
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.scenario.name()),
            )),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.time_seconds),
            )),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.memory_mb),
            )),
            Arc::new(env(|e| e.cpu_count as u64)),
            Arc::new(env(|e| e.cpu_count_logical as u64)),
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.environment.cpu_name.as_str()),
            )),
            Arc::new(
                results
                    .iter()
                    .map(|r| r.environment.cpu_freq_mhz)
                    .collect::<UInt64Array>(),
            ),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.environment.memory_total_gb),
            )),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.environment.memory_available_gb),
            )),
        ],
    )?)
}

/// The columns shown on screen for a group of results
pub fn to_summary_batch(results: &[BenchmarkResult]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("scenario", DataType::Utf8, false),
        Field::new("time_seconds", DataType::Float64, false),
        Field::new("memory_mb", DataType::Float64, false),
    ]));
    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(
                results.iter().map(|r| r.scenario.name()),
            )),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.time_seconds),
            )),
            Arc::new(Float64Array::from_iter_values(
                results.iter().map(|r| r.memory_mb),
            )),
        ],
    )?)
}

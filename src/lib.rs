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

//! Benchmarks comparing eager and lazily planned query execution over
//! synthetic content performance data.
//!
//! Every engine runs the same analytical query (inner join, status filter,
//! group-by aggregate, descending sort) against a pair of Parquet files per
//! [`Scenario`]. The [`BenchmarkRunner`] measures wall-clock time and peak
//! memory of each invocation and appends the results to one CSV table per
//! [`Engine`] through the [`ResultStore`].

pub mod datagen;
pub mod engine;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod store;
pub mod util;

pub use engine::{Engine, EngineSelector};
pub use result::BenchmarkResult;
pub use runner::{BenchmarkRun, BenchmarkRunner, RunPlan};
pub use scenario::{Scenario, ScenarioSelector};
pub use store::ResultStore;
pub use util::{CommonOpt, EnvironmentSnapshot, Measurement};

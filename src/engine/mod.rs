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

//! The analytical query and the engines that run it.
//!
//! Every engine computes the same result from a fact and a dimension table:
//!
//! 1. inner join on `content_id`
//! 2. drop rows whose `process_status` is `"Failed"`
//! 3. group by `region_country`, computing `sum(views)` and
//!    `avg(engagement_score)`
//! 4. sort descending by the summed views
//!
//! The eager engines materialize every intermediate table in memory, while
//! the DataFusion engine plans all four steps before executing them once.

mod decode;
mod eager;
mod lazy;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use datafusion::common::{config_err, exec_datafusion_err, internal_datafusion_err, Result};
use datafusion::error::DataFusionError;
use datafusion::prelude::SessionConfig;
use serde::Serialize;

pub use decode::Decoder;

pub const CONTENT_ID: &str = "content_id";
pub const CONTENT_CATEGORY: &str = "content_category";
pub const EVENT_DATE: &str = "event_date";
pub const REGION_COUNTRY: &str = "region_country";
pub const VIEWS: &str = "views";
pub const ENGAGEMENT_SCORE: &str = "engagement_score";
pub const PROCESS_STATUS: &str = "process_status";

/// Status value whose rows never contribute to the aggregates
pub const FAILED_STATUS: &str = "Failed";

/// Schema of the query result produced by every engine
pub fn result_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(REGION_COUNTRY, DataType::Utf8, true),
        Field::new(VIEWS, DataType::Int64, true),
        Field::new(ENGAGEMENT_SCORE, DataType::Float64, true),
    ]))
}

/// A query execution strategy under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Engine {
    /// Eager execution, inputs decoded through the parquet record reader
    #[serde(rename = "eager")]
    Eager,
    /// Eager execution, inputs decoded through the parquet arrow reader
    #[serde(rename = "eager-arrow")]
    EagerArrow,
    /// Lazily planned execution with DataFusion
    #[serde(rename = "datafusion")]
    DataFusion,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Eager, Engine::EagerArrow, Engine::DataFusion];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::EagerArrow => "eager-arrow",
            Self::DataFusion => "datafusion",
        }
    }

    /// Look up an engine for dispatch by name.
    ///
    /// Names are validated before a benchmark starts, so an unknown name here
    /// is an internal error rather than a user error.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|engine| engine.name() == name)
            .ok_or_else(|| internal_datafusion_err!("Unknown engine: {name}"))
    }

    /// Run the query over the given input files and return its result
    pub async fn execute(
        &self,
        fact: &Path,
        dim: &Path,
        config: &SessionConfig,
    ) -> Result<Vec<RecordBatch>> {
        match self {
            Self::Eager => eager::run(fact, dim, Decoder::Record),
            Self::EagerArrow => eager::run(
                fact,
                dim,
                Decoder::Arrow {
                    batch_size: config.batch_size(),
                },
            ),
            Self::DataFusion => lazy::run(fact, dim, config.clone()).await,
        }
    }
}

impl Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = DataFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::ALL.into_iter().find(|engine| engine.name() == s) {
            Some(engine) => Ok(engine),
            None => config_err!(
                "Invalid engine: {s}. Must be one of: {}",
                EngineSelector::VALID.join(", ")
            ),
        }
    }
}

/// `all` or a single engine, as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineSelector {
    #[default]
    All,
    One(Engine),
}

impl EngineSelector {
    pub const VALID: [&'static str; 4] = ["all", "eager", "eager-arrow", "datafusion"];

    pub fn engines(&self) -> Vec<Engine> {
        match self {
            Self::All => Engine::ALL.to_vec(),
            Self::One(engine) => vec![*engine],
        }
    }
}

impl FromStr for EngineSelector {
    type Err = DataFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::One),
        }
    }
}

/// One row of a query result
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAggregate {
    pub region_country: Option<String>,
    pub views: Option<i64>,
    pub engagement_score: Option<f64>,
}

/// Read query result batches back into rows, in result order
pub fn region_aggregates(batches: &[RecordBatch]) -> Result<Vec<RegionAggregate>> {
    let mut rows = vec![];
    for batch in batches {
        let regions = cast(column(batch, REGION_COUNTRY)?.as_ref(), &DataType::Utf8)?;
        let views = cast(column(batch, VIEWS)?.as_ref(), &DataType::Int64)?;
        let scores = cast(column(batch, ENGAGEMENT_SCORE)?.as_ref(), &DataType::Float64)?;

        let regions = regions.as_string::<i32>();
        let views = views.as_primitive::<Int64Type>();
        let scores = scores.as_primitive::<Float64Type>();
        for i in 0..batch.num_rows() {
            rows.push(RegionAggregate {
                region_country: regions.is_valid(i).then(|| regions.value(i).to_string()),
                views: views.is_valid(i).then(|| views.value(i)),
                engagement_score: scores.is_valid(i).then(|| scores.value(i)),
            });
        }
    }
    Ok(rows)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Arc<dyn Array>> {
    batch
        .column_by_name(name)
        .ok_or_else(|| exec_datafusion_err!("Column '{name}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_round_trip() -> Result<()> {
        for engine in Engine::ALL {
            assert_eq!(engine.name().parse::<Engine>()?, engine);
            assert_eq!(Engine::from_name(engine.name())?, engine);
            assert_eq!(engine.to_string(), engine.name());
        }
        Ok(())
    }

    #[test]
    fn invalid_engine_is_a_configuration_error() {
        let err = "made-up".parse::<EngineSelector>().unwrap_err();
        assert!(matches!(err, DataFusionError::Configuration(_)));
        assert!(err.to_string().contains("Invalid engine: made-up"));
    }

    #[test]
    fn unknown_engine_at_dispatch_is_internal() {
        let err = Engine::from_name("made-up").unwrap_err();
        assert!(matches!(err, DataFusionError::Internal(_)));
    }

    #[test]
    fn selector_expands_in_declaration_order() -> Result<()> {
        assert_eq!(
            "all".parse::<EngineSelector>()?.engines(),
            vec![Engine::Eager, Engine::EagerArrow, Engine::DataFusion]
        );
        assert_eq!(
            "eager-arrow".parse::<EngineSelector>()?.engines(),
            vec![Engine::EagerArrow]
        );
        Ok(())
    }

    #[test]
    fn engines_serialize_by_name() {
        let json = serde_json::to_string(&Engine::ALL).unwrap();
        assert_eq!(json, r#"["eager","eager-arrow","datafusion"]"#);
    }
}

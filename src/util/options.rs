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

use std::path::PathBuf;

use datafusion::common::Result;
use datafusion::config::ConfigOptions;
use datafusion::prelude::SessionConfig;
use structopt::StructOpt;

/// Options shared by the benchmark subcommands
#[derive(Debug, StructOpt, Clone)]
pub struct CommonOpt {
    /// Path to the directory holding the generated parquet files
    #[structopt(parse(from_os_str), short = "p", long = "path", default_value = "data")]
    pub path: PathBuf,

    /// Directory the per-engine result tables are appended to
    #[structopt(
        parse(from_os_str),
        short = "r",
        long = "results-dir",
        default_value = "results"
    )]
    pub results_dir: PathBuf,

    /// Number of partitions to process in parallel. Defaults to the number
    /// of logical cores
    #[structopt(short = "n", long = "partitions")]
    pub partitions: Option<usize>,

    /// Batch size when reading parquet files
    #[structopt(short = "s", long = "batch-size", default_value = "8192")]
    pub batch_size: usize,
}

impl CommonOpt {
    /// DataFusion session configuration: `DATAFUSION_*` environment
    /// variables first, then the values given on the command line
    pub fn config(&self) -> Result<SessionConfig> {
        let mut options = ConfigOptions::from_env()?;
        options.execution.batch_size = self.batch_size;
        if let Some(partitions) = self.partitions {
            options.execution.target_partitions = partitions;
        }
        Ok(options.into())
    }
}

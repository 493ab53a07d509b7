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

//! Append-only persistence of benchmark results, one CSV table per engine

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use datafusion::common::Result;
use datafusion::error::DataFusionError;

use crate::engine::Engine;
use crate::result::{table_schema, to_record_batch, BenchmarkResult};

/// Per-engine result tables under a results directory.
///
/// Rows are only ever appended. The header row is written when a table file
/// is first created.
#[derive(Debug, Clone)]
pub struct ResultStore {
    results_dir: PathBuf,
}

impl ResultStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Location of the table for `engine`
    pub fn path_for(&self, engine: Engine) -> PathBuf {
        self.results_dir.join(format!("{}.csv", engine.name()))
    }

    /// Append every engine's results to its table, creating the directory and
    /// tables as needed. Engines with no results are left untouched.
    pub fn append(&self, results: &BTreeMap<Engine, Vec<BenchmarkResult>>) -> Result<()> {
        for (engine, rows) in results {
            if rows.is_empty() {
                continue;
            }
            fs::create_dir_all(&self.results_dir)?;
            let path = self.path_for(*engine);
            self.append_rows(&path, rows)?;
            log::info!("Saved {} {engine} result(s) to {}", rows.len(), path.display());
        }
        Ok(())
    }

    fn append_rows(&self, path: &Path, rows: &[BenchmarkResult]) -> Result<()> {
        let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let batch = to_record_batch(rows)?;
        let mut writer = WriterBuilder::new().with_header(is_new).build(file);
        writer.write(&batch)?;
        Ok(())
    }

    /// Every row stored for `engine`, in append order. A table that does
    /// not exist yet reads as empty.
    pub fn read(&self, engine: Engine) -> Result<Vec<RecordBatch>> {
        let path = self.path_for(engine);
        if !path.exists() {
            return Ok(vec![]);
        }
        let reader = ReaderBuilder::new(table_schema())
            .with_header(true)
            .build(File::open(&path)?)?;
        reader
            .map(|batch| batch.map_err(DataFusionError::from))
            .collect()
    }
}

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

//! Synthetic content performance data.
//!
//! For every [`Scenario`] a fact table with one row per content event and a
//! dimension table with the category of each content id are written as
//! parquet files. Generation is seeded, so the same scenario always produces
//! the same files, and rows are written in bounded batches so the largest
//! scenarios never have to fit in memory.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Date32Builder, Float64Builder, Int64Builder, RecordBatch, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::common::Result;
use datafusion::error::DataFusionError;
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use rand::distributions::WeightedIndex;
use rand::prelude::{Distribution, StdRng};
use rand::{Rng, SeedableRng};

use crate::engine::{
    CONTENT_CATEGORY, CONTENT_ID, ENGAGEMENT_SCORE, EVENT_DATE, PROCESS_STATUS,
    REGION_COUNTRY, VIEWS,
};
use crate::scenario::{Scenario, DIM_CONTENT_IDS};
use crate::util::round_to;

pub const RANDOM_SEED: u64 = 42;

/// Rows per generated record batch
const BATCH_ROWS: usize = 1 << 20;

/// 2024-01-01 as days since the unix epoch
const BASE_DATE: i32 = 19_723;

const REGIONS: [&str; 10] = ["BR", "US", "ES", "DE", "FR", "UK", "CA", "AU", "MX", "IN"];
const REGION_WEIGHTS: [u32; 10] = [45, 30, 10, 5, 4, 3, 2, 1, 1, 1];
const STATUSES: [&str; 3] = ["Completed", "Processing", "Failed"];
const CATEGORIES: [&str; 10] = [
    "Python", "Rust", "MLOps", "APIs", "Cloud", "DevOps", "Web", "Data", "Mobile", "AI",
];

pub fn fact_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(CONTENT_ID, DataType::Utf8, false),
        Field::new(EVENT_DATE, DataType::Date32, false),
        Field::new(REGION_COUNTRY, DataType::Utf8, false),
        Field::new(VIEWS, DataType::Int64, false),
        Field::new(ENGAGEMENT_SCORE, DataType::Float64, false),
        Field::new(PROCESS_STATUS, DataType::Utf8, false),
    ]))
}

pub fn dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(CONTENT_ID, DataType::Utf8, false),
        Field::new(CONTENT_CATEGORY, DataType::Utf8, false),
    ]))
}

fn content_id(i: usize) -> String {
    format!("content_{i:06}")
}

/// Generate both tables of `scenario` into `data_dir`
pub fn generate(data_dir: &Path, scenario: Scenario) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let files = scenario.files(data_dir);

    info!(
        "Generating fact_content_performance ({scenario}: {} rows)...",
        scenario.row_count()
    );
    let mut fact = FactGenerator::try_new()?;
    write_batches(&files.fact, fact_schema(), scenario.row_count(), |rows| {
        fact.next_batch(rows)
    })?;
    info!("Created {} ({} rows)", files.fact.display(), scenario.row_count());

    info!("Generating dim_content_metadata ({scenario}: {DIM_CONTENT_IDS} unique contents)...");
    let mut dim = DimGenerator::new();
    write_batches(&files.dim, dim_schema(), DIM_CONTENT_IDS, |rows| {
        dim.next_batch(rows)
    })?;
    info!("Created {}", files.dim.display());

    Ok(())
}

fn writer_properties() -> Result<WriterProperties> {
    Ok(WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3)?))
        .build())
}

fn write_batches(
    path: &Path,
    schema: SchemaRef,
    total_rows: usize,
    mut next_batch: impl FnMut(usize) -> Result<RecordBatch>,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(writer_properties()?))?;
    let mut remaining = total_rows;
    while remaining > 0 {
        let rows = remaining.min(BATCH_ROWS);
        writer.write(&next_batch(rows)?)?;
        remaining -= rows;
    }
    writer.close()?;
    Ok(())
}

/// Write `batches` to a new parquet file at `path`
pub fn write_parquet(path: &Path, batches: &[RecordBatch]) -> Result<()> {
    let Some(first) = batches.first() else {
        return Err(DataFusionError::Execution(format!(
            "No batches to write to {}",
            path.display()
        )));
    };
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, first.schema(), Some(writer_properties()?))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

struct FactGenerator {
    rng: StdRng,
    regions: WeightedIndex<u32>,
    row_count: usize,
}

impl FactGenerator {
    fn try_new() -> Result<Self> {
        let regions = WeightedIndex::new(REGION_WEIGHTS)
            .map_err(|e| DataFusionError::External(Box::new(e)))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(RANDOM_SEED),
            regions,
            row_count: 0,
        })
    }

    fn next_batch(&mut self, rows: usize) -> Result<RecordBatch> {
        let mut content_id_builder = StringBuilder::with_capacity(rows, rows * 14);
        let mut event_date = Date32Builder::with_capacity(rows);
        let mut region_country = StringBuilder::with_capacity(rows, rows * 2);
        let mut views = Int64Builder::with_capacity(rows);
        let mut engagement_score = Float64Builder::with_capacity(rows);
        let mut process_status = StringBuilder::with_capacity(rows, rows * 10);

        for _ in 0..rows {
            let i = self.row_count;
            self.row_count += 1;

            content_id_builder.append_value(content_id(i % DIM_CONTENT_IDS));
            event_date.append_value(BASE_DATE + self.rng.gen_range(0..=364));
            region_country.append_value(REGIONS[self.regions.sample(&mut self.rng)]);
            views.append_value(self.rng.gen_range(1..=1_000));
            engagement_score.append_value(round_to(self.rng.gen_range(0.0..10.0), 2));
            process_status.append_value(STATUSES[self.rng.gen_range(0..STATUSES.len())]);
        }

        Ok(RecordBatch::try_new(
            fact_schema(),
            vec![
                Arc::new(content_id_builder.finish()),
                Arc::new(event_date.finish()),
                Arc::new(region_country.finish()),
                Arc::new(views.finish()),
                Arc::new(engagement_score.finish()),
                Arc::new(process_status.finish()),
            ],
        )?)
    }
}

struct DimGenerator {
    rng: StdRng,
    row_count: usize,
}

impl DimGenerator {
    fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(RANDOM_SEED),
            row_count: 0,
        }
    }

    fn next_batch(&mut self, rows: usize) -> Result<RecordBatch> {
        let mut content_id_builder = StringBuilder::with_capacity(rows, rows * 14);
        let mut content_category = StringBuilder::with_capacity(rows, rows * 6);

        for _ in 0..rows {
            content_id_builder.append_value(content_id(self.row_count));
            content_category
                .append_value(CATEGORIES[self.rng.gen_range(0..CATEGORIES.len())]);
            self.row_count += 1;
        }

        Ok(RecordBatch::try_new(
            dim_schema(),
            vec![
                Arc::new(content_id_builder.finish()),
                Arc::new(content_category.finish()),
            ],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Decoder;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Float64Type, Int64Type};

    #[test]
    fn fact_rows_follow_the_documented_domains() -> Result<()> {
        let batch = FactGenerator::try_new()?.next_batch(2_000)?;
        assert_eq!(batch.num_rows(), 2_000);

        let ids = batch.column(0).as_string::<i32>();
        assert_eq!(ids.value(0), "content_000000");
        assert_eq!(ids.value(1_999), "content_001999");

        let regions = batch.column(2).as_string::<i32>();
        assert!(regions.iter().flatten().all(|r| REGIONS.contains(&r)));

        let views = batch.column(3).as_primitive::<Int64Type>();
        assert!(views.values().iter().all(|v| (1..=1_000).contains(v)));

        let scores = batch.column(4).as_primitive::<Float64Type>();
        assert!(scores
            .values()
            .iter()
            .all(|s| (0.0..=10.0).contains(s) && round_to(*s, 2) == *s));

        let statuses = batch.column(5).as_string::<i32>();
        assert!(statuses.iter().flatten().any(|s| s == "Failed"));
        assert_eq!(batch.column(1).null_count(), 0);
        Ok(())
    }

    #[test]
    fn content_ids_wrap_around_the_dimension() -> Result<()> {
        let mut generator = FactGenerator::try_new()?;
        generator.row_count = DIM_CONTENT_IDS - 1;
        let batch = generator.next_batch(2)?;
        let ids = batch.column(0).as_string::<i32>();
        assert_eq!(ids.value(0), "content_499999");
        assert_eq!(ids.value(1), "content_000000");
        Ok(())
    }

    #[test]
    fn generation_is_deterministic() -> Result<()> {
        let first = FactGenerator::try_new()?.next_batch(100)?;
        let second = FactGenerator::try_new()?.next_batch(100)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn generate_writes_both_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        generate(dir.path(), Scenario::Small)?;

        let files = Scenario::Small.files(dir.path());
        let fact = Decoder::Arrow { batch_size: 8192 }.read(&files.fact)?;
        let dim = Decoder::Arrow { batch_size: 8192 }.read(&files.dim)?;
        assert_eq!(fact.num_rows(), 1_000);
        let types = |schema: SchemaRef| {
            schema
                .fields()
                .iter()
                .map(|f| (f.name().clone(), f.data_type().clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(types(fact.schema()), types(fact_schema()));
        assert_eq!(dim.num_rows(), DIM_CONTENT_IDS);
        Ok(())
    }
}

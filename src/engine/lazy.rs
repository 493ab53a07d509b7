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

//! Lazily planned execution with DataFusion: the whole query is one logical
//! plan that is only executed by the final `collect`

use std::path::Path;

use arrow::array::RecordBatch;
use arrow::datatypes::DataType;
use datafusion::common::{exec_datafusion_err, JoinType, Result};
use datafusion::functions_aggregate::expr_fn::{avg, sum};
use datafusion::logical_expr::cast;
use datafusion::prelude::{col, lit, ParquetReadOptions, SessionConfig, SessionContext};
use log::debug;

use super::{CONTENT_ID, ENGAGEMENT_SCORE, FAILED_STATUS, PROCESS_STATUS, REGION_COUNTRY, VIEWS};

/// Dimension key after renaming, so the join sees two distinct columns
const DIM_CONTENT_ID: &str = "dim_content_id";

pub(super) async fn run(
    fact: &Path,
    dim: &Path,
    config: SessionConfig,
) -> Result<Vec<RecordBatch>> {
    let ctx = SessionContext::new_with_config(config);

    let fact = ctx
        .read_parquet(path_str(fact)?, ParquetReadOptions::default())
        .await?;
    let dim = ctx
        .read_parquet(path_str(dim)?, ParquetReadOptions::default())
        .await?
        .with_column_renamed(CONTENT_ID, DIM_CONTENT_ID)?;

    let df = fact
        .join(dim, JoinType::Inner, &[CONTENT_ID], &[DIM_CONTENT_ID], None)?
        .filter(col(PROCESS_STATUS).not_eq(lit(FAILED_STATUS)))?
        .aggregate(
            vec![col(REGION_COUNTRY)],
            vec![
                sum(col(VIEWS)).alias(VIEWS),
                avg(col(ENGAGEMENT_SCORE)).alias(ENGAGEMENT_SCORE),
            ],
        )?
        .sort(vec![col(VIEWS).sort(false, false)])?
        .select(vec![
            cast(col(REGION_COUNTRY), DataType::Utf8).alias(REGION_COUNTRY),
            col(VIEWS),
            col(ENGAGEMENT_SCORE),
        ])?;

    debug!("=== Logical plan ===\n{}", df.logical_plan().display_indent());

    df.collect().await
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| exec_datafusion_err!("Path is not valid UTF-8: {}", path.display()))
}

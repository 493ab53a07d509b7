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

//! Eager execution: every step materializes a full intermediate table

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, Float64Array, Int64Array, RecordBatch, Scalar, StringArray, UInt32Array,
};
use arrow::compute::kernels::cmp::neq;
use arrow::compute::{cast, filter_record_batch, take};
use arrow::datatypes::{DataType, Float64Type, Int64Type, Schema};
use datafusion::common::{exec_datafusion_err, Result};
use log::debug;

use super::{
    column, result_schema, Decoder, CONTENT_ID, ENGAGEMENT_SCORE, FAILED_STATUS,
    PROCESS_STATUS, REGION_COUNTRY, VIEWS,
};

pub(super) fn run(fact: &Path, dim: &Path, decoder: Decoder) -> Result<Vec<RecordBatch>> {
    let fact = decoder.read(fact)?;
    let dim = decoder.read(dim)?;

    let joined = inner_join(&fact, &dim, CONTENT_ID)?;
    let filtered = exclude_status(&joined, FAILED_STATUS)?;
    debug!(
        "Joined {} rows, {} remain after filtering",
        joined.num_rows(),
        filtered.num_rows()
    );

    Ok(vec![aggregate_by_region(&filtered)?])
}

fn utf8_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let array = cast(column(batch, name)?.as_ref(), &DataType::Utf8)?;
    Ok(array.as_string::<i32>().clone())
}

/// Hash join keeping every (left, right) pair with equal, non-null keys.
///
/// The output holds all columns of `left` followed by the columns of `right`
/// except its key.
fn inner_join(left: &RecordBatch, right: &RecordBatch, key: &str) -> Result<RecordBatch> {
    let left_keys = utf8_column(left, key)?;
    let right_keys = utf8_column(right, key)?;

    let mut build: HashMap<&str, Vec<u32>> = HashMap::with_capacity(right_keys.len());
    for (row, value) in right_keys.iter().enumerate() {
        if let Some(value) = value {
            build.entry(value).or_default().push(row as u32);
        }
    }

    let mut left_indices = vec![];
    let mut right_indices = vec![];
    for (row, value) in left_keys.iter().enumerate() {
        let Some(matches) = value.and_then(|value| build.get(value)) else {
            continue;
        };
        for right_row in matches {
            left_indices.push(row as u32);
            right_indices.push(*right_row);
        }
    }
    let left_indices = UInt32Array::from(left_indices);
    let right_indices = UInt32Array::from(right_indices);

    let mut fields = vec![];
    let mut columns = vec![];
    for (field, array) in left.schema().fields().iter().zip(left.columns()) {
        fields.push(Arc::clone(field));
        columns.push(take(array.as_ref(), &left_indices, None)?);
    }
    for (field, array) in right.schema().fields().iter().zip(right.columns()) {
        if field.name() == key {
            continue;
        }
        fields.push(Arc::clone(field));
        columns.push(take(array.as_ref(), &right_indices, None)?);
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

/// Keep rows whose status differs from `status`. Null statuses are dropped,
/// as a SQL `<>` comparison would.
fn exclude_status(batch: &RecordBatch, status: &str) -> Result<RecordBatch> {
    let statuses = utf8_column(batch, PROCESS_STATUS)?;
    let excluded = Scalar::new(StringArray::from(vec![status]));
    let mask = neq(&statuses, &excluded)?;
    Ok(filter_record_batch(batch, &mask)?)
}

#[derive(Debug, Default)]
struct RegionState {
    views: Option<i64>,
    score_sum: f64,
    score_count: usize,
}

/// Group by region, sum the views and average the engagement score, sorted
/// by descending views sum with null sums last
fn aggregate_by_region(batch: &RecordBatch) -> Result<RecordBatch> {
    let regions = utf8_column(batch, REGION_COUNTRY)?;
    let views = cast(column(batch, VIEWS)?.as_ref(), &DataType::Int64)?;
    let views = views.as_primitive::<Int64Type>();
    let scores = cast(column(batch, ENGAGEMENT_SCORE)?.as_ref(), &DataType::Float64)?;
    let scores = scores.as_primitive::<Float64Type>();

    let mut groups: Vec<(Option<&str>, RegionState)> = vec![];
    let mut group_index: HashMap<Option<&str>, usize> = HashMap::new();
    for row in 0..batch.num_rows() {
        let region = regions.is_valid(row).then(|| regions.value(row));
        let index = *group_index.entry(region).or_insert_with(|| {
            groups.push((region, RegionState::default()));
            groups.len() - 1
        });
        let state = &mut groups[index].1;

        if views.is_valid(row) {
            let total = state.views.unwrap_or_default();
            let total = total.checked_add(views.value(row)).ok_or_else(|| {
                exec_datafusion_err!("Sum of views overflowed for region {region:?}")
            })?;
            state.views = Some(total);
        }
        if scores.is_valid(row) {
            state.score_sum += scores.value(row);
            state.score_count += 1;
        }
    }

    groups.sort_by(|(_, a), (_, b)| b.views.cmp(&a.views));

    let region_country: StringArray = groups.iter().map(|(region, _)| *region).collect();
    let views: Int64Array = groups.iter().map(|(_, state)| state.views).collect();
    let engagement_score: Float64Array = groups
        .iter()
        .map(|(_, state)| {
            (state.score_count > 0).then(|| state.score_sum / state.score_count as f64)
        })
        .collect();

    Ok(RecordBatch::try_new(
        result_schema(),
        vec![
            Arc::new(region_country),
            Arc::new(views),
            Arc::new(engagement_score),
        ],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::ArrayRef;

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(columns).unwrap()
    }

    #[test]
    fn join_pairs_every_match_and_drops_unmatched_keys() -> Result<()> {
        let left = batch(vec![
            (
                "content_id",
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), None, Some("z")])) as ArrayRef,
            ),
            ("views", Arc::new(Int64Array::from(vec![1, 2, 3, 4])) as ArrayRef),
        ]);
        let right = batch(vec![
            (
                "content_id",
                Arc::new(StringArray::from(vec![Some("b"), Some("a"), Some("b"), None])) as ArrayRef,
            ),
            (
                "content_category",
                Arc::new(StringArray::from(vec!["x", "y", "z", "w"])) as ArrayRef,
            ),
        ]);

        let joined = inner_join(&left, &right, "content_id")?;
        assert_eq!(joined.num_columns(), 3);
        assert_eq!(joined.num_rows(), 3);
        assert_eq!(
            joined.column(0).as_string::<i32>(),
            &StringArray::from(vec!["a", "b", "b"])
        );
        assert_eq!(
            joined.column(1).as_primitive::<Int64Type>(),
            &Int64Array::from(vec![1, 2, 2])
        );
        assert_eq!(
            joined.column(2).as_string::<i32>(),
            &StringArray::from(vec!["y", "x", "z"])
        );
        Ok(())
    }

    #[test]
    fn status_filter_is_exact_and_case_sensitive() -> Result<()> {
        let input = batch(vec![(
            "process_status",
            Arc::new(StringArray::from(vec![
                Some("Failed"),
                Some("failed"),
                Some("Completed"),
                None,
                Some("Failed "),
            ])) as ArrayRef,
        )]);

        let filtered = exclude_status(&input, "Failed")?;
        assert_eq!(
            filtered.column(0).as_string::<i32>(),
            &StringArray::from(vec!["failed", "Completed", "Failed "])
        );
        Ok(())
    }

    #[test]
    fn aggregates_are_grouped_and_sorted() -> Result<()> {
        let input = batch(vec![
            (
                "region_country",
                Arc::new(StringArray::from(vec!["BR", "US", "BR", "DE", "US"])) as ArrayRef,
            ),
            ("views", Arc::new(Int64Array::from(vec![10, 50, 20, 5, 1])) as ArrayRef),
            (
                "engagement_score",
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0, 4.0])) as ArrayRef,
            ),
        ]);

        let result = aggregate_by_region(&input)?;
        assert_eq!(
            result.column(0).as_string::<i32>(),
            &StringArray::from(vec!["US", "BR", "DE"])
        );
        assert_eq!(
            result.column(1).as_primitive::<Int64Type>(),
            &Int64Array::from(vec![51, 30, 5])
        );
        assert_eq!(
            result.column(2).as_primitive::<Float64Type>(),
            &Float64Array::from(vec![3.0, 2.0, 4.0])
        );
        Ok(())
    }
}

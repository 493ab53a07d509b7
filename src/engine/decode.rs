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

//! Decoding a parquet file into a single in-memory [`RecordBatch`]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int32Builder, Int64Builder,
    RecordBatch, StringBuilder,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use datafusion::common::{exec_datafusion_err, exec_err, Result};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::parquet_to_arrow_schema;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field as RowField;

/// How an eager engine decodes its parquet inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Row by row through the parquet record API, rebuilt into columns
    Record,
    /// Column chunks straight into arrow arrays
    Arrow { batch_size: usize },
}

impl Decoder {
    /// Read the whole file into memory
    pub fn read(&self, path: &Path) -> Result<RecordBatch> {
        let batch = match self {
            Self::Record => read_records(path)?,
            Self::Arrow { batch_size } => read_arrow(path, *batch_size)?,
        };
        debug!(
            "Decoded {} rows x {} columns from {} ({self:?})",
            batch.num_rows(),
            batch.num_columns(),
            path.display()
        );
        Ok(batch)
    }
}

fn read_arrow(path: &Path, batch_size: usize) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::clone(builder.schema());
    let reader = builder.with_batch_size(batch_size).build()?;
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn read_records(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let file_metadata = reader.metadata().file_metadata();
    let schema = parquet_to_arrow_schema(
        file_metadata.schema_descr(),
        file_metadata.key_value_metadata(),
    )?;
    let capacity = usize::try_from(file_metadata.num_rows()).unwrap_or_default();

    let mut columns = schema
        .fields()
        .iter()
        .map(|field| ColumnBuilder::try_new(field, capacity))
        .collect::<Result<Vec<_>>>()?;

    for row in reader.get_row_iter(None)? {
        let row = row?;
        for ((name, value), column) in row.get_column_iter().zip(columns.iter_mut()) {
            column.append(name, value)?;
        }
    }

    let fields = schema
        .fields()
        .iter()
        .zip(&columns)
        .map(|(field, column)| Field::new(field.name(), column.data_type(), true))
        .collect::<Vec<_>>();
    let arrays = columns
        .into_iter()
        .map(ColumnBuilder::finish)
        .collect::<Vec<_>>();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Accumulates the values of one column while rows are decoded
enum ColumnBuilder {
    Utf8(StringBuilder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Date32(Date32Builder),
    Boolean(BooleanBuilder),
}

impl ColumnBuilder {
    fn try_new(field: &Field, capacity: usize) -> Result<Self> {
        Ok(match field.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
                Self::Utf8(StringBuilder::with_capacity(capacity, capacity * 8))
            }
            DataType::Int8 | DataType::Int16 | DataType::Int32 => {
                Self::Int32(Int32Builder::with_capacity(capacity))
            }
            DataType::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
            DataType::Float32 | DataType::Float64 => {
                Self::Float64(Float64Builder::with_capacity(capacity))
            }
            DataType::Date32 => Self::Date32(Date32Builder::with_capacity(capacity)),
            DataType::Boolean => Self::Boolean(BooleanBuilder::with_capacity(capacity)),
            other => {
                return exec_err!(
                    "Column '{}' has type {other} which the record decoder does not support",
                    field.name()
                )
            }
        })
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Utf8(_) => DataType::Utf8,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Date32(_) => DataType::Date32,
            Self::Boolean(_) => DataType::Boolean,
        }
    }

    fn append(&mut self, name: &str, value: &RowField) -> Result<()> {
        match (self, value) {
            (Self::Utf8(b), RowField::Null) => b.append_null(),
            (Self::Int32(b), RowField::Null) => b.append_null(),
            (Self::Int64(b), RowField::Null) => b.append_null(),
            (Self::Float64(b), RowField::Null) => b.append_null(),
            (Self::Date32(b), RowField::Null) => b.append_null(),
            (Self::Boolean(b), RowField::Null) => b.append_null(),
            (Self::Utf8(b), RowField::Str(v)) => b.append_value(v),
            (Self::Int32(b), RowField::Byte(v)) => b.append_value(i32::from(*v)),
            (Self::Int32(b), RowField::Short(v)) => b.append_value(i32::from(*v)),
            (Self::Int32(b), RowField::Int(v)) => b.append_value(*v),
            (Self::Int64(b), RowField::Long(v)) => b.append_value(*v),
            (Self::Float64(b), RowField::Float(v)) => b.append_value(f64::from(*v)),
            (Self::Float64(b), RowField::Double(v)) => b.append_value(*v),
            (Self::Date32(b), RowField::Date(v)) => b.append_value(*v),
            (Self::Boolean(b), RowField::Bool(v)) => b.append_value(*v),
            (builder, value) => {
                return Err(exec_datafusion_err!(
                    "Unexpected value {value} in {} column '{name}'",
                    builder.data_type()
                ))
            }
        }
        Ok(())
    }

    fn finish(self) -> ArrayRef {
        match self {
            Self::Utf8(mut b) => Arc::new(b.finish()),
            Self::Int32(mut b) => Arc::new(b.finish()),
            Self::Int64(mut b) => Arc::new(b.finish()),
            Self::Float64(mut b) => Arc::new(b.finish()),
            Self::Date32(mut b) => Arc::new(b.finish()),
            Self::Boolean(mut b) => Arc::new(b.finish()),
        }
    }
}

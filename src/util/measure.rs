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

use std::future::Future;
use std::time::{Duration, Instant};

use datafusion::common::Result;

use super::memory::MemoryWindow;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Wall-clock time and peak memory of one measured operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub peak_bytes: usize,
}

impl Measurement {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn peak_memory_mb(&self) -> f64 {
        self.peak_bytes as f64 / BYTES_PER_MB
    }
}

/// Run `op` exactly once and measure it.
///
/// The clock and the memory window bracket only the awaited operation. The
/// operation's output is dropped after the window is closed and is not
/// returned; an error from the operation is propagated instead of a
/// measurement.
pub async fn measure<F, Fut, T>(op: F) -> Result<Measurement>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let window = MemoryWindow::open();
    let start = Instant::now();

    let output = op().await;

    let elapsed = start.elapsed();
    let peak_bytes = window.close();

    let _ = output?;
    Ok(Measurement {
        elapsed,
        peak_bytes,
    })
}

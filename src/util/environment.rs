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

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::round_to;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Description of the machine a group of results was produced on.
///
/// Captured once per benchmark iteration and shared by every result of that
/// iteration, so all of them carry the same `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    /// ISO-8601 capture time (UTC)
    pub timestamp: String,
    /// Physical cores
    pub cpu_count: usize,
    /// Logical cores
    pub cpu_count_logical: usize,
    pub cpu_name: String,
    /// `None` when the platform does not report a frequency
    pub cpu_freq_mhz: Option<u64>,
    pub memory_total_gb: f64,
    pub memory_available_gb: f64,
}

impl EnvironmentSnapshot {
    pub fn capture() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_frequency())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );

        let cpu = sys.cpus().first();
        let cpu_name = cpu
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let cpu_freq_mhz = cpu.map(|cpu| cpu.frequency()).filter(|mhz| *mhz > 0);

        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            cpu_count: num_cpus::get_physical(),
            cpu_count_logical: num_cpus::get(),
            cpu_name,
            cpu_freq_mhz,
            memory_total_gb: to_gb(sys.total_memory()),
            memory_available_gb: to_gb(sys.available_memory()),
        }
    }
}

fn to_gb(bytes: u64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_GB, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn capture_describes_this_machine() {
        let snapshot = EnvironmentSnapshot::capture();

        assert!(snapshot.cpu_count >= 1);
        assert!(snapshot.cpu_count_logical >= 1);
        assert!(!snapshot.cpu_name.is_empty());
        assert_ne!(snapshot.cpu_freq_mhz, Some(0));
        assert!(snapshot.memory_total_gb > 0.0);
        assert!(snapshot.memory_available_gb >= 0.0);
        DateTime::parse_from_rfc3339(&snapshot.timestamp)
            .expect("timestamp should be RFC 3339");
    }

    #[test]
    fn gigabytes_are_rounded() {
        assert_eq!(to_gb(16 * 1024 * 1024 * 1024), 16.0);
        assert_eq!(to_gb(1_500_000_000), 1.4);
    }
}

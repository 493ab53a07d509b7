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

//! Data scales and the input files that belong to them

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use datafusion::common::{config_err, Result};
use datafusion::error::DataFusionError;
use serde::Serialize;

/// Number of distinct content identifiers in every dimension table,
/// regardless of the scenario.
pub const DIM_CONTENT_IDS: usize = 500_000;

/// A named data scale. Declaration order is the order used when running
/// all scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Small,
        Scenario::Medium,
        Scenario::Large,
        Scenario::Xlarge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
        }
    }

    /// Row count of the fact table generated for this scenario
    pub fn row_count(&self) -> usize {
        match self {
            Self::Small => 1_000,
            Self::Medium => 1_000_000,
            Self::Large => 10_000_000,
            Self::Xlarge => 100_000_000,
        }
    }

    pub fn fact_file_name(&self) -> String {
        format!("fact_content_performance_{}.parquet", self.name())
    }

    pub fn dim_file_name(&self) -> String {
        format!("dim_content_metadata_{}.parquet", self.name())
    }

    /// Resolve both input files of this scenario below `data_dir`
    pub fn files(&self, data_dir: &Path) -> ScenarioFiles {
        ScenarioFiles {
            fact: data_dir.join(self.fact_file_name()),
            dim: data_dir.join(self.dim_file_name()),
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = DataFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "xlarge" => Ok(Self::Xlarge),
            _ => config_err!(
                "Invalid scenario: {s}. Must be one of: {}",
                ScenarioSelector::VALID.join(", ")
            ),
        }
    }
}

/// Paths of the fact and dimension tables of one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFiles {
    pub fact: PathBuf,
    pub dim: PathBuf,
}

impl ScenarioFiles {
    /// First input file that does not exist, if any
    pub fn missing(&self) -> Option<&Path> {
        [&self.fact, &self.dim]
            .into_iter()
            .find(|path| !path.exists())
            .map(|path| path.as_path())
    }
}

/// `all` or a single scenario, as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenarioSelector {
    #[default]
    All,
    One(Scenario),
}

impl ScenarioSelector {
    pub const VALID: [&'static str; 5] = ["all", "small", "medium", "large", "xlarge"];

    pub fn scenarios(&self) -> Vec<Scenario> {
        match self {
            Self::All => Scenario::ALL.to_vec(),
            Self::One(scenario) => vec![*scenario],
        }
    }
}

impl FromStr for ScenarioSelector {
    type Err = DataFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::One),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_scenario_token() {
        let files = Scenario::Medium.files(Path::new("data"));
        assert_eq!(
            files.fact,
            PathBuf::from("data/fact_content_performance_medium.parquet")
        );
        assert_eq!(
            files.dim,
            PathBuf::from("data/dim_content_metadata_medium.parquet")
        );
    }

    #[test]
    fn row_counts() {
        let counts: Vec<_> = Scenario::ALL.iter().map(|s| s.row_count()).collect();
        assert_eq!(counts, vec![1_000, 1_000_000, 10_000_000, 100_000_000]);
    }

    #[test]
    fn selector_parsing() -> Result<()> {
        assert_eq!("all".parse::<ScenarioSelector>()?, ScenarioSelector::All);
        assert_eq!(
            "xlarge".parse::<ScenarioSelector>()?.scenarios(),
            vec![Scenario::Xlarge]
        );
        assert_eq!(ScenarioSelector::All.scenarios().len(), 4);

        let err = "huge".parse::<ScenarioSelector>().unwrap_err();
        assert!(matches!(err, DataFusionError::Configuration(_)));
        assert!(err.to_string().contains("Invalid scenario: huge"));
        // names are matched exactly
        assert!("Small".parse::<Scenario>().is_err());
        Ok(())
    }

    #[test]
    fn missing_reports_first_absent_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let files = Scenario::Small.files(dir.path());
        assert_eq!(files.missing(), Some(files.fact.as_path()));

        std::fs::write(&files.fact, b"")?;
        assert_eq!(files.missing(), Some(files.dim.as_path()));

        std::fs::write(&files.dim, b"")?;
        assert_eq!(files.missing(), None);
        Ok(())
    }
}

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

///
/// Per-window summary statistic. The set is closed: any other name is a
/// configuration error.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Statistic {
    Mean,
    Max,
    Min,
    Std,
    Coverage,
}

impl Statistic {
    pub const ALL: [Statistic; 5] = [
        Statistic::Mean,
        Statistic::Max,
        Statistic::Min,
        Statistic::Std,
        Statistic::Coverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Max => "max",
            Statistic::Min => "min",
            Statistic::Std => "std",
            Statistic::Coverage => "coverage",
        }
    }
}

impl Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "max" => Ok(Statistic::Max),
            "min" => Ok(Statistic::Min),
            "std" => Ok(Statistic::Std),
            "coverage" => Ok(Statistic::Coverage),
            _ => Err(ConfigError::UnsupportedStatistic(s.to_string())),
        }
    }
}

impl TryFrom<String> for Statistic {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Statistic> for String {
    fn from(value: Statistic) -> Self {
        value.as_str().to_string()
    }
}

/// Parse an ordered list of statistic names, failing on the first unknown one.
pub fn parse_statistics<S: AsRef<str>>(names: &[S]) -> Result<Vec<Statistic>, ConfigError> {
    if names.is_empty() {
        return Err(ConfigError::NoStatistics);
    }
    names.iter().map(|n| n.as_ref().parse()).collect()
}

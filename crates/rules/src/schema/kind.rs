//! Rule kind tag checked before full deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    ThresholdRule,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::ThresholdRule => write!(f, "ThresholdRule"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ThresholdRule" => Ok(RuleKind::ThresholdRule),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}

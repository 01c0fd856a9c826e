//! Filesystem rule loader.
//!
//! Scans the rules directory for YAML files and keeps the parsed threshold
//! rules in memory keyed by rule id.

mod core;
mod error;


pub use self::core::{parse_rule, RuleLoader};
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};

//! Core [`RuleLoader`] struct: filesystem-backed threshold rule loading.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::schema::{RuleKind, ThresholdRule};

use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Parse and validate a threshold rule from YAML text.
pub fn parse_rule(yaml: &str) -> Result<ThresholdRule> {
    let rule: ThresholdRule = serde_yaml::from_str(yaml)?;
    validate(&rule)?;
    Ok(rule)
}

fn validate(rule: &ThresholdRule) -> Result<()> {
    rule.kind.parse::<RuleKind>().map_err(RuleError::Validation)?;

    if rule.metadata.id.is_empty() {
        return Err(RuleError::Validation(
            "rule metadata.id must not be empty".to_string(),
        ));
    }

    let spec = rule.spec();
    let mut seen = HashSet::new();
    for field in &spec.fields {
        if !seen.insert(field.as_str()) {
            return Err(RuleError::Validation(format!(
                "rule '{}' groups on '{}' more than once",
                rule.metadata.id, field
            )));
        }
    }

    if rule.threshold.cardinality.len() > 1 {
        return Err(RuleError::Validation(format!(
            "rule '{}' declares {} cardinality conditions; at most one is supported",
            rule.metadata.id,
            rule.threshold.cardinality.len()
        )));
    }

    Ok(())
}

/// Filesystem-backed rule loader.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files,
/// deserializes them into [`ThresholdRule`] instances, and maintains an
/// in-memory map keyed by rule ID.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    /// In-memory store of all rules keyed by `metadata.id`.
    rules: Arc<RwLock<HashMap<String, ThresholdRule>>>,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            rules: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Dotfiles (filenames starting with `.`) and non-YAML files are skipped.
    /// Parse errors are reported per-file but do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results)?;
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            match self.load_file(&path) {
                Ok(rule) => {
                    let rule_id = rule.metadata.id.clone();
                    info!(rule_id = %rule_id, path = %path.display(), "loaded rule");
                    self.rules
                        .write()
                        .expect("rules lock poisoned")
                        .insert(rule_id.clone(), rule);
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { rule_id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse a single YAML file into a validated [`ThresholdRule`].
    pub fn load_file(&self, path: &Path) -> Result<ThresholdRule> {
        let contents = fs::read_to_string(path)?;
        parse_rule(&contents)
    }

    /// Look up a loaded rule by ID.
    pub fn get(&self, id: &str) -> Option<ThresholdRule> {
        self.rules.read().expect("rules lock poisoned").get(id).cloned()
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Get the shared rules map.
    pub fn rules(&self) -> Arc<RwLock<HashMap<String, ThresholdRule>>> {
        Arc::clone(&self.rules)
    }
}

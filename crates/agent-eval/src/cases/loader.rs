//! Eval case loading from YAML/JSON files
//!
//! Loads eval cases from a test directory. A file holds either one case or a
//! list of cases; list entries are parsed one by one so a bad entry does not
//! hide its siblings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Category, EvalCase};
use crate::error::{EvalError, EvalResult};

/// Filters applied to loaded cases; empty lists match everything
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub categories: Vec<Category>,
    pub tags: Vec<String>,
    pub ids: Vec<String>,
}

impl CaseFilter {
    /// Restrict to categories
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Restrict to cases carrying any of the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Restrict to explicit ids
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    /// Whether a case passes the filter (enablement is not considered here)
    pub fn matches(&self, case: &EvalCase) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&case.category()) {
            return false;
        }
        if !self.tags.is_empty() && !case.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&case.id) {
            return false;
        }
        true
    }
}

/// Entries of a YAML case file, each parsed on its own
fn yaml_entries(content: &str) -> Result<Vec<EvalResult<EvalCase>>, serde_yaml::Error> {
    let entries = match serde_yaml::from_str::<serde_yaml::Value>(content)? {
        serde_yaml::Value::Sequence(items) => items,
        single => vec![single],
    };
    Ok(entries
        .into_iter()
        .map(|entry| serde_yaml::from_value::<EvalCase>(entry).map_err(EvalError::from))
        .collect())
}

/// Entries of a JSON case file, each parsed on its own
fn json_entries(content: &str) -> Result<Vec<EvalResult<EvalCase>>, serde_json::Error> {
    let entries = match serde_json::from_str::<serde_json::Value>(content)? {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value::<EvalCase>(entry).map_err(EvalError::from))
        .collect())
}

/// Loader for eval cases
pub struct CaseLoader {
    /// Base directory for case files
    test_dir: PathBuf,
}

impl CaseLoader {
    /// Create a new loader over the given directory
    pub fn new(test_dir: impl AsRef<Path>) -> Self {
        Self {
            test_dir: test_dir.as_ref().to_path_buf(),
        }
    }

    /// The directory this loader reads
    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    /// Load every valid case, enabled or not
    pub fn load_all(&self) -> EvalResult<Vec<EvalCase>> {
        let mut cases = Vec::new();

        if !self.test_dir.exists() {
            tracing::warn!(dir = %self.test_dir.display(), "Test directory does not exist");
            return Ok(cases);
        }

        let mut seen = HashSet::new();

        for entry in WalkDir::new(&self.test_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !Self::is_case_file(path) {
                continue;
            }

            let loaded = match Self::load_case_file(path) {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::warn!("Skipping case file {:?}: {}", path, e);
                    continue;
                }
            };

            for (index, entry) in loaded.into_iter().enumerate() {
                let case = match entry {
                    Ok(case) => case,
                    Err(e) => {
                        tracing::warn!("Skipping entry {} in {:?}: {}", index, path, e);
                        continue;
                    }
                };
                if let Err(e) = case.validate() {
                    tracing::warn!("Skipping case in {:?}: {}", path, e);
                    continue;
                }
                if !seen.insert(case.id.clone()) {
                    tracing::warn!(case_id = %case.id, "Duplicate case id in {:?}, keeping the first", path);
                    continue;
                }
                cases.push(case);
            }
        }

        // Sort by category, then id
        cases.sort_by(|a, b| {
            a.category()
                .cmp(&b.category())
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(cases)
    }

    /// Load enabled cases passing the filter
    pub fn load_filtered(&self, filter: &CaseFilter) -> EvalResult<Vec<EvalCase>> {
        let cases = self.load_all()?;
        Ok(cases
            .into_iter()
            .filter(|c| c.enabled && filter.matches(c))
            .collect())
    }

    /// Load a single case by id
    pub fn load_by_id(&self, id: &str) -> EvalResult<Option<EvalCase>> {
        let cases = self.load_all()?;
        Ok(cases.into_iter().find(|c| c.id == id))
    }

    /// Get case count by category
    pub fn count_by_category(&self) -> EvalResult<std::collections::BTreeMap<Category, usize>> {
        let cases = self.load_all()?;
        let mut counts = std::collections::BTreeMap::new();

        for case in cases {
            *counts.entry(case.category()).or_insert(0) += 1;
        }

        Ok(counts)
    }

    /// Parse the entries of one file; unparsable entries come back as errors
    fn load_case_file(path: &Path) -> EvalResult<Vec<EvalResult<EvalCase>>> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::CaseLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let parsed = if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
            yaml_entries(&content).map_err(|e| e.to_string())
        } else {
            json_entries(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| EvalError::CaseLoad {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Check if a path is a case file
    fn is_case_file(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }

        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        )
    }
}

/// Load cases from a YAML string (useful for testing)
pub fn load_cases_from_yaml(yaml: &str) -> EvalResult<Vec<EvalCase>> {
    yaml_entries(yaml)?.into_iter().collect()
}

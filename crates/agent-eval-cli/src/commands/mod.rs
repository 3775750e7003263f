//! Command handlers

pub mod init;
pub mod list;
pub mod run;

use std::path::Path;

use agent_eval::{CaseFilter, Category, RunConfig};
use anyhow::{Result, bail};

/// Load the run config, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if path.exists() {
        Ok(RunConfig::load(path)?)
    } else {
        tracing::debug!("Config file {:?} not found, using defaults", path);
        Ok(RunConfig::default())
    }
}

/// Build a case filter from raw CLI values
pub fn build_filter(categories: &[String], tags: &[String], ids: &[String]) -> Result<CaseFilter> {
    let mut parsed = Vec::with_capacity(categories.len());
    for raw in categories {
        match Category::parse(raw) {
            Some(category) => parsed.push(category),
            None => {
                let known: Vec<_> = Category::all().iter().map(|c| c.as_str()).collect();
                bail!("Unknown category '{}' (expected one of: {})", raw, known.join(", "));
            }
        }
    }

    Ok(CaseFilter::default()
        .with_categories(parsed)
        .with_tags(tags.to_vec())
        .with_ids(ids.to_vec()))
}

//! `agent-eval list`

use std::path::Path;

use agent_eval::CaseLoader;
use anyhow::Result;
use colored::*;

use super::{build_filter, load_config};

/// List the cases under the configured test directory
pub async fn execute(config_file: &Path, categories: &[String], tags: &[String]) -> Result<()> {
    let config = load_config(config_file)?;
    let filter = build_filter(categories, tags, &[])?;
    let loader = CaseLoader::new(&config.test_dir);

    let cases: Vec<_> = loader
        .load_all()?
        .into_iter()
        .filter(|case| filter.matches(case))
        .collect();

    println!("\n{}\n", "Eval Cases".bold().underline());

    if cases.is_empty() {
        println!("No cases found in {}", config.test_dir.display());
        return Ok(());
    }

    println!(
        "{:<28} {:<36} {:<12} {}",
        "ID".bold(),
        "Name".bold(),
        "Category".bold(),
        "Judges".bold()
    );
    println!("{}", "-".repeat(96).dimmed());

    for case in &cases {
        let name = if case.name.chars().count() > 34 {
            format!("{}...", case.name.chars().take(31).collect::<String>())
        } else {
            case.name.clone()
        };
        let id = if case.enabled {
            case.id.normal()
        } else {
            case.id.dimmed()
        };
        println!(
            "{:<28} {:<36} {:<12} {}",
            id,
            name,
            case.category().as_str(),
            case.judges.join(", ")
        );
    }

    let disabled = cases.iter().filter(|c| !c.enabled).count();
    println!();
    println!("Total: {} cases ({} disabled)", cases.len(), disabled);

    Ok(())
}

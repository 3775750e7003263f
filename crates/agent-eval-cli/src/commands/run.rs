//! `agent-eval run`

use std::path::PathBuf;
use std::sync::Arc;

use agent_eval::{
    CommandAgent, CommandGrader, EvalProgress, EvalRunner, JudgeRegistry, ProgressStage,
    ReportFormat, SuiteHooks, generate_report,
};
use anyhow::{Context, Result};
use colored::*;

use super::{build_filter, load_config};
use crate::console::CliConsole;

/// Arguments of the run command
pub struct RunArgs {
    pub config_file: PathBuf,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub ids: Vec<String>,
    pub verbose: bool,
    pub format: String,
    pub output: Option<PathBuf>,
}

/// Run the suite and return the process exit code
pub async fn execute(args: RunArgs) -> Result<i32> {
    let console = CliConsole::new(args.verbose);

    let mut config = load_config(&args.config_file)?;
    if let Some(output) = args.output {
        config = config.with_output_dir(output);
    }
    if args.verbose {
        config = config.verbose();
    }

    let report_format: ReportFormat = args.format.parse().unwrap_or_else(|e: String| {
        console.warn(&format!("{}, falling back to table", e));
        ReportFormat::Table
    });

    let agent_command = config.agent.clone().with_context(|| {
        format!(
            "No agent configured; add an `agent` section to {}",
            args.config_file.display()
        )
    })?;
    console.info(&format!("Agent command: {}", agent_command));

    let registry = match config.grader.clone() {
        Some(grader) => {
            console.info(&format!("Rubric grader: {}", grader));
            JudgeRegistry::with_builtins_and_grader(Arc::new(CommandGrader::new(grader)))
        }
        None => JudgeRegistry::with_builtins(),
    };

    let filter = build_filter(&args.categories, &args.tags, &args.ids)?;
    let loader = agent_eval::CaseLoader::new(&config.test_dir);
    let hooks = SuiteHooks::from_config(&config.hooks);
    let verbose = config.verbose;

    let mut runner = EvalRunner::new(
        config,
        Arc::new(CommandAgent::new(agent_command)),
        Arc::new(registry),
    )
    .with_hooks(hooks);

    runner.set_progress_callback(Box::new(move |progress: EvalProgress| {
        print_progress(&progress, verbose);
    }));

    console.print_header("Running evals");

    let suite = runner.run_from_source(&loader, &filter).await?;

    let report = generate_report(&suite, report_format)?;
    println!("{}", report);

    if suite.total == 0 {
        console.warn("No eval cases matched");
    } else if suite.all_passed() {
        console.success(&format!("All {} cases passed", suite.total));
    } else {
        console.error(&format!(
            "{} of {} cases did not pass ({} failed, {} errored)",
            suite.failed + suite.errors,
            suite.total,
            suite.failed,
            suite.errors
        ));
    }

    Ok(if suite.all_passed() { 0 } else { 1 })
}

fn print_progress(progress: &EvalProgress, verbose: bool) {
    let position = format!("[{}/{}]", progress.current + 1, progress.total).dimmed();
    match progress.stage {
        ProgressStage::CaseStarted => {
            println!("{} {} {}", position, progress.case_id.bold(), progress.case_name);
        }
        ProgressStage::AttemptStarted if verbose || progress.attempt > 1 => {
            println!(
                "{}   attempt {}/{}",
                position, progress.attempt, progress.max_attempts
            );
        }
        ProgressStage::AttemptStarted => {}
        ProgressStage::CaseCompleted(status) => {
            let label = match status {
                agent_eval::CaseStatus::Passed => "PASS".green().bold(),
                agent_eval::CaseStatus::Failed => "FAIL".red().bold(),
                agent_eval::CaseStatus::Errored => "ERROR".yellow().bold(),
            };
            println!("{} {} {}", position, label, progress.case_id);
        }
    }
}

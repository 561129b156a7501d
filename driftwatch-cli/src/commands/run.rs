//! `driftwatch run` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use driftwatch_core::remote::CallContext;
use driftwatch_harness::{Scenario, ScenarioOutcome, ScenarioReport};

use crate::cli::RunArgs;
use crate::commands::render::unknown_scenario;
use crate::commands::{build_suite, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Every selected scenario runs to completion (including teardown) before the
/// summary is rendered. Returns `CliError::ScenariosFailed` if any scenario failed.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    ctx: &CallContext,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = load_config(config_path).await?;
    if let Some(parallel) = args.parallel {
        config.harness.max_parallel_scenarios = parallel;
        config.validate()?;
    }

    let suite = build_suite(&config);
    let scenarios = select_scenarios(&args.names, |name| suite.scenario(name))?;

    info!(
        scenarios = scenarios.len(),
        max_parallel = config.harness.max_parallel_scenarios,
        "running scenarios"
    );
    let reports = suite
        .run(scenarios, config.harness.max_parallel_scenarios, ctx)
        .await;

    let summary = RunSummary::new(reports);
    writer.render(&summary)?;

    if summary.failed > 0 {
        return Err(CliError::ScenariosFailed {
            failed: summary.failed,
            total: summary.total,
        });
    }
    Ok(())
}

/// Resolve the requested names; an empty selection means every registered scenario.
fn select_scenarios<F>(names: &[String], build: F) -> Result<Vec<Scenario>, CliError>
where
    F: Fn(&str) -> Option<Result<Scenario, driftwatch_harness::HarnessError>>,
{
    let requested: Vec<&str> = if names.is_empty() {
        driftwatch_cdn::SCENARIO_NAMES.to_vec()
    } else {
        names.iter().map(String::as_str).collect()
    };

    let mut scenarios = Vec::with_capacity(requested.len());
    for name in requested {
        if scenarios.iter().any(|s: &Scenario| s.name() == name) {
            continue;
        }
        let scenario = build(name).ok_or_else(|| unknown_scenario(name))??;
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

/// Result of a `run` invocation.
#[derive(Serialize)]
pub struct RunSummary {
    /// Number of scenarios run
    pub total: usize,
    /// Number of passed scenarios
    pub passed: usize,
    /// Number of failed scenarios
    pub failed: usize,
    /// Per-scenario reports in input order
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    fn new(reports: Vec<ScenarioReport>) -> Self {
        let passed = reports.iter().filter(|r| r.passed()).count();
        Self {
            total: reports.len(),
            passed,
            failed: reports.len() - passed,
            reports,
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<26} {:<8} {:>6} {:>10}", "Scenario", "Result", "Steps", "Elapsed")?;
        writeln!(w, "{}", "-".repeat(53))?;
        for report in &self.reports {
            let result = match report.outcome {
                ScenarioOutcome::Passed => "PASS".green().bold(),
                ScenarioOutcome::Failed => "FAIL".red().bold(),
            };
            writeln!(
                w,
                "{:<26} {:<8} {:>6} {:>8}ms",
                report.name, result, report.steps_completed, report.elapsed_ms
            )?;
            if let Some(message) = report.message() {
                writeln!(w, "  {}", message.red())?;
            }
        }
        writeln!(w)?;
        writeln!(
            w,
            "{} passed, {} failed, {} total",
            self.passed, self.failed, self.total
        )?;
        Ok(())
    }
}

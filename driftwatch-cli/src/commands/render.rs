//! `driftwatch render` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use driftwatch_harness::{LifecycleStep, Scenario};

use crate::commands::{build_suite, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `render` command.
pub async fn execute(name: &str, config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let suite = build_suite(&config);
    let scenario = suite
        .scenario(name)
        .ok_or_else(|| unknown_scenario(name))??;

    writer.render(&build_render_report(&scenario))
}

pub(crate) fn unknown_scenario(name: &str) -> CliError {
    CliError::Command(format!(
        "unknown scenario: {} (expected one of: {})",
        name,
        driftwatch_cdn::SCENARIO_NAMES.join(", ")
    ))
}

fn build_render_report(scenario: &Scenario) -> RenderReport {
    RenderReport {
        scenario: scenario.name().to_owned(),
        steps: scenario
            .steps()
            .iter()
            .enumerate()
            .map(|(i, step)| RenderedStep {
                index: i + 1,
                kind: step.kind(),
                config: step.config().map(str::to_owned),
                import_address: match step {
                    LifecycleStep::ImportVerify(import) => Some(import.address.to_string()),
                    LifecycleStep::Apply(_) => None,
                },
            })
            .collect(),
    }
}

/// Rendered documents of one scenario.
#[derive(Serialize)]
pub struct RenderReport {
    /// Scenario name
    pub scenario: String,
    /// Steps in order
    pub steps: Vec<RenderedStep>,
}

/// A single rendered step.
#[derive(Serialize)]
pub struct RenderedStep {
    /// 1-based step number
    pub index: usize,
    /// Step kind (`apply` or `import`)
    pub kind: &'static str,
    /// Configuration document of an apply step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Address verified by an import step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_address: Option<String>,
}

impl Render for RenderReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scenario: {}", self.scenario.bold())?;
        for step in &self.steps {
            writeln!(w)?;
            let header = format!("# step {}/{} ({})", step.index, self.steps.len(), step.kind);
            writeln!(w, "{}", header.cyan())?;
            if let Some(config) = &step.config {
                writeln!(w, "{}", config.trim())?;
            }
            if let Some(address) = &step.import_address {
                writeln!(w, "import {address}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_report_text() {
        let report = RenderReport {
            scenario: "public_key_basic".to_owned(),
            steps: vec![
                RenderedStep {
                    index: 1,
                    kind: "apply",
                    config: Some("resource \"cdn_public_key\" \"test\" {}\n".to_owned()),
                    import_address: None,
                },
                RenderedStep {
                    index: 2,
                    kind: "import",
                    config: None,
                    import_address: Some("cdn_public_key.test".to_owned()),
                },
            ],
        };

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("step 1/2 (apply)"));
        assert!(output.contains("resource \"cdn_public_key\" \"test\""));
        assert!(output.contains("import cdn_public_key.test"));
    }

    #[test]
    fn test_unknown_scenario_lists_known_names() {
        let err = unknown_scenario("nope");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("public_key_basic"));
    }
}

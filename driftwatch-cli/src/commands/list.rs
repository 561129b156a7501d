//! `driftwatch list` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use driftwatch_harness::Scenario;

use crate::commands::{build_suite, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let suite = build_suite(&config);
    let scenarios = suite.scenarios()?;

    writer.render(&build_list_report(&scenarios))
}

fn build_list_report(scenarios: &[Scenario]) -> ScenarioListReport {
    ScenarioListReport {
        scenarios: scenarios
            .iter()
            .map(|s| ScenarioEntry {
                name: s.name().to_owned(),
                description: s.description().to_owned(),
                steps: s.steps().iter().map(|step| step.kind()).collect(),
            })
            .collect(),
    }
}

/// Registered scenario listing.
#[derive(Serialize)]
pub struct ScenarioListReport {
    /// Scenarios in registration order
    pub scenarios: Vec<ScenarioEntry>,
}

/// A single scenario entry.
#[derive(Serialize)]
pub struct ScenarioEntry {
    /// Scenario name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Step kinds in order
    pub steps: Vec<&'static str>,
}

impl Render for ScenarioListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", "Scenarios".bold())?;
        writeln!(w, "{:<26} {:<22} Description", "Name", "Steps")?;
        writeln!(w, "{}", "-".repeat(90))?;
        for entry in &self.scenarios {
            writeln!(
                w,
                "{:<26} {:<22} {}",
                entry.name,
                entry.steps.join(" > "),
                entry.description
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ScenarioListReport {
        ScenarioListReport {
            scenarios: vec![
                ScenarioEntry {
                    name: "public_key_basic".to_owned(),
                    description: "basic".to_owned(),
                    steps: vec!["apply", "import"],
                },
                ScenarioEntry {
                    name: "public_key_disappears".to_owned(),
                    description: "disappears".to_owned(),
                    steps: vec!["apply"],
                },
            ],
        }
    }

    #[test]
    fn test_list_report_render_text() {
        let mut buffer = Vec::new();
        report()
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("public_key_basic"));
        assert!(output.contains("apply > import"));
        assert!(output.contains("public_key_disappears"));
    }

    #[test]
    fn test_list_report_json() {
        let json = serde_json::to_value(report()).expect("JSON serialization should succeed");
        let scenarios = json["scenarios"].as_array().expect("should be array");
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0]["steps"][1].as_str(), Some("import"));
    }
}

//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// driftwatch -- resource lifecycle verification harness.
///
/// Use `driftwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "driftwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the driftwatch.toml configuration file.
    #[arg(short, long, default_value = "driftwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the named scenarios.
    List,

    /// Run all or selected scenarios in parallel.
    Run(RunArgs),

    /// Print the configuration document of each step of a scenario.
    Render(RenderArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run scenarios against the in-memory CDN control plane.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario names (default: every registered scenario).
    pub names: Vec<String>,

    /// Override `harness.max_parallel_scenarios`.
    #[arg(short = 'p', long)]
    pub parallel: Option<usize>,
}

// ---- render ----

/// Render the documents of one scenario.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Scenario name.
    pub name: String,
}

// ---- config ----

/// Manage driftwatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, harness, cdn).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_list() {
        let cli = Cli::try_parse_from(["driftwatch", "list"]).expect("parse succeeded");
        assert!(matches!(cli.command, Commands::List));
        assert_eq!(cli.config, PathBuf::from("driftwatch.toml"));
        assert!(matches!(cli.output, OutputFormat::Text));
    }

    #[test]
    fn test_cli_parse_run_without_names() {
        let cli = Cli::try_parse_from(["driftwatch", "run"]).expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.names.is_empty(), "names should default to empty");
                assert!(args.parallel.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_with_names_and_parallel() {
        let cli = Cli::try_parse_from([
            "driftwatch",
            "run",
            "public_key_basic",
            "public_key_update",
            "-p",
            "2",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.names, vec!["public_key_basic", "public_key_update"]);
                assert_eq!(args.parallel, Some(2));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_render_requires_name() {
        assert!(Cli::try_parse_from(["driftwatch", "render"]).is_err());

        let cli = Cli::try_parse_from(["driftwatch", "render", "public_key_basic"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Render(args) => assert_eq!(args.name, "public_key_basic"),
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["driftwatch", "config", "show", "--section", "harness"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("harness")),
            _ => panic!("expected Config Show command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "driftwatch",
            "-c",
            "/etc/driftwatch.toml",
            "list",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/driftwatch.toml"));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["driftwatch", "--output", "yaml", "list"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}

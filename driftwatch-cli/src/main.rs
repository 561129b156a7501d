//! driftwatch CLI -- run and inspect resource lifecycle scenarios

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use driftwatch_core::config::{DriftwatchConfig, GeneralConfig};
use driftwatch_core::remote::CallContext;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let general = logging_config(&cli).await;
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(2);
    }

    // 레코더가 없으면 no-op
    driftwatch_core::metrics::describe_metrics();
    tracing::debug!(config = %cli.config.display(), "driftwatch starting");

    // Ctrl-C: 루트 컨텍스트 취소 (진행 중인 원격 호출은 Cancelled로 끝남)
    let ctx = CallContext::new();
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling remote calls");
            signal_ctx.cancel();
        }
    });

    if let Err(e) = run(cli, &ctx).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// Logging settings: effective config (defaults plus env overrides when the
/// file is missing or unusable) with the `--log-level` override.
async fn logging_config(cli: &Cli) -> GeneralConfig {
    let mut general = match commands::load_config(&cli.config).await {
        Ok(config) => config.general,
        Err(_) => {
            let mut config = DriftwatchConfig::default();
            config.apply_env_overrides();
            config.general
        }
    };
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    general
}

async fn run(cli: Cli, ctx: &CallContext) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::List => commands::list::execute(&cli.config, &writer).await,
        Commands::Run(args) => commands::run::execute(args, &cli.config, ctx, &writer).await,
        Commands::Render(args) => commands::render::execute(&args.name, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

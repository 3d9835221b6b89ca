//! Reassemble CLI - disassemble container images, prune bulky files and
//! rebuild slimmer images.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use clap::Parser;
use commands::disassemble::OutputMode;
use reassemble_core::engine::DockerCli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "info" }))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.debug, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let engine = DockerCli::new(cli.engine_bin.clone());

    let result = match &cli.command {
        cli::Commands::Disassemble(args) => commands::disassemble::execute(
            args,
            &engine,
            &*formatter,
            OutputMode {
                json: cli.json,
                quiet: cli.quiet,
            },
        ),
        cli::Commands::Audit(args) => commands::audit::execute(args, &*formatter, cli.json),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

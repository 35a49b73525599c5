//! webext CLI - build, validate, and live-reload browser extensions.

use clap::Parser;
use std::process::ExitCode;

use webext_cli::cli_args::{Cli, Commands};
use webext_cli::commands;
use webext_cli::config::{Config, Overrides};
use webext_cli::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let base = Overrides {
        quiet: cli.quiet,
        ..Default::default()
    };

    match cli.command {
        Commands::Build { context } => {
            let overrides = Overrides {
                quiet: base.quiet,
                ..context.overrides()
            };
            let config = Config::resolve(context.config.as_deref(), &overrides)?;
            init_logging(config.quiet, cli.verbose);
            commands::build::run(config)
        }
        Commands::Validate {
            manifest,
            vendor,
            config,
            json,
        } => {
            let overrides = Overrides { vendor, ..base };
            let config = Config::resolve(config.as_deref(), &overrides)?;
            // Diagnostics go to stdout; keep logs out of the JSON stream.
            init_logging(config.quiet || json, cli.verbose);
            commands::validate::run(&manifest, config.pipeline_options(), json)
        }
        Commands::Watch {
            context,
            server,
            no_autoreload,
        } => {
            let mut overrides = Overrides {
                quiet: base.quiet,
                no_autoreload,
                ..context.overrides()
            };
            server.apply(&mut overrides);
            let config = Config::resolve(context.config.as_deref(), &overrides)?;
            init_logging(config.quiet, cli.verbose);
            commands::watch::run(config)
        }
        Commands::Listen {
            server,
            manifest,
            vendor,
        } => {
            let mut overrides = Overrides { vendor, ..base };
            server.apply(&mut overrides);
            let config = Config::resolve(None, &overrides)?;
            init_logging(config.quiet, cli.verbose);
            commands::listen::run(&config, manifest.as_deref())
        }
    }
}

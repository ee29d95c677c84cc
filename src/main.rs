use anyhow::Result;
use clap::{Command, CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use foldwatch::cli::{Cli, Commands};
use foldwatch::output::{self, Verbosity};
use foldwatch::{FoldwatchContext, commands};
use std::io;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    output::set_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose));

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let ctx = FoldwatchContext::new()?;
    init_tracing(&ctx.config.log.level, cli.verbose);

    match cli.command {
        Commands::Add { path, interval } => commands::add::execute(&ctx, &path, &interval),
        Commands::Remove { path } => commands::remove::execute(&ctx, &path),
        Commands::Interval { path, interval } => {
            commands::interval::execute(&ctx, &path, &interval)
        }
        Commands::Check { path } => commands::check::execute(&ctx, path.as_deref()),
        Commands::Snapshot => commands::snapshot::execute(&ctx),
        Commands::List { sort, filter } => commands::list::execute(&ctx, sort, filter.as_deref()),
        Commands::Log { path, clear } => commands::log::execute(&ctx, path.as_deref(), clear),
        Commands::Watch { tick, once } => commands::watch::execute(&ctx, tick, once),
        Commands::Completion { .. } => Ok(()),
    }
}

/// Install the stderr diagnostic logger.
///
/// `RUST_LOG` wins; otherwise the configured level applies to this crate,
/// raised to `debug` by `--verbose`.
fn init_tracing(level: &str, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        level.to_ascii_lowercase()
    };

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("foldwatch={level}"))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn print_completions<G: Generator>(generator: G, cmd: &mut Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

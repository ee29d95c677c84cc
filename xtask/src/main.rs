//! Development tasks for foldwatch.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for foldwatch")]
enum Task {
    /// Generate man pages from the CLI definitions
    GenerateManPages {
        /// Output directory for man pages
        #[arg(short, long, default_value = "man")]
        output: PathBuf,
    },
}

/// Subcommands that get a page of their own.
const SUBCOMMAND_PAGES: [&str; 5] = ["add", "check", "list", "log", "watch"];

fn main() -> Result<()> {
    match Task::parse() {
        Task::GenerateManPages { output } => generate_man_pages(&output),
    }
}

fn render(cmd: clap::Command, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create man page: {}", path.display()))?;
    clap_mangen::Man::new(cmd).render(&mut BufWriter::new(file))?;
    println!("✓ Generated: {}", path.display());
    Ok(())
}

fn generate_man_pages(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let mut cmd = foldwatch::cli::Cli::command();
    render(cmd.clone(), &output_dir.join("foldwatch.1"))?;

    for name in SUBCOMMAND_PAGES {
        if let Some(subcmd) = cmd.find_subcommand_mut(name) {
            render(subcmd.clone(), &output_dir.join(format!("foldwatch-{name}.1")))?;
        }
    }

    println!("\nMan pages generated in: {}", output_dir.display());
    println!("  man {}/foldwatch.1", output_dir.display());
    Ok(())
}

//! `oxslo` binary: generates and validates Prometheus SLO rules.

mod commands;
mod discover;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oxslo")]
#[command(version, about = "Generate Prometheus recording and alerting rules from SLO specs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate Prometheus rules from SLO spec files
    Generate(GenerateArgs),
    /// Validate SLO spec files without writing rules
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// SLO spec file, or directory to search for spec files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Rule file to write, `-` for stdout
    #[arg(short, long, default_value = "-")]
    pub output: String,

    /// Regex selecting discovered spec files when input is a directory
    #[arg(long)]
    pub fs_include: Option<String>,

    /// Regex excluding discovered spec files; wins over --fs-include
    #[arg(long)]
    pub fs_exclude: Option<String>,

    /// Keep the first declaration of a duplicated SLO instead of failing
    #[arg(long)]
    pub ignore_slo_duplicates: bool,

    /// Extra labels stamped on every generated rule
    #[arg(long = "extra-labels", value_name = "KEY=VALUE")]
    pub extra_labels: Vec<String>,

    /// Error budget period for SLOs that do not set one
    #[arg(long, default_value = "30d")]
    pub default_slo_period: String,

    /// Leave recording rules out of the output
    #[arg(long)]
    pub disable_recordings: bool,

    /// Leave alerting rules out of the output
    #[arg(long)]
    pub disable_alerts: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// SLO spec file, or directory to search for spec files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Regex selecting discovered spec files when input is a directory
    #[arg(long)]
    pub fs_include: Option<String>,

    /// Regex excluding discovered spec files; wins over --fs-include
    #[arg(long)]
    pub fs_exclude: Option<String>,

    /// Keep the first declaration of a duplicated SLO instead of failing
    #[arg(long)]
    pub ignore_slo_duplicates: bool,

    /// Error budget period for SLOs that do not set one
    #[arg(long, default_value = "30d")]
    pub default_slo_period: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug)?;

    let summary = match &cli.command {
        Commands::Generate(args) => commands::run_generate(args)?,
        Commands::Validate(args) => commands::run_validate(args)?,
    };
    if summary.failed() {
        std::process::exit(1);
    }
    Ok(())
}

// Logs go to stderr so piping generated rules to stdout stays clean.
fn init_logging(debug: bool) -> Result<()> {
    let directive = if debug { "oxslo=debug" } else { "oxslo=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

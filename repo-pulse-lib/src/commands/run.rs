//! Command dispatch logic for repo-pulse

use super::{
    ChartArgs, CommitsArgs, InfoArgs, InitArgs, IssuesArgs, MetricsArgs, ReadmeArgs, SeriesArgs, ServeArgs, ValidateArgs, init_config,
    list_commits, list_issues, serve_stdio, show_info, show_metrics, show_readme, show_series, validate_config, write_chart,
};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-pulse", author, version, long_about = None)]
#[command(about = "Activity metrics and charts for GitHub repositories")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PulseSubcommand,
}

#[derive(Subcommand, Debug)]
enum PulseSubcommand {
    /// Show repository metadata
    Info(InfoArgs),
    /// List repository issues
    Issues(IssuesArgs),
    /// List recent commits with line statistics
    Commits(CommitsArgs),
    /// Compute activity metrics over a window of days
    Metrics(MetricsArgs),
    /// Count commits per day over a window of days
    Series(SeriesArgs),
    /// Render a PNG bar chart of daily commits
    Chart(ChartArgs),
    /// Print the repository readme
    Readme(ReadmeArgs),
    /// Answer line-delimited JSON tool requests on stdin
    Serve(ServeArgs),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        PulseSubcommand::Info(args) => show_info(host, args).await,
        PulseSubcommand::Issues(args) => list_issues(host, args).await,
        PulseSubcommand::Commits(args) => list_commits(host, args).await,
        PulseSubcommand::Metrics(args) => show_metrics(host, args).await,
        PulseSubcommand::Series(args) => show_series(host, args).await,
        PulseSubcommand::Chart(args) => write_chart(host, args).await,
        PulseSubcommand::Readme(args) => show_readme(host, args).await,
        PulseSubcommand::Serve(args) => serve_stdio(host, args).await,
        PulseSubcommand::Init(args) => init_config(host, args),
        PulseSubcommand::Validate(args) => validate_config(host, args),
    }
}

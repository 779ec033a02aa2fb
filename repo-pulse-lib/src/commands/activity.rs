use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::hosting::RepositoryIdentifier;
use crate::reports::{generate_console, metrics_json};
use crate::tools::{DEFAULT_DAYS, ToolCall, WindowArgs};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use std::io::Write;

/// How metrics are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricsFormat {
    /// Machine-readable JSON
    Json,

    /// Human-readable summary
    Text,
}

#[derive(Parser, Debug)]
pub struct MetricsArgs {
    /// Repository to measure (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Number of days to look back, today included
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    pub format: MetricsFormat,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct SeriesArgs {
    /// Repository to chart (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Number of days to look back, today included
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct ChartArgs {
    /// Repository to chart (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Number of days to look back, today included
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    /// Where to write the PNG image
    #[arg(long, short = 'o', value_name = "PATH", default_value = "activity.png")]
    pub output: Utf8PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn show_metrics<H: Host>(host: &mut H, args: &MetricsArgs) -> Result<()> {
    let repo: RepositoryIdentifier = args.repo.parse()?;
    let mut common = Common::new(host, &args.common)?;
    let metrics = common.toolbox.engine().activity_metrics(&repo, args.days).await?;

    match args.format {
        MetricsFormat::Json => common.write_json(&metrics_json(&metrics)),
        MetricsFormat::Text => {
            let mut text = String::new();
            generate_console(&metrics, common.use_colors, &mut text)?;
            let _ = write!(common.host().output(), "{text}");
            Ok(())
        }
    }
}

pub async fn show_series<H: Host>(host: &mut H, args: &SeriesArgs) -> Result<()> {
    let call = ToolCall::ActivitySeries(WindowArgs {
        repo_name: args.repo.clone(),
        days: args.days,
    });
    Common::new(host, &args.common)?.run_tool(&call, None).await
}

pub async fn write_chart<H: Host>(host: &mut H, args: &ChartArgs) -> Result<()> {
    let call = ToolCall::ActivityChart(WindowArgs {
        repo_name: args.repo.clone(),
        days: args.days,
    });
    Common::new(host, &args.common)?.run_tool(&call, Some(args.output.as_path())).await
}

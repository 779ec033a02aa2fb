//! Command-line interface for repo-pulse
//!
//! Every query command builds a [`ToolCall`](crate::tools::ToolCall) and runs it
//! through the same [`Toolbox`](crate::tools::Toolbox) that backs `serve`, so the
//! CLI and the request loop return identical data. `metrics --format text`
//! renders the console summary instead of JSON.
//!
//! The `common` module loads the configuration, sets up logging, and builds the
//! engine. `init` writes the default configuration and `validate` checks one.

mod activity;
mod common;
mod config;
mod host;
mod init;
mod inspect;
mod run;
mod serve;
mod validate;

#[cfg(debug_assertions)]
pub use config::Config;

pub use activity::{ChartArgs, MetricsArgs, MetricsFormat, SeriesArgs, show_metrics, show_series, write_chart};
pub use common::{ColorMode, CommonArgs, LogLevel};
pub use host::Host;
#[cfg(test)]
pub use host::TestHost;
pub use init::{InitArgs, init_config};
pub use inspect::{CommitsArgs, InfoArgs, IssuesArgs, ReadmeArgs, list_commits, list_issues, show_info, show_readme};
pub use run::run;
pub use serve::{ServeArgs, serve_stdio};
pub use validate::{ValidateArgs, validate_config};

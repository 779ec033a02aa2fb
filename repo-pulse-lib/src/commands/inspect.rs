use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::tools::{self, DEFAULT_DAYS, DEFAULT_MAX_COMMITS, DEFAULT_MAX_ISSUES, ToolCall};
use clap::Parser;

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Repository to describe (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct IssuesArgs {
    /// Repository to list issues of (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Issue state to list: open, closed, or all
    #[arg(long, default_value = "open")]
    pub state: String,

    /// Maximum number of issues to list
    #[arg(long, default_value_t = DEFAULT_MAX_ISSUES)]
    pub max_count: usize,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct CommitsArgs {
    /// Repository to list commits of (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Number of days to look back, today included
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    /// Maximum number of commits to list
    #[arg(long, default_value_t = DEFAULT_MAX_COMMITS)]
    pub max_count: usize,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct ReadmeArgs {
    /// Repository to read (format: `owner/name`)
    #[arg(value_name = "REPO")]
    pub repo: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn show_info<H: Host>(host: &mut H, args: &InfoArgs) -> Result<()> {
    let call = ToolCall::RepositoryInfo(tools::RepoArgs {
        repo_name: args.repo.clone(),
    });
    Common::new(host, &args.common)?.run_tool(&call, None).await
}

pub async fn list_issues<H: Host>(host: &mut H, args: &IssuesArgs) -> Result<()> {
    let call = ToolCall::Issues(tools::IssuesArgs {
        repo_name: args.repo.clone(),
        state: args.state.clone(),
        max_issues: args.max_count,
    });
    Common::new(host, &args.common)?.run_tool(&call, None).await
}

pub async fn list_commits<H: Host>(host: &mut H, args: &CommitsArgs) -> Result<()> {
    let call = ToolCall::Commits(tools::CommitsArgs {
        repo_name: args.repo.clone(),
        days: args.days,
        max_commits: args.max_count,
    });
    Common::new(host, &args.common)?.run_tool(&call, None).await
}

pub async fn show_readme<H: Host>(host: &mut H, args: &ReadmeArgs) -> Result<()> {
    let call = ToolCall::Readme(tools::RepoArgs {
        repo_name: args.repo.clone(),
    });
    Common::new(host, &args.common)?.run_tool(&call, None).await
}

//! Setup shared by every command that talks to the hosting service.

use super::Host;
use super::config::Config;
use crate::Result;
use crate::engine::Engine;
use crate::tools::{ToolCall, ToolOutput, Toolbox};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use ohno::IntoAppError;
use serde_json::Value;
use std::io::Write;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    #[must_use]
    pub fn use_colors(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stdout};
                stdout().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments shared by every command that calls the hosting service
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path to configuration file (default is `repo-pulse.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Base URL of the GitHub API, overriding the configuration file
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

pub struct Common<'a, H: Host> {
    pub toolbox: Toolbox,
    pub use_colors: bool,
    host: &'a mut H,
}

impl<'a, H: Host> Common<'a, H> {
    /// Set up logging, load the configuration, and build the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no token is available
    pub fn new(host: &'a mut H, args: &CommonArgs) -> Result<Self> {
        Self::init_logging(args.log_level);

        let config = Config::load(Utf8Path::new("."), args.config.as_ref())?;
        let settings = config.engine_settings(args.github_token.as_deref(), args.api_url.as_deref())?;
        let engine = Engine::new(&settings)?;

        Ok(Self {
            toolbox: Toolbox::new(engine),
            use_colors: args.color.use_colors(),
            host,
        })
    }

    /// Initialize logger based on log level
    fn init_logging(log_level: LogLevel) {
        let level = match log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);

        // A logger may already be installed when several commands run in one process
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
            .try_init();
    }

    pub const fn host(&mut self) -> &mut H {
        self.host
    }

    /// Run `call` and write its output: JSON and text to the output stream, images to `image_path`
    pub async fn run_tool(&mut self, call: &ToolCall, image_path: Option<&Utf8Path>) -> Result<()> {
        let output = self.toolbox.invoke(call).await?;

        match output {
            ToolOutput::Json(value) => self.write_json(&value),
            ToolOutput::Text(text) => {
                let _ = write!(self.host.output(), "{text}");
                if !text.ends_with('\n') {
                    let _ = writeln!(self.host.output());
                }
                Ok(())
            }
            ToolOutput::Image { data, .. } => {
                let Some(path) = image_path else {
                    ohno::bail!("no output path given for the image");
                };

                std::fs::write(path, &data).into_app_err_with(|| format!("writing image to '{path}'"))?;
                let _ = writeln!(self.host.output(), "Wrote {} bytes to {path}", data.len());
                Ok(())
            }
        }
    }

    pub fn write_json(&mut self, value: &Value) -> Result<()> {
        let text = serde_json::to_string_pretty(value).into_app_err("serializing JSON output")?;
        let _ = writeln!(self.host.output(), "{text}");
        Ok(())
    }
}

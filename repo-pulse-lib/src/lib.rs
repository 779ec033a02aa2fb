#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for repo-pulse
//!
//! This library holds all functionality for the repo-pulse tool, which reports
//! recent activity of GitHub repositories: commit, issue, pull request, and
//! contributor counts over a window of days, daily commit series, and charts.
//!
//! # Module Organization
//!
//! - [`hosting`]: Rate-limited, paginated access to the GitHub API
//! - [`activity`]: Time windows, metric aggregation, daily series, and charts
//! - [`engine`]: The shared context every operation runs against
//! - [`tools`]: Named operations with typed arguments, and the JSON request loop
//! - [`reports`]: JSON and console rendering of results
//! - [`commands`]: Command-line interface and configuration

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod activity;
#[cfg(not(any(debug_assertions, test)))]
mod activity;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod engine;
#[cfg(not(any(debug_assertions, test)))]
mod engine;

#[cfg(any(debug_assertions, test))]
pub mod hosting;
#[cfg(not(any(debug_assertions, test)))]
mod hosting;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

#[cfg(any(debug_assertions, test))]
pub mod tools;
#[cfg(not(any(debug_assertions, test)))]
mod tools;

pub use crate::commands::{Host, run};

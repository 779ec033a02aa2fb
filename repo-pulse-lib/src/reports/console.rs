use crate::Result;
use crate::activity::{ActivityMetrics, Measurement};
use core::fmt::Write;
use owo_colors::OwoColorize;

/// Write a human-readable summary of `metrics`.
pub fn generate<W: Write>(metrics: &ActivityMetrics, use_colors: bool, writer: &mut W) -> Result<()> {
    let title = format!(
        "Activity for {} over the last {} days",
        metrics.repository,
        metrics.window.days()
    );
    if use_colors {
        writeln!(writer, "{}", title.bold())?;
    } else {
        writeln!(writer, "{title}")?;
    }

    writeln!(
        writer,
        "{} to {}",
        metrics.window.start().format("%Y-%m-%d"),
        metrics.window.end().format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(writer)?;

    let active = metrics.active_contributors.clone().map(|set| set.len() as u64);
    let rows = [
        ("Commits", &metrics.commits),
        ("Issues opened", &metrics.issues_opened),
        ("Issues closed", &metrics.issues_closed),
        ("Pull requests opened", &metrics.prs_opened),
        ("Pull requests merged", &metrics.prs_merged),
        ("Active contributors", &active),
        ("All-time contributors", &metrics.total_contributors),
    ];

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in rows {
        writeln!(writer, "  {name:<width$} : {}", format_measurement(value, use_colors))?;
    }

    if let Some(top) = metrics.top_contributors.value()
        && !top.is_empty()
    {
        writeln!(writer)?;
        writeln!(writer, "Top contributors: {}", top.join(", "))?;
    }

    if !metrics.failures.is_empty() {
        writeln!(writer)?;
        for failure in &metrics.failures {
            let line = format!("Could not fetch {}: {}", failure.kind.plural(), failure.error);
            if use_colors {
                writeln!(writer, "{}", line.yellow())?;
            } else {
                writeln!(writer, "{line}")?;
            }
        }
    }

    Ok(())
}

fn format_measurement(value: &Measurement<u64>, use_colors: bool) -> String {
    match value {
        Measurement::Observed(n) => n.to_string(),
        Measurement::Truncated(n) if use_colors => format!("{n}+").yellow().to_string(),
        Measurement::Truncated(n) => format!("{n}+"),
        Measurement::Unknown if use_colors => "n/a".red().to_string(),
        Measurement::Unknown => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{CategoryFailure, TimeWindow};
    use crate::hosting::{HostingError, RecordKind, RepositoryIdentifier};
    use chrono::{DateTime, Utc};
    use std::collections::BTreeSet;

    fn metrics() -> ActivityMetrics {
        let now = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z").unwrap().with_timezone(&Utc);
        ActivityMetrics {
            repository: RepositoryIdentifier::parse("octo/demo").unwrap(),
            window: TimeWindow::ending_at(now, 7).unwrap(),
            commits: Measurement::Observed(8),
            issues_opened: Measurement::Truncated(100),
            issues_closed: Measurement::Observed(0),
            prs_opened: Measurement::Unknown,
            prs_merged: Measurement::Unknown,
            active_contributors: Measurement::Observed(BTreeSet::from(["alice".to_string()])),
            total_contributors: Measurement::Observed(12),
            top_contributors: Measurement::Observed(vec!["alice".into(), "bob".into()]),
            failures: vec![CategoryFailure {
                kind: RecordKind::PullRequest,
                error: HostingError::Upstream {
                    context: "fetching pull requests for 'octo/demo'".into(),
                    status: 502,
                },
            }],
        }
    }

    #[test]
    fn test_generate_plain() {
        let mut output = String::new();
        generate(&metrics(), false, &mut output).unwrap();

        assert!(output.contains("Activity for octo/demo over the last 7 days"));
        assert!(output.contains("2024-03-04 to 2024-03-10 12:00 UTC"));
        assert!(output.contains("Commits               : 8"));
        assert!(output.contains("Issues opened         : 100+"));
        assert!(output.contains("Pull requests opened  : n/a"));
        assert!(output.contains("Top contributors: alice, bob"));
        assert!(output.contains("Could not fetch pull requests"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_generate_colors() {
        let mut output = String::new();
        generate(&metrics(), true, &mut output).unwrap();
        assert!(output.contains("\x1b["));
    }
}

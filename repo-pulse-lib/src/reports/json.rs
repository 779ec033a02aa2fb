use crate::activity::{ActivityMetrics, ActivitySeries};
use crate::hosting::{NormalizedRecord, RecordDetail};
use serde_json::{Value, json};

/// JSON object for an issue record, `null` for any other kind
#[must_use]
pub fn issue_json(record: &NormalizedRecord) -> Value {
    let RecordDetail::Issue(issue) = &record.detail else {
        return Value::Null;
    };

    json!({
        "number": issue.number,
        "title": issue.title,
        "state": record.state.map(|s| s.to_string()),
        "created_at": issue.created_at,
        "updated_at": issue.updated_at,
        "closed_at": issue.closed_at,
        "author": record.author,
        "labels": issue.labels,
        "comments": issue.comments,
        "html_url": issue.html_url,
        "body": issue.body,
    })
}

/// JSON object for a commit record, `null` for any other kind
#[must_use]
pub fn commit_json(record: &NormalizedRecord) -> Value {
    let RecordDetail::Commit(commit) = &record.detail else {
        return Value::Null;
    };

    json!({
        "sha": commit.sha,
        "message": commit.message,
        "author": commit.author_name,
        "author_login": commit.author_login,
        "date": commit.date,
        "html_url": commit.html_url,
        "stats": commit.stats,
    })
}

#[expect(unused_results, reason = "Map::insert never overwrites here")]
#[must_use]
pub fn metrics_json(metrics: &ActivityMetrics) -> Value {
    let mut obj = serde_json::Map::new();

    obj.insert("repository".to_string(), json!(metrics.repository.to_string()));
    obj.insert("time_period_days".to_string(), json!(metrics.window.days()));
    obj.insert(
        "window".to_string(),
        json!({
            "start": metrics.window.start(),
            "end": metrics.window.end(),
        }),
    );

    obj.insert("commit_count".to_string(), json!(metrics.commits));
    obj.insert("issues_opened_count".to_string(), json!(metrics.issues_opened));
    obj.insert("issues_closed_count".to_string(), json!(metrics.issues_closed));
    obj.insert("prs_opened_count".to_string(), json!(metrics.prs_opened));
    obj.insert("prs_merged_count".to_string(), json!(metrics.prs_merged));

    obj.insert(
        "active_contributor_count".to_string(),
        json!(metrics.active_contributors.clone().map(|set| set.len())),
    );
    obj.insert("active_contributors".to_string(), json!(metrics.active_contributors));
    obj.insert("contributor_count".to_string(), json!(metrics.total_contributors));
    obj.insert("top_contributors".to_string(), json!(metrics.top_contributors));

    obj.insert(
        "truncated".to_string(),
        json!(metrics.truncated_kinds().iter().map(ToString::to_string).collect::<Vec<_>>()),
    );
    obj.insert(
        "incomplete".to_string(),
        json!(
            metrics
                .failures
                .iter()
                .map(|f| json!({
                    "category": f.kind.to_string(),
                    "kind": f.error.kind(),
                    "message": f.error.to_string(),
                }))
                .collect::<Vec<_>>()
        ),
    );

    Value::Object(obj)
}

#[must_use]
pub fn series_json(series: &ActivitySeries) -> Value {
    json!({
        "repository": series.repository.to_string(),
        "time_period_days": series.window.days(),
        "truncated": series.truncated,
        "total": series.total(),
        "points": series.points,
    })
}

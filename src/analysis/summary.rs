use crate::models::bug::{
    BreakdownEntry, BugRecord, BugSummary, Severity, SeverityCounts, Status, StatusCounts,
};
use std::cmp::Reverse;

pub const RECENT_LIMIT: usize = 5;

pub fn summarize(bugs: &[BugRecord]) -> BugSummary {
    let mut by_status = StatusCounts::default();
    let mut by_severity = SeverityCounts::default();

    for bug in bugs {
        match bug.status {
            Status::Open => by_status.open += 1,
            Status::InProgress => by_status.in_progress += 1,
            Status::Resolved => by_status.resolved += 1,
            Status::Closed => by_status.closed += 1,
        }
        match bug.severity {
            Severity::Low => by_severity.low += 1,
            Severity::Medium => by_severity.medium += 1,
            Severity::High => by_severity.high += 1,
            Severity::Critical => by_severity.critical += 1,
        }
    }

    let severity_breakdown = Severity::ALL
        .iter()
        .map(|severity| (severity.as_str(), severity_count(&by_severity, *severity)))
        .filter_map(non_zero_entry)
        .collect();
    let status_breakdown = Status::ALL
        .iter()
        .map(|status| (status.as_str(), status_count(&by_status, *status)))
        .filter_map(non_zero_entry)
        .collect();

    BugSummary {
        total: bugs.len(),
        by_status,
        by_severity,
        severity_breakdown,
        status_breakdown,
        recent: most_recent(bugs, RECENT_LIMIT),
    }
}

/// Newest first. `sort_by_key` is stable, so equal timestamps keep stored order.
pub fn most_recent(bugs: &[BugRecord], limit: usize) -> Vec<BugRecord> {
    let mut sorted: Vec<BugRecord> = bugs.to_vec();
    sorted.sort_by_key(|bug| Reverse(bug.created_at));
    sorted.truncate(limit);
    sorted
}

fn severity_count(counts: &SeverityCounts, severity: Severity) -> usize {
    match severity {
        Severity::Low => counts.low,
        Severity::Medium => counts.medium,
        Severity::High => counts.high,
        Severity::Critical => counts.critical,
    }
}

fn status_count(counts: &StatusCounts, status: Status) -> usize {
    match status {
        Status::Open => counts.open,
        Status::InProgress => counts.in_progress,
        Status::Resolved => counts.resolved,
        Status::Closed => counts.closed,
    }
}

fn non_zero_entry((name, value): (&str, usize)) -> Option<BreakdownEntry> {
    (value > 0).then(|| BreakdownEntry {
        name: name.to_string(),
        value,
    })
}

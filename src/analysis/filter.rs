use crate::models::bug::{BugFilter, BugRecord};

/// Records matching every set axis of `filter`, in stored order.
pub fn filter_bugs(bugs: &[BugRecord], filter: &BugFilter) -> Vec<BugRecord> {
    let needle = filter
        .search
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    bugs.iter()
        .filter(|bug| matches_search(bug, &needle))
        .filter(|bug| filter.status.map_or(true, |status| bug.status == status))
        .filter(|bug| filter.severity.map_or(true, |severity| bug.severity == severity))
        .cloned()
        .collect()
}

fn matches_search(bug: &BugRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    bug.title.to_lowercase().contains(needle) || bug.description.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bug::{Severity, Status};
    use chrono::Utc;

    fn bug(id: &str, title: &str, description: &str, severity: Severity, status: Status) -> BugRecord {
        BugRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            severity,
            status,
            url: None,
            browser: None,
            steps: None,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<BugRecord> {
        vec![
            bug("1", "Login button unresponsive", "Click does nothing", Severity::Critical, Status::Open),
            bug("2", "Typo on pricing page", "Says 'Pirce'", Severity::Low, Status::Open),
            bug("3", "Checkout timeout", "LOGIN session expires mid-payment", Severity::Critical, Status::InProgress),
            bug("4", "Avatar upload fails", "500 on large files", Severity::High, Status::Resolved),
        ]
    }

    fn ids(bugs: &[BugRecord]) -> Vec<&str> {
        bugs.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let bugs = sample();
        assert_eq!(filter_bugs(&bugs, &BugFilter::default()), bugs);

        let blank_search = BugFilter {
            search: Some(String::new()),
            ..BugFilter::default()
        };
        assert_eq!(filter_bugs(&bugs, &blank_search), bugs);
    }

    #[test]
    fn status_and_severity_are_anded() {
        let filter = BugFilter {
            status: Some(Status::Open),
            severity: Some(Severity::Critical),
            ..BugFilter::default()
        };
        assert_eq!(ids(&filter_bugs(&sample(), &filter)), vec!["1"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let filter = BugFilter {
            search: Some("login".to_string()),
            ..BugFilter::default()
        };
        assert_eq!(ids(&filter_bugs(&sample(), &filter)), vec!["1", "3"]);

        let narrowed = BugFilter {
            search: Some("Login".to_string()),
            status: Some(Status::InProgress),
            ..BugFilter::default()
        };
        assert_eq!(ids(&filter_bugs(&sample(), &narrowed)), vec!["3"]);
    }
}

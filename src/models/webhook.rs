use serde::{Deserialize, Serialize};

/// Column order the spreadsheet script writes for every mirrored bug.
pub const SHEET_COLUMNS: [&str; 8] = [
    "Timestamp",
    "Title",
    "Description",
    "Severity",
    "Status",
    "URL",
    "Browser",
    "Steps",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub webhook_url: String,
}

/// Derived from the presence of a saved config on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStatus {
    pub connected: bool,
    pub webhook_url: Option<String>,
}

/// Body POSTed to the webhook. Deployed scripts depend on this exact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub timestamp: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionOutcome {
    LikelySuccess,
    AuthorizationRejected,
    NetworkFailure,
}

impl ConnectionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ConnectionOutcome::LikelySuccess => {
                "Test data sent. Check the spreadsheet to confirm the row arrived."
            }
            ConnectionOutcome::AuthorizationRejected => {
                "The webhook rejected the request (HTTP 401). Redeploy the script with \"Execute as: Me\" and \"Who has access: Anyone\"."
            }
            ConnectionOutcome::NetworkFailure => {
                "Could not send test data. Check the webhook URL and your network connection."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub outcome: ConnectionOutcome,
    pub message: String,
}

impl From<ConnectionOutcome> for ConnectionReport {
    fn from(outcome: ConnectionOutcome) -> Self {
        Self {
            outcome,
            message: outcome.message().to_string(),
        }
    }
}

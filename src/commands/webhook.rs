use crate::commands::db::{get_db_connection, get_item, remove_item, set_item};
use crate::commands::settings::load_effective_settings;
use crate::error::{BugError, BugResult};
use crate::models::bug::{iso_millis, BugRecord, Severity, Status};
use crate::models::webhook::{
    ConnectionOutcome, ConnectionReport, WebhookConfig, WebhookPayload, WebhookStatus,
};
use reqwest::StatusCode;
use rusqlite::Connection;
use std::time::Duration;

pub const WEBHOOK_CONFIG_KEY: &str = "google-sheets-config";

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn get_webhook_status(data_dir: String) -> Result<WebhookStatus, String> {
    let conn = get_db_connection(&data_dir)?;
    Ok(webhook_status(&conn)?)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn save_webhook_config(data_dir: String, webhook_url: String) -> Result<WebhookStatus, String> {
    let conn = get_db_connection(&data_dir)?;
    set_config(&conn, &webhook_url)?;
    Ok(webhook_status(&conn)?)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn disconnect_webhook(data_dir: String) -> Result<WebhookStatus, String> {
    let conn = get_db_connection(&data_dir)?;
    clear_config(&conn)?;
    Ok(webhook_status(&conn)?)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn test_webhook_connection(data_dir: String, webhook_url: String) -> Result<ConnectionReport, String> {
    let settings = load_effective_settings(&data_dir);
    let client = build_client(settings.webhook_timeout)?;
    let outcome = test_connection(&client, &webhook_url).await?;
    Ok(ConnectionReport::from(outcome))
}

pub fn get_config(conn: &Connection) -> BugResult<Option<WebhookConfig>> {
    let Some(raw) = get_item(conn, WEBHOOK_CONFIG_KEY)? else {
        return Ok(None);
    };

    match decode_config(&raw) {
        Ok(config) => Ok(Some(config)),
        Err(err) => {
            log::warn!("Ignoring unreadable webhook config: {err}");
            Ok(None)
        }
    }
}

/// Only an empty URL is refused; anything else is saved as entered.
pub fn set_config(conn: &Connection, url: &str) -> BugResult<WebhookConfig> {
    if url.is_empty() {
        return Err(BugError::Validation("Webhook URL is required".to_string()));
    }

    let config = WebhookConfig {
        webhook_url: url.to_string(),
    };
    let raw = serde_json::to_string(&config)
        .map_err(|e| BugError::Serialize(format!("Failed to serialize webhook config: {e}")))?;
    set_item(conn, WEBHOOK_CONFIG_KEY, &raw)?;
    log::info!("Webhook mirroring enabled");
    Ok(config)
}

pub fn clear_config(conn: &Connection) -> BugResult<()> {
    remove_item(conn, WEBHOOK_CONFIG_KEY)?;
    log::info!("Webhook mirroring disabled");
    Ok(())
}

/// A saved URL counts as connected whether or not it was ever tested.
pub fn webhook_status(conn: &Connection) -> BugResult<WebhookStatus> {
    let config = get_config(conn)?;
    Ok(WebhookStatus {
        connected: config.is_some(),
        webhook_url: config.map(|c| c.webhook_url),
    })
}

pub fn build_client(timeout: Duration) -> BugResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BugError::Transport(format!("Failed to create client: {e}")))
}

pub fn payload_for(record: &BugRecord) -> WebhookPayload {
    WebhookPayload {
        timestamp: iso_millis::format(&record.created_at),
        title: record.title.clone(),
        description: record.description.clone(),
        severity: record.severity.as_str().to_string(),
        status: record.status.as_str().to_string(),
        url: record.url.clone(),
        browser: record.browser.clone(),
        steps: record.steps.clone(),
    }
}

fn test_payload() -> WebhookPayload {
    WebhookPayload {
        timestamp: iso_millis::format(&chrono::Utc::now()),
        title: "Connection test".to_string(),
        description: "This is test data from Bug Reporter".to_string(),
        severity: Severity::Medium.as_str().to_string(),
        status: Status::Open.as_str().to_string(),
        url: Some("https://example.com".to_string()),
        browser: Some("Chrome Test".to_string()),
        steps: Some(
            "1. Open the system\n2. Test the connection\n3. Check Google Sheets".to_string(),
        ),
    }
}

async fn send_payload(
    client: &reqwest::Client,
    url: &str,
    payload: &WebhookPayload,
) -> BugResult<StatusCode> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| BugError::Transport(format!("Request to webhook failed: {e}")))?;
    Ok(response.status())
}

pub async fn test_connection(client: &reqwest::Client, url: &str) -> BugResult<ConnectionOutcome> {
    if url.is_empty() {
        return Err(BugError::Validation(
            "Webhook URL is required before testing".to_string(),
        ));
    }

    let outcome = match send_payload(client, url, &test_payload()).await {
        Ok(StatusCode::UNAUTHORIZED) => ConnectionOutcome::AuthorizationRejected,
        Ok(_) => ConnectionOutcome::LikelySuccess,
        Err(err) => {
            log::warn!("Webhook test failed: {err}");
            ConnectionOutcome::NetworkFailure
        }
    };

    log::info!("Webhook test finished: {outcome:?}");
    Ok(outcome)
}

/// Best-effort forward of a new record. Failures are logged and dropped.
pub async fn mirror(client: &reqwest::Client, config: Option<&WebhookConfig>, record: &BugRecord) {
    let Some(config) = config else {
        return;
    };

    match send_payload(client, &config.webhook_url, &payload_for(record)).await {
        Ok(status) if status.is_success() || status.is_redirection() => {
            log::info!("Bug sent to webhook: {}", record.title);
        }
        Ok(status) => {
            log::warn!("Webhook answered {status} for bug {}", record.id);
        }
        Err(err) => {
            log::warn!("Failed to mirror bug {}: {err}", record.id);
        }
    }
}

fn decode_config(raw: &str) -> BugResult<WebhookConfig> {
    let config = serde_json::from_str::<WebhookConfig>(raw)
        .map_err(|e| BugError::StorageCorrupt(format!("{WEBHOOK_CONFIG_KEY}: {e}")))?;
    if config.webhook_url.is_empty() {
        return Err(BugError::StorageCorrupt(format!(
            "{WEBHOOK_CONFIG_KEY}: empty webhookUrl"
        )));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::db::initialize_schema;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema init");
        conn
    }

    fn client() -> reqwest::Client {
        build_client(Duration::from_secs(5)).expect("client")
    }

    fn sample_record() -> BugRecord {
        BugRecord {
            id: "bug-1".to_string(),
            title: "Login button unresponsive".to_string(),
            description: "Clicking Login does nothing".to_string(),
            severity: Severity::Critical,
            status: Status::Open,
            url: Some("https://example.com/login".to_string()),
            browser: None,
            steps: Some("1. Open login\n2. Click Login".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_url_is_rejected_and_config_stays_absent() {
        let conn = test_conn();
        let err = set_config(&conn, "").expect_err("empty url");
        assert!(matches!(err, BugError::Validation(_)));
        assert_eq!(get_config(&conn).expect("read"), None);
        assert!(!webhook_status(&conn).expect("status").connected);
    }

    #[test]
    fn whitespace_url_is_saved_as_entered_like_any_non_empty_url() {
        let conn = test_conn();
        set_config(&conn, " ").expect("non-empty url is accepted");
        let status = webhook_status(&conn).expect("status");
        assert!(status.connected);
        assert_eq!(status.webhook_url.as_deref(), Some(" "));
    }

    #[test]
    fn status_tracks_saved_config() {
        let conn = test_conn();
        set_config(&conn, "https://script.google.com/macros/s/abc/exec").expect("save");

        let status = webhook_status(&conn).expect("status");
        assert!(status.connected);
        assert_eq!(
            status.webhook_url.as_deref(),
            Some("https://script.google.com/macros/s/abc/exec")
        );
        assert_eq!(
            get_item(&conn, WEBHOOK_CONFIG_KEY).expect("raw"),
            Some(r#"{"webhookUrl":"https://script.google.com/macros/s/abc/exec"}"#.to_string())
        );

        clear_config(&conn).expect("clear");
        clear_config(&conn).expect("clear again");
        assert!(!webhook_status(&conn).expect("status").connected);
    }

    #[test]
    fn mismatched_config_reads_as_absent() {
        let conn = test_conn();
        set_item(&conn, WEBHOOK_CONFIG_KEY, r#"{"url":"https://x"}"#).expect("write");
        assert_eq!(get_config(&conn).expect("read"), None);

        set_item(&conn, WEBHOOK_CONFIG_KEY, "garbage").expect("write");
        assert!(!webhook_status(&conn).expect("status").connected);
    }

    #[test]
    fn payload_uses_the_fixed_field_set() {
        let value = serde_json::to_value(payload_for(&sample_record())).expect("serialize");
        assert_eq!(
            value,
            json!({
                "timestamp": "2024-05-01T10:00:00.000Z",
                "title": "Login button unresponsive",
                "description": "Clicking Login does nothing",
                "severity": "Critical",
                "status": "Open",
                "url": "https://example.com/login",
                "steps": "1. Open login\n2. Click Login"
            })
        );
    }

    #[tokio::test]
    async fn unauthorized_response_is_reported_as_authorization_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/exec")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let outcome = test_connection(&client(), &format!("{}/exec", server.url()))
            .await
            .expect("test connection");
        assert_eq!(outcome, ConnectionOutcome::AuthorizationRejected);
    }

    #[tokio::test]
    async fn test_connection_sends_synthetic_payload() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/exec")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "title": "Connection test",
                "severity": "Medium",
                "status": "Open",
                "browser": "Chrome Test"
            })))
            .with_status(200)
            .with_body(r#"{"result":"success"}"#)
            .expect(1)
            .create_async()
            .await;

        let outcome = test_connection(&client(), &format!("{}/exec", server.url()))
            .await
            .expect("test connection");
        assert_eq!(outcome, ConnectionOutcome::LikelySuccess);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn non_auth_error_status_still_counts_as_likely_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("POST", "/exec").with_status(500).create_async().await;

        let outcome = test_connection(&client(), &format!("{}/exec", server.url()))
            .await
            .expect("test connection");
        assert_eq!(outcome, ConnectionOutcome::LikelySuccess);
    }

    #[tokio::test]
    async fn unreachable_or_malformed_url_is_a_network_failure() {
        let outcome = test_connection(&client(), "http://127.0.0.1:1/exec")
            .await
            .expect("test connection");
        assert_eq!(outcome, ConnectionOutcome::NetworkFailure);

        let outcome = test_connection(&client(), "not a url")
            .await
            .expect("test connection");
        assert_eq!(outcome, ConnectionOutcome::NetworkFailure);
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_sending() {
        let err = test_connection(&client(), "").await.expect_err("empty url");
        assert!(matches!(err, BugError::Validation(_)));
    }

    #[tokio::test]
    async fn mirror_posts_record_payload() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/exec")
            .match_body(Matcher::Json(
                serde_json::to_value(payload_for(&sample_record())).expect("payload"),
            ))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let config = WebhookConfig {
            webhook_url: format!("{}/exec", server.url()),
        };
        mirror(&client(), Some(&config), &sample_record()).await;
        m.assert_async().await;
    }

    #[tokio::test]
    async fn mirror_swallows_transport_errors_and_skips_without_config() {
        let config = WebhookConfig {
            webhook_url: "http://127.0.0.1:1/exec".to_string(),
        };
        mirror(&client(), Some(&config), &sample_record()).await;
        mirror(&client(), None, &sample_record()).await;
    }
}

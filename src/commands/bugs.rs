use crate::analysis::filter::filter_bugs;
use crate::analysis::summary::summarize;
use crate::commands::db::get_db_connection;
use crate::commands::settings::{load_effective_settings, EffectiveSettings};
use crate::commands::{store, webhook};
use crate::error::{BugError, BugResult};
use crate::models::bug::{BugDraft, BugFilter, BugRecord, BugSummary, Severity, Status};
use chrono::SubsecRound;
use tokio::task::JoinHandle;

/// Result of a report: the stored record plus the detached mirror task, if one was started.
pub struct ReportReceipt {
    pub bug: BugRecord,
    pub mirror: Option<JoinHandle<()>>,
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn report_bug(data_dir: String, draft: BugDraft) -> Result<BugRecord, String> {
    let receipt = report_bug_internal(&data_dir, draft).await?;
    Ok(receipt.bug)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn edit_bug(data_dir: String, id: String, draft: BugDraft) -> Result<Vec<BugRecord>, String> {
    Ok(edit_bug_internal(&data_dir, &id, draft)?)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn delete_bug(data_dir: String, id: String) -> Result<Vec<BugRecord>, String> {
    let conn = get_db_connection(&data_dir)?;
    let remaining = store::remove(&conn, &id)?;
    log::info!("Deleted bug {id}");
    Ok(remaining)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn list_bugs(data_dir: String, filter: Option<BugFilter>) -> Result<Vec<BugRecord>, String> {
    let conn = get_db_connection(&data_dir)?;
    let bugs = store::load_all(&conn)?;
    Ok(filter_bugs(&bugs, &filter.unwrap_or_default()))
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn get_dashboard(data_dir: String) -> Result<BugSummary, String> {
    let conn = get_db_connection(&data_dir)?;
    let bugs = store::load_all(&conn)?;
    Ok(summarize(&bugs))
}

/// Stores the new bug, then hands it to the webhook mirror on a detached task.
/// The stored record never depends on the mirror's outcome.
pub async fn report_bug_internal(data_dir: &str, draft: BugDraft) -> BugResult<ReportReceipt> {
    let settings = load_effective_settings(data_dir);
    let bug = new_record(draft, &settings)?;

    let conn = get_db_connection(data_dir)?;
    store::append(&conn, bug.clone())?;
    log::info!("Reported bug {} ({})", bug.id, bug.title);

    // The bug is already stored; nothing below may turn the report into an error.
    let config = webhook::get_config(&conn).unwrap_or_else(|err| {
        log::warn!("Skipping webhook mirror: {err}");
        None
    });
    let mirror = config.and_then(|config| match webhook::build_client(settings.webhook_timeout) {
        Ok(client) => {
            let record = bug.clone();
            Some(tokio::spawn(async move {
                webhook::mirror(&client, Some(&config), &record).await;
            }))
        }
        Err(err) => {
            log::warn!("Skipping webhook mirror: {err}");
            None
        }
    });

    Ok(ReportReceipt { bug, mirror })
}

pub fn edit_bug_internal(data_dir: &str, id: &str, draft: BugDraft) -> BugResult<Vec<BugRecord>> {
    validate_draft(&draft)?;

    let conn = get_db_connection(data_dir)?;
    let bugs = store::load_all(&conn)?;
    let Some(existing) = bugs.iter().find(|bug| bug.id == id) else {
        log::debug!("edit: bug {id} no longer exists");
        return Ok(bugs);
    };

    let updated = apply_draft(draft, existing.severity, existing.status, existing);
    store::replace(&conn, id, updated)
}

fn new_record(draft: BugDraft, settings: &EffectiveSettings) -> BugResult<BugRecord> {
    validate_draft(&draft)?;
    let stub = BugRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: String::new(),
        description: String::new(),
        severity: settings.default_severity,
        status: settings.default_status,
        url: None,
        browser: None,
        steps: None,
        // Stored timestamps carry millisecond precision.
        created_at: chrono::Utc::now().trunc_subsecs(3),
    };
    Ok(apply_draft(draft, settings.default_severity, settings.default_status, &stub))
}

fn apply_draft(
    draft: BugDraft,
    fallback_severity: Severity,
    fallback_status: Status,
    base: &BugRecord,
) -> BugRecord {
    BugRecord {
        id: base.id.clone(),
        title: draft.title,
        description: draft.description,
        severity: draft.severity.unwrap_or(fallback_severity),
        status: draft.status.unwrap_or(fallback_status),
        url: non_blank(draft.url),
        browser: non_blank(draft.browser),
        steps: non_blank(draft.steps),
        created_at: base.created_at,
    }
}

/// Only empty text is refused; titles and descriptions are stored as entered.
fn validate_draft(draft: &BugDraft) -> BugResult<()> {
    if draft.title.is_empty() || draft.description.is_empty() {
        return Err(BugError::Validation(
            "Bug title and description are required".to_string(),
        ));
    }
    Ok(())
}

/// An empty optional field is stored as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

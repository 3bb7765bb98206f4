use crate::commands::db::ensure_data_dir;
use crate::models::bug::{Severity, Status};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 1;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub webhook_timeout: Duration,
    pub default_severity: Severity,
    pub default_status: Status,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            webhook_timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            default_severity: Severity::Medium,
            default_status: Status::Open,
        }
    }
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn get_settings(data_dir: String) -> Result<Value, String> {
    load_settings_from_disk(&data_dir)
}

#[cfg_attr(feature = "desktop", tauri::command)]
pub async fn save_settings(data_dir: String, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&data_dir, settings)
}

/// Typed view of the settings document. Falls back to defaults when the file
/// cannot be read so that reporting bugs never depends on it.
pub fn load_effective_settings(data_dir: &str) -> EffectiveSettings {
    let settings = match load_settings_from_disk(data_dir) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Using default settings: {err}");
            return EffectiveSettings::default();
        }
    };

    let defaults = EffectiveSettings::default();
    let timeout_secs = settings
        .get("webhookTimeoutSecs")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS)
        .clamp(1, 120);

    EffectiveSettings {
        webhook_timeout: Duration::from_secs(timeout_secs),
        default_severity: settings
            .get("defaultSeverity")
            .and_then(Value::as_str)
            .and_then(Severity::parse)
            .unwrap_or(defaults.default_severity),
        default_status: settings
            .get("defaultStatus")
            .and_then(Value::as_str)
            .and_then(Status::parse)
            .unwrap_or(defaults.default_status),
    }
}

pub fn load_settings_from_disk(data_dir: &str) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| json!({}))
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!("Saved settings to {}", path.display());
    Ok(migrated)
}

fn settings_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("settings.json")
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "webhookTimeoutSecs": DEFAULT_WEBHOOK_TIMEOUT_SECS,
        "defaultSeverity": Severity::Medium.as_str(),
        "defaultStatus": Status::Open.as_str()
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "webhookTimeoutSecs", 1, 120, DEFAULT_WEBHOOK_TIMEOUT_SECS);

    let severities = Severity::ALL.map(|s| s.as_str());
    let statuses = Status::ALL.map(|s| s.as_str());
    sanitize_enum(obj, "defaultSeverity", &severities, Severity::Medium.as_str());
    sanitize_enum(obj, "defaultStatus", &statuses, Status::Open.as_str());
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}

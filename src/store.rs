//! SQLite-backed key-value store for the profile, settings, usage stats and
//! detection summaries.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::form::Field;
use crate::settings::Settings;

pub const DB_PATH: &str = "data/autofill.sqlite";

const PROFILE_KEY: &str = "userProfile";
const SETTINGS_KEY: &str = "settings";
const STATS_KEY: &str = "usageStats";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS detections (
            id          INTEGER PRIMARY KEY,
            url         TEXT NOT NULL,
            field_count INTEGER NOT NULL,
            fields      TEXT NOT NULL,
            detected_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_detections_url ON detections(url);
        ",
    )?;
    Ok(())
}

// ── Key-value ──

pub fn get_json(conn: &Connection, key: &str) -> Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    raw.map(|s| serde_json::from_str(&s).with_context(|| format!("Corrupt JSON under {}", key)))
        .transpose()
}

pub fn set_json(conn: &Connection, key: &str, value: &Value) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

// ── Profile ──

pub fn load_profile(conn: &Connection) -> Result<Option<Value>> {
    get_json(conn, PROFILE_KEY)
}

pub fn save_profile(conn: &Connection, profile: &Value) -> Result<()> {
    set_json(conn, PROFILE_KEY, profile)
}

/// Merge extracted form data into the stored profile and save the result.
pub fn merge_into_profile(conn: &Connection, extracted: &Value) -> Result<Value> {
    let existing = load_profile(conn)?.unwrap_or_else(|| Value::Object(Map::new()));
    let merged = merge_profiles(&existing, extracted);
    save_profile(conn, &merged)?;
    Ok(merged)
}

/// Top-level objects are merged one level deep; everything else is replaced.
pub fn merge_profiles(existing: &Value, incoming: &Value) -> Value {
    let mut merged = existing.as_object().cloned().unwrap_or_default();
    let Some(incoming) = incoming.as_object() else {
        return Value::Object(merged);
    };

    for (key, value) in incoming {
        match (merged.get_mut(key), value) {
            (Some(Value::Object(current)), Value::Object(section)) => {
                for (k, v) in section {
                    current.insert(k.clone(), v.clone());
                }
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

// ── Settings ──

pub fn load_settings(conn: &Connection) -> Result<Settings> {
    match get_json(conn, SETTINGS_KEY)? {
        Some(v) => serde_json::from_value(v)
            .context("Stored settings do not match the settings schema"),
        None => Ok(Settings::default()),
    }
}

pub fn save_settings(conn: &Connection, settings: &Settings) -> Result<()> {
    set_json(conn, SETTINGS_KEY, &serde_json::to_value(settings)?)
}

// ── Usage stats ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub forms_filled: u64,
    pub fields_detected: u64,
    pub data_saved: u64,
    pub sessions_started: u64,
    pub last_used: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum Stat {
    FormsFilled,
    FieldsDetected,
    DataSaved,
    SessionsStarted,
}

pub fn load_stats(conn: &Connection) -> Result<UsageStats> {
    match get_json(conn, STATS_KEY)? {
        Some(v) => serde_json::from_value(v)
            .context("Stored usage stats do not match the stats schema"),
        None => Ok(UsageStats::default()),
    }
}

pub fn bump_stat(conn: &Connection, stat: Stat, by: u64) -> Result<UsageStats> {
    let mut stats = load_stats(conn)?;
    let counter = match stat {
        Stat::FormsFilled => &mut stats.forms_filled,
        Stat::FieldsDetected => &mut stats.fields_detected,
        Stat::DataSaved => &mut stats.data_saved,
        Stat::SessionsStarted => &mut stats.sessions_started,
    };
    *counter += by;
    stats.last_used = Some(Utc::now().to_rfc3339());
    set_json(conn, STATS_KEY, &serde_json::to_value(&stats)?)?;
    Ok(stats)
}

// ── Detection summaries ──

#[derive(Debug, Clone, Serialize)]
pub struct DetectionRow {
    pub url: String,
    pub field_count: usize,
    pub fields: Value,
    pub detected_at: String,
}

pub fn save_detection(conn: &Connection, url: &str, fields: &[Field]) -> Result<()> {
    conn.execute(
        "INSERT INTO detections (url, field_count, fields, detected_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            url,
            fields.len() as i64,
            serde_json::to_string(fields)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn recent_detections(conn: &Connection, limit: usize) -> Result<Vec<DetectionRow>> {
    let mut stmt = conn.prepare(
        "SELECT url, field_count, fields, detected_at FROM detections
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            let fields: String = row.get(2)?;
            let count: i64 = row.get(1)?;
            Ok(DetectionRow {
                url: row.get(0)?,
                field_count: count as usize,
                fields: serde_json::from_str(&fields).unwrap_or(Value::Null),
                detected_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Export / import ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub stats: Option<UsageStats>,
    #[serde(default)]
    pub export_date: Option<String>,
}

pub fn export_all(conn: &Connection) -> Result<ExportBundle> {
    Ok(ExportBundle {
        profile: load_profile(conn)?,
        settings: Some(load_settings(conn)?),
        stats: Some(load_stats(conn)?),
        export_date: Some(Utc::now().to_rfc3339()),
    })
}

/// Write whichever parts of the bundle are present.
pub fn import_all(conn: &Connection, bundle: &ExportBundle) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    if let Some(profile) = &bundle.profile {
        save_profile(&tx, profile)?;
    }
    if let Some(settings) = &bundle.settings {
        save_settings(&tx, settings)?;
    }
    if let Some(stats) = &bundle.stats {
        set_json(&tx, STATS_KEY, &serde_json::to_value(stats)?)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM kv; DELETE FROM detections;")?;
    info!("All stored data cleared");
    Ok(())
}

// ── Tests ──

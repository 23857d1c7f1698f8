//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If `~/.relay/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `RELAY_*` environment overrides
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Resolve the path to the settings file (`~/.relay/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".relay").join("settings.json")
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving env overrides through `env`.
pub fn load_with_env<F>(path: &Path, env: F) -> Result<RelaySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `RELAY_*` overrides.
///
/// Numbers must parse and fall within range; invalid values are logged and
/// ignored.
pub fn apply_env_overrides<F>(settings: &mut RelaySettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| env(name).filter(|v| !v.is_empty());
    let ranged_u64 = |name: &str, min: u64, max: u64| {
        let val = env(name)?;
        let parsed = parse_u64_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        parsed
    };

    // ── Application ─────────────────────────────────────────────────
    if let Some(v) = string("RELAY_APP_NAME") {
        settings.app_name = v;
    }
    if let Some(v) = string("RELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env("RELAY_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn!(key = "RELAY_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }

    // ── Execution ───────────────────────────────────────────────────
    if let Some(v) = ranged_u64("RELAY_EXECUTION_TIMEOUT_MS", 1_000, 86_400_000) {
        settings.execution.timeout_ms = v;
    }
    if let Some(v) = ranged_u64("RELAY_SESSION_APPEND_TIMEOUT_MS", 100, 600_000) {
        settings.execution.session_append_timeout_ms = v;
    }
    if let Some(v) = ranged_u64("RELAY_EVENT_QUEUE_CAPACITY", 1, 65_536) {
        settings.execution.event_queue_capacity = usize::try_from(v).unwrap_or(usize::MAX);
    }

    // ── LLM backend ─────────────────────────────────────────────────
    if let Some(v) = string("RELAY_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = string("RELAY_LLM_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = string("RELAY_LLM_API_KEY_ENV") {
        settings.llm.api_key_env = v;
    }
    if let Some(v) = ranged_u64("RELAY_LLM_REQUEST_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.llm.request_timeout_ms = v;
    }
}

/// Reject values the runtime cannot operate with.
pub fn validate(settings: &RelaySettings) -> Result<()> {
    let exec = &settings.execution;
    if exec.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "execution.timeoutMs must be greater than 0".into(),
        ));
    }
    if exec.session_append_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "execution.sessionAppendTimeoutMs must be greater than 0".into(),
        ));
    }
    if exec.event_queue_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "execution.eventQueueCapacity must be greater than 0".into(),
        ));
    }
    if exec.session_name_max_chars == 0 {
        return Err(SettingsError::InvalidValue(
            "execution.sessionNameMaxChars must be greater than 0".into(),
        ));
    }
    if let Some(t) = settings.llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(SettingsError::InvalidValue(format!(
                "llm.temperature must be within 0.0..=2.0, got {t}"
            )));
        }
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

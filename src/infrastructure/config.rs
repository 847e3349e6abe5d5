use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const DEFAULT_TIMEZONE: &str = "Europe/Vienna";
const DEFAULT_SHIFT_STEP_MINUTES: u32 = 30;
const MAX_SHIFT_STEP_MINUTES: u64 = 24 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([(
        APP_JSON,
        serde_json::json!({
            "schema": 1,
            "appName": "Salzburg Trip Planner",
            "timezone": DEFAULT_TIMEZONE,
            "locale": "de",
            "shiftStepMinutes": DEFAULT_SHIFT_STEP_MINUTES
        }),
    )])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
    })
}

fn read_app_string(config_dir: &Path, key: &str) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    read_app_string(config_dir, "timezone")
}

pub fn read_locale(config_dir: &Path) -> Result<Option<String>, InfraError> {
    read_app_string(config_dir, "locale")
}

pub fn read_shift_step_minutes(config_dir: &Path) -> Result<u32, InfraError> {
    let path = config_dir.join(APP_JSON);
    let app = read_config(&path)?;
    let Some(raw) = app.get("shiftStepMinutes") else {
        return Ok(DEFAULT_SHIFT_STEP_MINUTES);
    };
    let step = raw
        .as_u64()
        .filter(|value| (1..=MAX_SHIFT_STEP_MINUTES).contains(value))
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "shiftStepMinutes must be within 1..={MAX_SHIFT_STEP_MINUTES} in {}",
                path.display()
            ))
        })?;
    u32::try_from(step).map_err(|error| InfraError::InvalidConfig(error.to_string()))
}

/// Falls back to Salzburg's zone when nothing is configured.
pub fn resolve_timezone(configured: Option<&str>) -> Result<Tz, InfraError> {
    configured
        .unwrap_or(DEFAULT_TIMEZONE)
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_CONFIG_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_CONFIG_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "trip-timeline-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_and_readable() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let bundle = load_configs(&dir.path).expect("load configs");
        assert_eq!(bundle.app["appName"], "Salzburg Trip Planner");
        assert_eq!(bundle.app["shiftStepMinutes"], 30);
        assert_eq!(
            read_timezone(&dir.path).expect("timezone"),
            Some("Europe/Vienna".to_string())
        );
        assert_eq!(read_locale(&dir.path).expect("locale"), Some("de".to_string()));
        assert_eq!(read_shift_step_minutes(&dir.path).expect("step"), 30);
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema": 1, "locale": "en", "shiftStepMinutes": 15}"#,
        )
        .expect("write app config");
        ensure_default_configs(&dir.path).expect("write defaults");
        assert_eq!(read_shift_step_minutes(&dir.path).expect("step"), 15);
        assert_eq!(read_locale(&dir.path).expect("locale"), Some("en".to_string()));
    }

    #[test]
    fn missing_step_falls_back_to_default() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), r#"{"schema": 1}"#).expect("write app config");
        assert_eq!(
            read_shift_step_minutes(&dir.path).expect("step"),
            DEFAULT_SHIFT_STEP_MINUTES
        );
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(dir.path.join(APP_JSON), r#"{"schema": 2}"#).expect("write app config");
        match load_configs(&dir.path) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("schema 2")),
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_step_is_rejected() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema": 1, "shiftStepMinutes": 0}"#,
        )
        .expect("write app config");
        assert!(read_shift_step_minutes(&dir.path).is_err());
    }

    #[test]
    fn timezone_resolution_defaults_and_validates() {
        assert_eq!(resolve_timezone(None).expect("default zone"), chrono_tz::Europe::Vienna);
        assert_eq!(resolve_timezone(Some("UTC")).expect("utc"), chrono_tz::UTC);
        assert!(resolve_timezone(Some("Mars/Olympus")).is_err());
    }
}

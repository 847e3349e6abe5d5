use crate::application::bootstrap::bootstrap_workspace;
use crate::application::messages::{
    Locale, format_day_label, format_duration, format_time, render_open_state, render_rejection,
};
use crate::domain::models::Visit;
use crate::domain::opening_hours::{OpenState, open_state_at};
use crate::domain::reflow::{ReflowEngine, ShiftStatus, chronological_order};
use crate::domain::timeline::group_by_day;
use crate::infrastructure::config::{
    read_locale, read_shift_step_minutes, read_timezone, resolve_timezone,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// A shift of more than one day can never stay on the visit's day.
const MAX_SHIFT_MINUTES: u64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripSettings {
    pub timezone: Tz,
    pub locale: Locale,
    pub shift_step_minutes: u32,
}

impl TripSettings {
    pub fn load(config_dir: &Path) -> Result<Self, InfraError> {
        let timezone = resolve_timezone(read_timezone(config_dir)?.as_deref())?;
        let locale = match read_locale(config_dir)? {
            Some(raw) => Locale::parse(&raw).ok_or_else(|| {
                InfraError::InvalidConfig(format!("unsupported locale: {raw}"))
            })?,
            None => Locale::default(),
        };
        Ok(Self {
            timezone,
            locale,
            shift_step_minutes: read_shift_step_minutes(config_dir)?,
        })
    }
}

/// Session state of one trip. Visits live here for the lifetime of the
/// session only; shift commands are serialized through the runtime lock.
pub struct TripState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    settings: TripSettings,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl TripState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let settings = TripSettings::load(&bootstrap.config_dir)?;

        Ok(Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            settings,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings(&self) -> TripSettings {
        self.settings
    }

    fn engine(&self) -> ReflowEngine {
        ReflowEngine::new(self.settings.timezone)
    }

    pub fn command_error(&self, command: &str, error: InfraError) -> InfraError {
        self.log_error(command, &error.to_string());
        error
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    visits: Vec<Visit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayGroupResponse {
    pub date: String,
    pub label: String,
    pub visits: Vec<TimelineVisitResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineVisitResponse {
    pub id: String,
    pub experience_key: String,
    pub name: String,
    pub start_label: String,
    pub duration_label: String,
    /// Whether the visit's local month lies in the experience's season.
    pub in_season: bool,
    pub visit: Visit,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenStateResponse {
    pub state: OpenState,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShiftVisitResponse {
    pub status: String,
    pub shifted_visit_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_visit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub visits: Vec<Visit>,
}

pub fn set_visits_impl(state: &TripState, visits: Vec<Visit>) -> Result<usize, InfraError> {
    validate_visits(&visits).map_err(|error| state.command_error("set_visits", error))?;
    let count = visits.len();
    {
        let mut runtime = lock_runtime(state)?;
        runtime.visits = visits;
    }

    state.log_info("set_visits", &format!("loaded {count} visits"));
    Ok(count)
}

pub fn import_visits_json_impl(state: &TripState, payload: &str) -> Result<usize, InfraError> {
    let visits: Vec<Visit> = serde_json::from_str(payload)?;
    set_visits_impl(state, visits)
}

pub fn add_visit_impl(state: &TripState, visit: Visit) -> Result<Visit, InfraError> {
    visit.validate().map_err(InfraError::InvalidVisit)?;

    let mut runtime = lock_runtime(state)?;
    if runtime.visits.iter().any(|existing| existing.id == visit.id) {
        return Err(InfraError::InvalidVisit(format!(
            "duplicate visit id: {}",
            visit.id
        )));
    }
    runtime.visits.push(visit.clone());
    drop(runtime);

    state.log_info("add_visit", &format!("added visit_id={}", visit.id));
    Ok(visit)
}

pub fn remove_visit_impl(state: &TripState, visit_id: String) -> Result<bool, InfraError> {
    let visit_id = required_id(&visit_id)?;

    let mut runtime = lock_runtime(state)?;
    let before = runtime.visits.len();
    runtime.visits.retain(|visit| visit.id != visit_id);
    if runtime.visits.len() == before {
        return Ok(false);
    }
    drop(runtime);

    state.log_info("remove_visit", &format!("removed visit_id={visit_id}"));
    Ok(true)
}

pub fn clear_visits_impl(state: &TripState) -> Result<(), InfraError> {
    lock_runtime(state)?.visits.clear();
    state.log_info("clear_visits", "cleared all visits");
    Ok(())
}

pub fn list_visits_impl(state: &TripState) -> Result<Vec<Visit>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(chronological_order(&runtime.visits)
        .into_iter()
        .map(|index| runtime.visits[index].clone())
        .collect())
}

pub fn list_days_impl(state: &TripState) -> Result<Vec<DayGroupResponse>, InfraError> {
    let settings = state.settings();
    let runtime = lock_runtime(state)?;
    Ok(group_by_day(&runtime.visits, settings.timezone)
        .into_iter()
        .map(|group| DayGroupResponse {
            date: group.date.to_string(),
            label: format_day_label(group.date, settings.locale),
            visits: group
                .visits
                .into_iter()
                .map(|visit| TimelineVisitResponse {
                    id: visit.id.clone(),
                    experience_key: visit.experience.key.clone(),
                    name: visit.experience.name.clone(),
                    start_label: format_time(visit.start, settings.timezone),
                    duration_label: format_duration(visit.end - visit.start),
                    in_season: visit
                        .experience
                        .is_in_season(visit.start.with_timezone(&settings.timezone).month()),
                    visit,
                })
                .collect(),
        })
        .collect())
}

pub fn shift_visit_impl(
    state: &TripState,
    visit_id: String,
    delta_minutes: i64,
) -> Result<ShiftVisitResponse, InfraError> {
    let visit_id = required_id(&visit_id)?;
    let delta = Some(delta_minutes)
        .filter(|minutes| minutes.unsigned_abs() <= MAX_SHIFT_MINUTES)
        .and_then(Duration::try_minutes)
        .ok_or_else(|| {
            state.command_error(
                "shift_visit",
                InfraError::InvalidInput(format!(
                    "delta_minutes must be within ±{MAX_SHIFT_MINUTES}: {delta_minutes}"
                )),
            )
        })?;

    let mut runtime = lock_runtime(state)?;
    let outcome = state.engine().shift(&runtime.visits, visit_id, delta);
    runtime.visits = outcome.visits.clone();
    drop(runtime);

    let locale = state.settings().locale;
    let status = match &outcome.status {
        ShiftStatus::Unchanged => "unchanged",
        ShiftStatus::Applied { .. } => "applied",
        ShiftStatus::Rejected(_) => "rejected",
        ShiftStatus::CascadeBlocked { .. } => "cascade_blocked",
    };
    let rejection = outcome.rejection();
    let message = rejection.map(|rejection| render_rejection(rejection, locale));

    match rejection {
        Some(rejection) => state.log_info(
            "shift_visit",
            &format!(
                "visit_id={visit_id} delta_minutes={delta_minutes} status={status} blocked_by={} reason={}",
                rejection.visit_id, rejection.reason
            ),
        ),
        None => state.log_info(
            "shift_visit",
            &format!(
                "visit_id={visit_id} delta_minutes={delta_minutes} status={status} shifted={}",
                outcome.shifted_ids().len()
            ),
        ),
    }

    Ok(ShiftVisitResponse {
        status: status.to_string(),
        shifted_visit_ids: outcome.shifted_ids().to_vec(),
        rejected_visit_id: rejection.map(|rejection| rejection.visit_id.clone()),
        rejection_code: rejection.map(|rejection| rejection.reason.code().to_string()),
        message,
        visits: outcome.visits,
    })
}

pub fn increment_visit_impl(
    state: &TripState,
    visit_id: String,
) -> Result<ShiftVisitResponse, InfraError> {
    let step = i64::from(state.settings().shift_step_minutes);
    shift_visit_impl(state, visit_id, step)
}

pub fn decrement_visit_impl(
    state: &TripState,
    visit_id: String,
) -> Result<ShiftVisitResponse, InfraError> {
    let step = i64::from(state.settings().shift_step_minutes);
    shift_visit_impl(state, visit_id, -step)
}

pub fn open_state_impl(
    state: &TripState,
    visit_id: String,
    now: Option<String>,
) -> Result<OpenStateResponse, InfraError> {
    let visit_id = required_id(&visit_id)?;
    let now = match now {
        Some(raw) => parse_rfc3339_input(&raw, "now")
            .map_err(|error| state.command_error("open_state", error))?,
        None => Utc::now(),
    };

    let settings = state.settings();
    let runtime = lock_runtime(state)?;
    let Some(visit) = runtime.visits.iter().find(|visit| visit.id == visit_id) else {
        return Err(InfraError::InvalidVisit(format!("visit not found: {visit_id}")));
    };
    let open_state = open_state_at(visit.effective_opening_hours(), now, settings.timezone);
    Ok(OpenStateResponse {
        label: render_open_state(&open_state, settings.locale),
        state: open_state,
    })
}

fn lock_runtime(state: &TripState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn required_id(value: &str) -> Result<&str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidVisit(
            "visit_id must not be empty".to_string(),
        ));
    }
    Ok(value)
}

fn validate_visits(visits: &[Visit]) -> Result<(), InfraError> {
    let mut seen = HashSet::new();
    for visit in visits {
        visit.validate().map_err(InfraError::InvalidVisit)?;
        if !seen.insert(visit.id.as_str()) {
            return Err(InfraError::InvalidVisit(format!(
                "duplicate visit id: {}",
                visit.id
            )));
        }
    }
    Ok(())
}

fn parse_rfc3339_input(value: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidInput(format!(
                "{field_name} must be RFC3339 date-time: {error}"
            ))
        })
}

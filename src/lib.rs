//! Trip timeline engine for the Salzburg experience planner.
//!
//! Visits are scheduled occurrences of experiences. The engine moves a visit
//! in time within the opening hours of its day and pushes later overlapping
//! visits along; the session layer keeps the current trip and renders
//! rejections for the user.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    OpenStateResponse, ShiftVisitResponse, TripSettings, TripState, add_visit_impl,
    clear_visits_impl, decrement_visit_impl, import_visits_json_impl, increment_visit_impl,
    list_days_impl, list_visits_impl, open_state_impl, remove_visit_impl, set_visits_impl,
    shift_visit_impl,
};
pub use application::messages::Locale;
pub use domain::models::{DaySlot, Experience, OpeningHours, Visit};
pub use domain::opening_hours::{DayOpeningWindow, OpenState, resolve_opening_window};
pub use domain::reflow::{ReflowEngine, Rejection, ShiftOutcome, ShiftRejection, ShiftStatus};
pub use infrastructure::error::InfraError;

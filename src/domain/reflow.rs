//! Time shifts on a trip timeline.
//!
//! A shift moves one visit by a fixed delta after checking the opening window
//! of the visit's current day. Shifting later pushes every following visit
//! that the moved one now overlaps, one after another, until a visit no longer
//! overlaps or cannot move. Cascade steps that already happened are kept when
//! a later step is refused.

use crate::domain::models::Visit;
use crate::domain::opening_hours::{DayOpeningWindow, local_date, resolve_opening_window};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("closed on {weekday} ({date})")]
    ClosedAllDay { weekday: Weekday, date: NaiveDate },
    #[error("opening hours on {weekday} ({date}) are {}–{}", .opens.format("%H:%M"), .closes.format("%H:%M"))]
    OutsideWindow {
        weekday: Weekday,
        date: NaiveDate,
        opens: NaiveTime,
        closes: NaiveTime,
    },
    #[error("shift would leave {date}")]
    CrossesMidnight { date: NaiveDate },
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClosedAllDay { .. } => "closed_all_day",
            Self::OutsideWindow { .. } => "outside_window",
            Self::CrossesMidnight { .. } => "crosses_midnight",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftRejection {
    pub visit_id: String,
    pub reason: Rejection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftStatus {
    /// Zero delta or a target that is no longer part of the collection.
    Unchanged,
    Applied { shifted: Vec<String> },
    /// The target itself cannot move; nothing was changed.
    Rejected(ShiftRejection),
    /// The target and the first `shifted.len() - 1` followers moved, then
    /// `blocked` refused and the cascade stopped there.
    CascadeBlocked {
        shifted: Vec<String>,
        blocked: ShiftRejection,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOutcome {
    /// Full collection in input order.
    pub visits: Vec<Visit>,
    pub status: ShiftStatus,
}

impl ShiftOutcome {
    fn unchanged(visits: &[Visit]) -> Self {
        Self {
            visits: visits.to_vec(),
            status: ShiftStatus::Unchanged,
        }
    }

    pub fn shifted_ids(&self) -> &[String] {
        match &self.status {
            ShiftStatus::Applied { shifted } | ShiftStatus::CascadeBlocked { shifted, .. } => {
                shifted
            }
            ShiftStatus::Unchanged | ShiftStatus::Rejected(_) => &[],
        }
    }

    pub fn rejection(&self) -> Option<&ShiftRejection> {
        match &self.status {
            ShiftStatus::Rejected(rejection)
            | ShiftStatus::CascadeBlocked {
                blocked: rejection, ..
            } => Some(rejection),
            ShiftStatus::Unchanged | ShiftStatus::Applied { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReflowEngine {
    tz: Tz,
}

impl ReflowEngine {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn shift(&self, visits: &[Visit], target_id: &str, delta: Duration) -> ShiftOutcome {
        if delta.is_zero() {
            return ShiftOutcome::unchanged(visits);
        }
        let Some(target_index) = visits.iter().position(|visit| visit.id == target_id) else {
            return ShiftOutcome::unchanged(visits);
        };

        let moved = match self.try_shift(&visits[target_index], delta) {
            Ok(moved) => moved,
            Err(reason) => {
                return ShiftOutcome {
                    visits: visits.to_vec(),
                    status: ShiftStatus::Rejected(ShiftRejection {
                        visit_id: target_id.to_string(),
                        reason,
                    }),
                };
            }
        };

        let order = chronological_order(visits);
        let mut next = visits.to_vec();
        next[target_index] = moved;
        let mut shifted = vec![next[target_index].id.clone()];

        if delta > Duration::zero() {
            let position = order
                .iter()
                .position(|&index| index == target_index)
                .unwrap_or(order.len());
            let mut current_end = next[target_index].end;

            for &index in order.iter().skip(position + 1) {
                let follower = &visits[index];
                if follower.start > current_end {
                    break;
                }
                match self.try_shift(follower, delta) {
                    Ok(moved) => next[index] = moved,
                    Err(reason) => {
                        return ShiftOutcome {
                            visits: next,
                            status: ShiftStatus::CascadeBlocked {
                                shifted,
                                blocked: ShiftRejection {
                                    visit_id: follower.id.clone(),
                                    reason,
                                },
                            },
                        };
                    }
                }
                current_end = next[index].end;
                shifted.push(follower.id.clone());
            }
        }

        ShiftOutcome {
            visits: next,
            status: ShiftStatus::Applied { shifted },
        }
    }

    /// Checks one visit against the opening window of its current day and
    /// against that day's midnight bounds.
    pub fn check_shift(&self, visit: &Visit, delta: Duration) -> Result<(), Rejection> {
        self.try_shift(visit, delta).map(|_| ())
    }

    fn try_shift(&self, visit: &Visit, delta: Duration) -> Result<Visit, Rejection> {
        let date = local_date(visit.start, self.tz);
        let moved = visit
            .shifted_by(delta)
            .ok_or(Rejection::CrossesMidnight { date })?;

        match resolve_opening_window(visit.effective_opening_hours(), visit.start, self.tz) {
            DayOpeningWindow::ClosedAllDay => {
                return Err(Rejection::ClosedAllDay {
                    weekday: date.weekday(),
                    date,
                });
            }
            DayOpeningWindow::Window { open_at, close_at }
                if moved.start < open_at || moved.end > close_at =>
            {
                return Err(Rejection::OutsideWindow {
                    weekday: date.weekday(),
                    date,
                    opens: self.wall_clock(open_at),
                    closes: self.wall_clock(close_at),
                });
            }
            _ => {}
        }

        // The start keeps its day and the end may not move onto a later one.
        // A visit that already runs past midnight may still move within its days.
        let leaves_day = local_date(moved.start, self.tz) != date
            || self.end_day(moved.end) > self.end_day(visit.end);
        if leaves_day {
            return Err(Rejection::CrossesMidnight { date });
        }
        Ok(moved)
    }

    /// Day an exclusive end bound belongs to; an end at midnight closes the
    /// previous day.
    fn end_day(&self, end: DateTime<Utc>) -> NaiveDate {
        let last_instant = end
            .checked_sub_signed(Duration::nanoseconds(1))
            .unwrap_or(end);
        local_date(last_instant, self.tz)
    }

    fn wall_clock(&self, instant: DateTime<Utc>) -> NaiveTime {
        instant.with_timezone(&self.tz).time()
    }
}

/// Indices of `visits` sorted by start; equal starts keep input order.
pub fn chronological_order(visits: &[Visit]) -> Vec<usize> {
    let mut order = (0..visits.len()).collect::<Vec<_>>();
    order.sort_by_key(|&index| visits[index].start);
    order
}

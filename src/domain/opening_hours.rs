//! Resolves an opening-hours table against a concrete calendar day.
//!
//! Tables are keyed by weekday and store `HHMM` integers. Resolution always
//! happens in local wall-clock time of the configured zone: the weekday and
//! midnight of the instant decide which entry applies and where the window
//! lands on the absolute time line.

use crate::domain::models::{DaySlot, OpeningHours};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

const MINUTES_PER_HOUR: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayOpeningWindow {
    /// No table at all; nothing constrains the visit.
    Always,
    /// The weekday has no usable entry. Treated as unconstrained.
    Unknown,
    ClosedAllDay,
    Window {
        open_at: DateTime<Utc>,
        close_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextOpening {
    pub weekday: Weekday,
    pub from_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OpenState {
    Open { closes_at_minutes: u32 },
    Closed { next_opens: Option<NextOpening> },
    Unknown,
}

/// Decodes `HHMM` into minutes since midnight. `None` for negative values or
/// when the hour exceeds 23 or the minute exceeds 59.
pub fn hhmm_to_minutes(value: i32) -> Option<u32> {
    if value < 0 {
        return None;
    }
    let hours = value / 100;
    let minutes = value % 100;
    if hours > 23 || minutes > 59 {
        return None;
    }
    u32::try_from(hours * MINUTES_PER_HOUR + minutes).ok()
}

pub fn minutes_to_hhmm_label(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Start of `date` in `tz`, as an absolute instant.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

pub fn resolve_opening_window(
    hours: Option<&OpeningHours>,
    at: DateTime<Utc>,
    tz: Tz,
) -> DayOpeningWindow {
    let Some(hours) = hours else {
        return DayOpeningWindow::Always;
    };

    let date = local_date(at, tz);
    let Some(slot) = hours.slot_for(date.weekday()) else {
        return DayOpeningWindow::Unknown;
    };
    if slot.is_closed() {
        return DayOpeningWindow::ClosedAllDay;
    }

    let (Some(open_minutes), Some(close_minutes)) =
        (hhmm_to_minutes(slot.from), hhmm_to_minutes(slot.to))
    else {
        return DayOpeningWindow::Unknown;
    };

    let day_start = local_midnight(date, tz);
    DayOpeningWindow::Window {
        open_at: day_start + chrono::Duration::minutes(i64::from(open_minutes)),
        close_at: day_start + chrono::Duration::minutes(i64::from(close_minutes)),
    }
}

pub fn open_state_at(hours: Option<&OpeningHours>, now: DateTime<Utc>, tz: Tz) -> OpenState {
    let Some(hours) = hours else {
        return OpenState::Unknown;
    };

    let local = now.with_timezone(&tz);
    let current = local.hour() * 60 + local.minute();
    if let Some((from, to)) = hours.slot_for(local.weekday()).and_then(open_range) {
        if current >= from && current < to {
            return OpenState::Open {
                closes_at_minutes: to,
            };
        }
    }

    let today = local.date_naive();
    let next_opens = (1..=7u64).find_map(|offset| {
        let day = today.checked_add_days(Days::new(offset))?;
        let (from, _) = hours.slot_for(day.weekday()).and_then(open_range)?;
        Some(NextOpening {
            weekday: day.weekday(),
            from_minutes: from,
        })
    });
    OpenState::Closed { next_opens }
}

fn open_range(slot: DaySlot) -> Option<(u32, u32)> {
    if slot.is_closed() {
        return None;
    }
    Some((hhmm_to_minutes(slot.from)?, hhmm_to_minutes(slot.to)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::fixtures::fixed_time;
    use chrono_tz::Europe::Vienna;
    use proptest::prelude::*;

    fn weekday_hours() -> OpeningHours {
        let mut hours = OpeningHours::default();
        for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            hours.set_slot(weekday, Some(DaySlot { from: 930, to: 1700 }));
        }
        hours.set_slot(Weekday::Sat, Some(DaySlot { from: 0, to: 0 }));
        hours
    }

    #[test]
    fn hhmm_decoding_matches_wall_clock() {
        assert_eq!(hhmm_to_minutes(930), Some(570));
        assert_eq!(hhmm_to_minutes(1700), Some(1020));
        assert_eq!(hhmm_to_minutes(0), Some(0));
        assert_eq!(hhmm_to_minutes(2359), Some(1439));
        assert_eq!(hhmm_to_minutes(2400), None);
        assert_eq!(hhmm_to_minutes(975), None);
        assert_eq!(hhmm_to_minutes(-30), None);
    }

    #[test]
    fn missing_table_is_always_open() {
        let at = fixed_time("2025-11-10T10:00:00Z");
        assert_eq!(resolve_opening_window(None, at, Vienna), DayOpeningWindow::Always);
    }

    #[test]
    fn missing_weekday_entry_is_unknown() {
        // 2025-11-09 is a Sunday in Vienna.
        let at = fixed_time("2025-11-09T10:00:00Z");
        let hours = weekday_hours();
        assert_eq!(
            resolve_opening_window(Some(&hours), at, Vienna),
            DayOpeningWindow::Unknown
        );
    }

    #[test]
    fn zero_slot_is_closed_all_day() {
        let at = fixed_time("2025-11-15T10:00:00Z");
        let hours = weekday_hours();
        assert_eq!(
            resolve_opening_window(Some(&hours), at, Vienna),
            DayOpeningWindow::ClosedAllDay
        );
    }

    #[test]
    fn malformed_slot_degrades_to_unknown() {
        let at = fixed_time("2025-11-10T10:00:00Z");
        let hours = OpeningHours::uniform(DaySlot { from: 900, to: 2500 });
        assert_eq!(
            resolve_opening_window(Some(&hours), at, Vienna),
            DayOpeningWindow::Unknown
        );
    }

    #[test]
    fn window_is_anchored_to_local_midnight() {
        // Vienna is UTC+1 in November: 09:30 local is 08:30Z.
        let at = fixed_time("2025-11-10T12:00:00Z");
        let hours = weekday_hours();
        assert_eq!(
            resolve_opening_window(Some(&hours), at, Vienna),
            DayOpeningWindow::Window {
                open_at: fixed_time("2025-11-10T08:30:00Z"),
                close_at: fixed_time("2025-11-10T16:00:00Z"),
            }
        );
    }

    #[test]
    fn weekday_follows_local_calendar_not_utc() {
        // 23:30Z on Sunday is already Monday 00:30 in Vienna.
        let at = fixed_time("2025-11-09T23:30:00Z");
        let hours = weekday_hours();
        assert!(matches!(
            resolve_opening_window(Some(&hours), at, Vienna),
            DayOpeningWindow::Window { .. }
        ));
    }

    #[test]
    fn open_state_reports_closing_time_and_next_opening() {
        let hours = weekday_hours();
        assert_eq!(
            open_state_at(Some(&hours), fixed_time("2025-11-10T10:00:00Z"), Vienna),
            OpenState::Open {
                closes_at_minutes: 1020
            }
        );
        // Friday evening: Saturday is closed, Sunday unknown, Monday opens.
        assert_eq!(
            open_state_at(Some(&hours), fixed_time("2025-11-14T18:00:00Z"), Vienna),
            OpenState::Closed {
                next_opens: Some(NextOpening {
                    weekday: Weekday::Mon,
                    from_minutes: 570,
                })
            }
        );
        assert_eq!(
            open_state_at(None, fixed_time("2025-11-14T18:00:00Z"), Vienna),
            OpenState::Unknown
        );
    }

    #[test]
    fn open_state_without_any_opening_day() {
        let hours = OpeningHours::uniform(DaySlot { from: 0, to: 0 });
        assert_eq!(
            open_state_at(Some(&hours), fixed_time("2025-11-10T10:00:00Z"), Vienna),
            OpenState::Closed { next_opens: None }
        );
    }

    #[test]
    fn minute_labels_are_zero_padded() {
        assert_eq!(minutes_to_hhmm_label(570), "09:30");
        assert_eq!(minutes_to_hhmm_label(0), "00:00");
    }

    proptest! {
        #[test]
        fn valid_hhmm_always_decodes_inside_one_day(hour in 0i32..24i32, minute in 0i32..60i32) {
            let decoded = hhmm_to_minutes(hour * 100 + minute);
            prop_assert_eq!(decoded, Some((hour * 60 + minute) as u32));
        }

        #[test]
        fn resolved_window_stays_on_the_instant_day(offset_minutes in 0i64..(60 * 24 * 14)) {
            let at = fixed_time("2025-11-03T00:00:00Z") + chrono::Duration::minutes(offset_minutes);
            let hours = OpeningHours::uniform(DaySlot { from: 800, to: 1800 });
            let DayOpeningWindow::Window { open_at, close_at } =
                resolve_opening_window(Some(&hours), at, Vienna)
            else {
                panic!("expected a concrete window");
            };
            prop_assert_eq!(local_date(open_at, Vienna), local_date(at, Vienna));
            prop_assert_eq!(local_date(close_at, Vienna), local_date(at, Vienna));
            prop_assert!(open_at < close_at);
        }
    }
}

//! User-facing phrasing for timeline rejections and labels.

use crate::domain::opening_hours::{OpenState, minutes_to_hhmm_label};
use crate::domain::reflow::{Rejection, ShiftRejection};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    De,
    En,
}

impl Locale {
    /// Accepts `de`, `de-AT`, `en`, `en_GB` and the like.
    pub fn parse(value: &str) -> Option<Self> {
        let language = value
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "de" => Some(Self::De),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

pub fn weekday_name(weekday: Weekday, locale: Locale) -> &'static str {
    match locale {
        Locale::De => match weekday {
            Weekday::Mon => "Montag",
            Weekday::Tue => "Dienstag",
            Weekday::Wed => "Mittwoch",
            Weekday::Thu => "Donnerstag",
            Weekday::Fri => "Freitag",
            Weekday::Sat => "Samstag",
            Weekday::Sun => "Sonntag",
        },
        Locale::En => match weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        },
    }
}

pub fn render_rejection(rejection: &ShiftRejection, locale: Locale) -> String {
    render_reason(&rejection.reason, locale)
}

pub fn render_reason(reason: &Rejection, locale: Locale) -> String {
    match (reason, locale) {
        (Rejection::ClosedAllDay { weekday, date }, Locale::De) => {
            format!("Geschlossen am {} ({date}).", weekday_name(*weekday, locale))
        }
        (Rejection::ClosedAllDay { weekday, date }, Locale::En) => {
            format!("Closed on {} ({date}).", weekday_name(*weekday, locale))
        }
        (
            Rejection::OutsideWindow {
                weekday,
                date,
                opens,
                closes,
            },
            Locale::De,
        ) => format!(
            "Verschieben nicht möglich: Öffnungszeiten am {} ({date}) sind {}–{}.",
            weekday_name(*weekday, locale),
            opens.format("%H:%M"),
            closes.format("%H:%M")
        ),
        (
            Rejection::OutsideWindow {
                weekday,
                date,
                opens,
                closes,
            },
            Locale::En,
        ) => format!(
            "Cannot shift: opening hours on {} ({date}) are {}–{}.",
            weekday_name(*weekday, locale),
            opens.format("%H:%M"),
            closes.format("%H:%M")
        ),
        (Rejection::CrossesMidnight { date }, Locale::De) => {
            format!("Verschieben nicht möglich: der Besuch würde den {date} verlassen.")
        }
        (Rejection::CrossesMidnight { date }, Locale::En) => {
            format!("Cannot shift: the visit would leave {date}.")
        }
    }
}

/// Badge text for the current open state of a place.
pub fn render_open_state(state: &OpenState, locale: Locale) -> String {
    match (state, locale) {
        (OpenState::Open { closes_at_minutes }, Locale::De) => {
            format!("Geöffnet · bis {}", minutes_to_hhmm_label(*closes_at_minutes))
        }
        (OpenState::Open { closes_at_minutes }, Locale::En) => {
            format!("Open · until {}", minutes_to_hhmm_label(*closes_at_minutes))
        }
        (OpenState::Closed { next_opens: Some(next) }, _) => format!(
            "{} · {} {}",
            match locale {
                Locale::De => "Geschlossen",
                Locale::En => "Closed",
            },
            weekday_name(next.weekday, locale),
            minutes_to_hhmm_label(next.from_minutes)
        ),
        (OpenState::Closed { next_opens: None }, Locale::De) => "Geschlossen".to_string(),
        (OpenState::Closed { next_opens: None }, Locale::En) => "Closed".to_string(),
        (OpenState::Unknown, Locale::De) => "Öffnungszeiten unbekannt".to_string(),
        (OpenState::Unknown, Locale::En) => "Hours unknown".to_string(),
    }
}

pub fn format_day_label(date: NaiveDate, locale: Locale) -> String {
    let weekday = weekday_name(date.weekday(), locale);
    match locale {
        Locale::De => format!("{weekday}, {}", date.format("%d.%m.%Y")),
        Locale::En => format!("{weekday}, {}", date.format("%d %B %Y")),
    }
}

pub fn format_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// `1h 30m`, `2h` or `45m`, rounded to whole minutes. Negative spans read `0m`.
pub fn format_duration(span: Duration) -> String {
    let minutes = (span.num_seconds().max(0) + 30) / 60;
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, rest) => format!("{rest}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, rest) => format!("{hours}h {rest}m"),
    }
}

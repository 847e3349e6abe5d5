use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Museum,
    Trail,
    Church,
    Excursion,
    Outdoor,
    Square,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityState {
    Full,
    Partly,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub postal_code: String,
    pub locality: String,
    pub region: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
}

/// One weekday entry of an opening-hours table, both ends encoded as `HHMM`
/// (`930` is 09:30). `0/0` marks the day as closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySlot {
    pub from: i32,
    pub to: i32,
}

impl DaySlot {
    pub fn is_closed(&self) -> bool {
        self.from == 0 && self.to == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OpeningHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mo: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tu: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub we: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub th: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sa: Option<DaySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub su: Option<DaySlot>,
}

impl OpeningHours {
    /// Same slot on every weekday.
    pub fn uniform(slot: DaySlot) -> Self {
        Self {
            mo: Some(slot),
            tu: Some(slot),
            we: Some(slot),
            th: Some(slot),
            fr: Some(slot),
            sa: Some(slot),
            su: Some(slot),
        }
    }

    pub fn slot_for(&self, weekday: Weekday) -> Option<DaySlot> {
        match weekday {
            Weekday::Mon => self.mo,
            Weekday::Tue => self.tu,
            Weekday::Wed => self.we,
            Weekday::Thu => self.th,
            Weekday::Fri => self.fr,
            Weekday::Sat => self.sa,
            Weekday::Sun => self.su,
        }
    }

    pub fn set_slot(&mut self, weekday: Weekday, slot: Option<DaySlot>) {
        let entry = match weekday {
            Weekday::Mon => &mut self.mo,
            Weekday::Tue => &mut self.tu,
            Weekday::Wed => &mut self.we,
            Weekday::Thu => &mut self.th,
            Weekday::Fri => &mut self.fr,
            Weekday::Sat => &mut self.sa,
            Weekday::Sun => &mut self.su,
        };
        *entry = slot;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experience {
    pub key: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hero_image: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub geo: Option<Geo>,
    #[serde(default = "first_month")]
    pub start_month: u32,
    #[serde(default = "last_month")]
    pub end_month: u32,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub adults_only: bool,
    #[serde(default)]
    pub free_access: bool,
    #[serde(default)]
    pub dogs_allowed: bool,
    #[serde(default)]
    pub accessibility_state: AccessibilityState,
}

impl Experience {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.key, "experience.key")?;
        validate_non_empty(&self.name, "experience.name")?;
        validate_month(self.start_month, "experience.start_month")?;
        validate_month(self.end_month, "experience.end_month")?;
        Ok(())
    }

    /// Seasons may wrap the year end, e.g. November through March.
    pub fn is_in_season(&self, month: u32) -> bool {
        if self.start_month <= self.end_month {
            (self.start_month..=self.end_month).contains(&month)
        } else {
            month >= self.start_month || month <= self.end_month
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: String,
    pub experience: Experience,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Visit {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "visit.id")?;
        self.experience.validate()?;
        if self.end <= self.start {
            return Err("visit.end must be after visit.start".to_string());
        }
        Ok(())
    }

    /// The visit's own table wins over the experience's.
    pub fn effective_opening_hours(&self) -> Option<&OpeningHours> {
        self.opening_hours
            .as_ref()
            .or(self.experience.opening_hours.as_ref())
    }

    /// `None` when either bound would leave the representable time range.
    pub fn shifted_by(&self, delta: chrono::Duration) -> Option<Visit> {
        Some(Visit {
            start: self.start.checked_add_signed(delta)?,
            end: self.end.checked_add_signed(delta)?,
            ..self.clone()
        })
    }
}

fn first_month() -> u32 {
    1
}

fn last_month() -> u32 {
    12
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_month(value: u32, field_name: &str) -> Result<(), String> {
    if !(1..=12).contains(&value) {
        return Err(format!("{field_name} must be within 1..=12"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    pub fn sample_experience(key: &str) -> Experience {
        Experience {
            key: key.to_string(),
            name: format!("Experience {key}"),
            category: Category::Museum,
            summary: "A place in Salzburg".to_string(),
            url: String::new(),
            hero_image: String::new(),
            address: None,
            geo: Some(Geo {
                lat: 47.8095,
                lon: 13.0550,
            }),
            start_month: 1,
            end_month: 12,
            opening_hours: None,
            adults_only: false,
            free_access: true,
            dogs_allowed: false,
            accessibility_state: AccessibilityState::Full,
        }
    }

    pub fn sample_visit(id: &str, start: &str, end: &str) -> Visit {
        Visit {
            id: id.to_string(),
            experience: sample_experience(id),
            opening_hours: None,
            start: fixed_time(start),
            end: fixed_time(end),
        }
    }
}

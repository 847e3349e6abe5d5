use crate::domain::models::Visit;
use crate::domain::opening_hours::local_date;
use crate::domain::reflow::chronological_order;
use chrono::NaiveDate;
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub visits: Vec<Visit>,
}

/// Buckets visits by the local calendar day of their start. Groups come out
/// in date order, visits inside a group in start order.
pub fn group_by_day(visits: &[Visit], tz: Tz) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for index in chronological_order(visits) {
        let visit = &visits[index];
        let date = local_date(visit.start, tz);
        match groups.last_mut() {
            Some(group) if group.date == date => group.visits.push(visit.clone()),
            _ => groups.push(DayGroup {
                date,
                visits: vec![visit.clone()],
            }),
        }
    }
    groups
}

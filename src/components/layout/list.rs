use crate::components::models::{display_order_key, Event};
use chrono::Datelike;
use serde::Serialize;

/// Events of one calendar month, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    pub year: i32,
    pub month: u32,
    pub events: Vec<Event>,
}

/// Bucket events by year and month.
///
/// Months keep the order in which they first appear; inside a month events are
/// ordered by date, then start time, with untimed events last on their date.
pub fn group_by_month(events: &[Event]) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();

    for event in events {
        let (year, month) = (event.date.year(), event.date.month());
        match groups.iter_mut().find(|g| g.year == year && g.month == month) {
            Some(group) => group.events.push(event.clone()),
            None => groups.push(MonthGroup {
                year,
                month,
                events: vec![event.clone()],
            }),
        }
    }

    for group in &mut groups {
        group.events.sort_by_key(display_order_key);
    }
    groups
}

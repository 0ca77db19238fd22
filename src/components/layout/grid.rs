use crate::components::models::{display_order_key, Event, MAX_DAYS_AHEAD};
use crate::utils::text::truncate_chars;
use crate::utils::time::{
    add_months, first_of_month, last_of_month, week_end_of, week_start_of, weekday_label, WeekStart,
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-day display limits of the month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// A day with at least this many events is crowded
    pub crowded_threshold: usize,
    /// Events shown on a crowded day; the rest overflow
    pub crowded_visible: usize,
    /// Characters of a title shown before the ellipsis
    pub title_chars: usize,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            crowded_threshold: 4,
            crowded_visible: 2,
            title_chars: 10,
        }
    }
}

impl GridOptions {
    /// How many of `total` events on one day are shown inline
    pub fn visible_count(&self, total: usize) -> usize {
        if total >= self.crowded_threshold {
            self.crowded_visible.min(total)
        } else {
            total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridEvent {
    /// Title cut to the grid's character budget
    pub label: String,
    pub event: Event,
}

/// One date of a month grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub date: NaiveDate,
    /// False for leading days that belong to the previous month. Those cells
    /// still carry their events.
    pub in_month: bool,
    pub is_today: bool,
    pub events: Vec<GridEvent>,
    pub overflow_count: usize,
    /// Events beyond the visible cap, for on-demand display
    pub overflow: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Header labels in week-start order
    pub weekday_labels: Vec<String>,
    /// Rows of up to seven cells; the last row ends at the month end or the display end
    pub weeks: Vec<Vec<GridCell>>,
}

/// Lay out `events` as month grids for `[today, today + days_ahead]`.
///
/// The display range is extended to the end of the week containing its last day.
/// Each month starts at its first aligned week, but never before the week
/// containing `today`, and stops at the month's last day or the display end.
pub fn build_grids(
    events: &[Event],
    today: NaiveDate,
    days_ahead: u32,
    week_start: WeekStart,
    options: &GridOptions,
    locale: &str,
) -> Vec<MonthGrid> {
    let window_end = today + Duration::days(days_ahead.min(MAX_DAYS_AHEAD) as i64);
    let display_end = week_end_of(window_end, week_start);
    let current_week = week_start_of(today, week_start);

    let mut by_date: HashMap<NaiveDate, Vec<&Event>> = HashMap::new();
    for event in events {
        by_date.entry(event.date).or_default().push(event);
    }
    for day in by_date.values_mut() {
        day.sort_by_key(|e| display_order_key(e));
    }

    let weekday_labels: Vec<String> = week_start
        .days()
        .iter()
        .map(|d| weekday_label(*d, locale))
        .collect();

    let mut grids = Vec::new();
    let mut month = first_of_month(today);
    while month <= display_end {
        let range_start = week_start_of(month, week_start).max(current_week);
        let range_end = last_of_month(month).min(display_end);

        if range_start <= range_end {
            let cells: Vec<GridCell> = range_start
                .iter_days()
                .take_while(|date| *date <= range_end)
                .map(|date| build_cell(date, month, today, &by_date, options))
                .collect();

            grids.push(MonthGrid {
                year: month.year(),
                month: month.month(),
                weekday_labels: weekday_labels.clone(),
                weeks: cells.chunks(7).map(<[GridCell]>::to_vec).collect(),
            });
        }

        let (year, next) = add_months(month.year(), month.month(), 1);
        match NaiveDate::from_ymd_opt(year, next, 1) {
            Some(date) => month = date,
            None => break,
        }
    }

    grids
}

fn build_cell(
    date: NaiveDate,
    month: NaiveDate,
    today: NaiveDate,
    by_date: &HashMap<NaiveDate, Vec<&Event>>,
    options: &GridOptions,
) -> GridCell {
    let in_month = date.year() == month.year() && date.month() == month.month();
    let day_events: &[&Event] = by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);

    let visible = options.visible_count(day_events.len());
    let (shown, rest) = day_events.split_at(visible);

    GridCell {
        date,
        in_month,
        is_today: date == today,
        events: shown
            .iter()
            .map(|e| GridEvent {
                label: truncate_chars(&e.title, options.title_chars),
                event: (*e).clone(),
            })
            .collect(),
        overflow_count: rest.len(),
        overflow: rest.iter().map(|e| (*e).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::models::TimeRange;
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(title: &str, date: NaiveDate, hour: Option<u32>) -> Event {
        let start = hour
            .map(|h| NaiveTime::from_hms_opt(h, 0, 0).unwrap())
            .unwrap_or(NaiveTime::MIN);
        Event {
            start: Utc.from_utc_datetime(&date.and_time(start)).fixed_offset(),
            date,
            weekday: String::new(),
            time: hour.map(|_| TimeRange { start, end: start }),
            all_day: hour.is_none(),
            title: title.to_string(),
            description: None,
            location: None,
            color: None,
            source: "test".to_string(),
        }
    }

    fn cell<'a>(grids: &'a [MonthGrid], date: NaiveDate) -> &'a GridCell {
        grids
            .iter()
            .flat_map(|g| g.weeks.iter().flatten())
            .find(|c| c.date == date && c.in_month)
            .unwrap()
    }

    #[test]
    fn test_crowded_day_overflows() {
        let today = day(2026, 1, 14);
        let busy_day = day(2026, 1, 15);
        let quiet_day = day(2026, 1, 16);
        let mut events: Vec<Event> = (0..5).map(|i| event(&format!("e{i}"), busy_day, Some(9 + i))).collect();
        events.extend((0..3).map(|i| event(&format!("q{i}"), quiet_day, Some(9 + i))));

        let grids = build_grids(&events, today, 30, WeekStart::Sunday, &GridOptions::default(), "en");

        let busy = cell(&grids, busy_day);
        assert_eq!(busy.events.len(), 2);
        assert_eq!(busy.overflow_count, 3);
        assert_eq!(busy.overflow.len(), 3);
        assert_eq!(busy.events[0].event.title, "e0");

        let quiet = cell(&grids, quiet_day);
        assert_eq!(quiet.events.len(), 3);
        assert_eq!(quiet.overflow_count, 0);
    }

    #[test]
    fn test_month_ranges_and_week_alignment() {
        // Wednesday
        let today = day(2026, 1, 14);
        let grids = build_grids(&[], today, 30, WeekStart::Sunday, &GridOptions::default(), "en");

        assert_eq!(grids.len(), 2);
        let jan = &grids[0];
        assert_eq!((jan.year, jan.month), (2026, 1));
        assert_eq!(jan.weekday_labels[0], "Sun");
        // Starts at the week containing today, ends at the month end
        assert_eq!(jan.weeks[0][0].date, day(2026, 1, 11));
        assert_eq!(jan.weeks.len(), 3);
        assert_eq!(jan.weeks[2].last().map(|c| c.date), Some(day(2026, 1, 31)));
        assert!(jan.weeks[0][3].is_today);

        // Window ends Friday Feb 13, extended to Saturday Feb 14
        let feb = &grids[1];
        assert_eq!(feb.weeks.len(), 2);
        assert_eq!(feb.weeks[0][0].date, day(2026, 2, 1));
        assert_eq!(feb.weeks[1].last().map(|c| c.date), Some(day(2026, 2, 14)));
    }

    #[test]
    fn test_monday_start_and_leading_days() {
        // Friday Jan 30; February starts on a Sunday
        let today = day(2026, 1, 30);
        let grids = build_grids(&[], today, 5, WeekStart::Monday, &GridOptions::default(), "en");

        assert_eq!(grids[0].weekday_labels[0], "Mon");
        assert_eq!(grids[0].weeks[0][0].date, day(2026, 1, 26));
        assert_eq!(grids[0].weeks[0][0].date.weekday(), Weekday::Mon);

        // The February grid begins with the Monday Jan 26 week, padded with January days
        let feb = &grids[1];
        assert_eq!(feb.weeks[0][0].date, day(2026, 1, 26));
        assert!(!feb.weeks[0][0].in_month);
        assert!(feb.weeks[0][6].in_month);
        // Window end Feb 4 (Wednesday) extends to Sunday Feb 8
        assert_eq!(feb.weeks.last().and_then(|w| w.last()).map(|c| c.date), Some(day(2026, 2, 8)));
    }

    #[test]
    fn test_leading_days_carry_their_events() {
        // Friday Jan 30; the February grid starts on Monday Jan 26
        let today = day(2026, 1, 30);
        let events = vec![event("Month end review", today, Some(15))];
        let grids = build_grids(&events, today, 5, WeekStart::Monday, &GridOptions::default(), "en");

        let leading = &grids[1].weeks[0][4];
        assert_eq!(leading.date, today);
        assert!(!leading.in_month);
        assert_eq!(leading.events.len(), 1);
        assert_eq!(leading.events[0].event.title, "Month end review");
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let today = day(2026, 1, 14);
        let grids = build_grids(&[], today, u32::MAX, WeekStart::Sunday, &GridOptions::default(), "en");
        let last = grids.last().unwrap();
        assert!(last.year <= 2036);
    }

    #[test]
    fn test_labels_are_truncated_and_untimed_sorts_last() {
        let today = day(2026, 1, 14);
        let events = vec![
            event("All day planning retreat", today, None),
            event("Standup", today, Some(9)),
        ];
        let grids = build_grids(&events, today, 7, WeekStart::Sunday, &GridOptions::default(), "en");
        let c = cell(&grids, today);
        assert_eq!(c.events[0].label, "Standup");
        assert_eq!(c.events[1].label, "All day pl...");
    }
}
